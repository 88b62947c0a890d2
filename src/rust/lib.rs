//! Fragment maps for protein sequences.
//!
//! A query sequence is cut into overlapping windows. Every window start is
//! searched over a range of window lengths against a structure database with
//! a profile-profile backend, and the best length is kept. The per-start
//! results form a [`FragmentMap`], which can be reduced to a single
//! bag-of-words descriptor with a fragment library.
//!
//! ```no_run
//! use fragmap::{CommandSearch, MapConfig, Query};
//!
//! # fn main() -> fragmap::errors::MapResult<()> {
//! let config = MapConfig::default();
//! let query = Query::from_files("query.fasta", "query.hhm")?;
//! let search = CommandSearch::new("fragsearch").args(["--db", "/data/pdb-hhm"]);
//! let map = config.compute_map(&search, &query)?;
//! for segment in map.segments() {
//!     println!("{}..{}: {} fragments", segment.start, segment.end, segment.frags.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bow;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fragmap;
pub mod hhsuite;
pub mod io;
pub mod iterators;
pub mod metrics;
pub mod query;
pub mod residues;
pub mod search;
pub mod types;

pub use bow::{Bow, Bowed, FragmentLibrary};
pub use config::{Backend, MapConfig, MapConfigBuilder};
pub use engine::{CancelToken, FragmentMapper, WindowPlan};
pub use fragmap::FragmentMap;
pub use iterators::{FragmentIterator, FragmentMapExt, SegmentIterator};
pub use query::{Profile, ProfileSource, Query, Sequence};
pub use search::{ByScore, CommandSearch, Fragment, FragmentSearch, Fragments, MatchComparator};
pub use types::{Coords, Window};
