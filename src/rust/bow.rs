//! Bag-of-words descriptors for fragment maps.
//!
//! A fragment library turns the CA atoms of one matched fragment into a
//! fixed-length frequency vector. The descriptor of a whole map is the sum of
//! those vectors over every fragment of every segment.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{MapError, MapResult};
use crate::fragmap::FragmentMap;
use crate::types::Coords;

/// A fixed-length frequency vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bow {
    pub freqs: Vec<f64>,
}

impl Bow {
    /// The zero vector of length `size`
    pub fn new(size: usize) -> Self {
        Self { freqs: vec![0.0; size] }
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Element-wise `self += other`
    pub fn add_assign(&mut self, other: &Bow) -> MapResult<()> {
        if other.len() != self.len() {
            return Err(MapError::DimensionMismatch { expected: self.len(), found: other.len() });
        }
        for (freq, add) in self.freqs.iter_mut().zip(&other.freqs) {
            *freq += add;
        }
        Ok(())
    }

    /// Element-wise sum of two vectors
    pub fn plus(mut self, other: &Bow) -> MapResult<Bow> {
        self.add_assign(other)?;
        Ok(self)
    }
}

/// A descriptor tagged with the name of what it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bowed {
    pub id: String,
    pub bow: Bow,
}

/// Maps a fragment's CA atoms to a descriptor of fixed dimensionality
pub trait FragmentLibrary: Sync {
    /// Length of every vector returned by [`FragmentLibrary::structure_bow`]
    fn size(&self) -> usize;

    fn structure_bow(&self, ca_atoms: &[Coords]) -> Bow;
}

impl FragmentMap {
    /// Descriptor of the whole map under `lib`.
    ///
    /// Library lookups run in parallel; the sum is taken in map order, so the
    /// result does not depend on the thread count.
    pub fn structure_bow<L: FragmentLibrary>(&self, lib: &L) -> MapResult<Bowed> {
        let fragments: Vec<_> = self.fragments().map(|(_, frag)| frag).collect();
        let contributions: Vec<Bow> =
            fragments.par_iter().map(|frag| lib.structure_bow(&frag.ca_atoms)).collect();

        let mut bag = Bow::new(lib.size());
        for contribution in &contributions {
            bag.add_assign(contribution)?;
        }
        Ok(Bowed { id: self.name.clone(), bow: bag })
    }
}
