use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{MapError, MapResult};
use crate::io::open_input;
use crate::iterators::{FragmentIterator, SegmentIterator};
use crate::search::Fragments;

/// The best fragments for every window start of a query.
///
/// Segments are kept sorted by start with at most one segment per start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentMap {
    pub name: String,
    segments: Vec<Fragments>,
}

/// One CSV row per segment
#[derive(Debug, Serialize)]
struct SegmentRow<'a> {
    name: &'a str,
    start: usize,
    end: usize,
    score: f64,
    fragments: usize,
    best_template: &'a str,
    best_probability: Option<f64>,
}

impl FragmentMap {
    /// An empty map
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), segments: Vec::new() }
    }

    /// Build a map from segments in any order.
    ///
    /// Fails if two segments share a start offset.
    pub fn from_segments(name: &str, mut segments: Vec<Fragments>) -> MapResult<Self> {
        segments.sort_by_key(|segment| segment.start);
        if let Some(pair) = segments.windows(2).find(|pair| pair[0].start == pair[1].start) {
            return Err(MapError::ValidationError {
                message: format!("duplicate segment for start {}", pair[0].start),
            });
        }
        Ok(Self { name: name.to_string(), segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments in ascending start order
    pub fn segments(&self) -> SegmentIterator<'_> {
        SegmentIterator::new(&self.segments)
    }

    /// Every fragment in the map, tagged with the window it matched
    pub fn fragments(&self) -> FragmentIterator<'_> {
        FragmentIterator::new(&self.segments)
    }

    /// The segment whose window begins at `start`
    pub fn segment_at(&self, start: usize) -> Option<&Fragments> {
        self.segments
            .binary_search_by_key(&start, |segment| segment.start)
            .ok()
            .map(|i| &self.segments[i])
    }

    /// Write the map as JSON
    pub fn write_json<W: Write>(&self, writer: W) -> MapResult<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read a map written by [`FragmentMap::write_json`], re-checking segment order
    pub fn read_json<P: AsRef<Path>>(path: P) -> MapResult<Self> {
        let map: FragmentMap = serde_json::from_reader(open_input(path)?)?;
        Self::from_segments(&map.name, map.segments)
    }

    /// Write a one-line-per-segment CSV summary
    pub fn write_csv<W: Write>(&self, writer: W) -> MapResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for segment in &self.segments {
            let best = segment.frags.first();
            writer.serialize(SegmentRow {
                name: &self.name,
                start: segment.start,
                end: segment.end,
                score: segment.score,
                fragments: segment.frags.len(),
                best_template: best.map(|f| f.template.as_str()).unwrap_or(""),
                best_probability: best.map(|f| f.probability),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}
