use crate::fragmap::FragmentMap;
use crate::search::{Fragment, Fragments};
use crate::types::Window;

/// Iterator over the segments of a fragment map, in start order
pub struct SegmentIterator<'a> {
    inner: std::slice::Iter<'a, Fragments>,
}

impl<'a> SegmentIterator<'a> {
    pub(crate) fn new(segments: &'a [Fragments]) -> Self {
        Self { inner: segments.iter() }
    }
}

impl<'a> Iterator for SegmentIterator<'a> {
    type Item = &'a Fragments;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for SegmentIterator<'a> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<'a> DoubleEndedIterator for SegmentIterator<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

/// Iterator over every fragment of every segment, tagged with its window
pub struct FragmentIterator<'a> {
    segments: std::slice::Iter<'a, Fragments>,
    current: Option<(Window, std::slice::Iter<'a, Fragment>)>,
}

impl<'a> FragmentIterator<'a> {
    pub(crate) fn new(segments: &'a [Fragments]) -> Self {
        Self { segments: segments.iter(), current: None }
    }
}

impl<'a> Iterator for FragmentIterator<'a> {
    type Item = (Window, &'a Fragment);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((window, frags)) = self.current.as_mut() {
                if let Some(frag) = frags.next() {
                    return Some((*window, frag));
                }
            }
            let segment = self.segments.next()?;
            self.current = Some((segment.window(), segment.frags.iter()));
        }
    }
}

/// Iterator helpers on a fragment map
pub trait FragmentMapExt {
    /// Segments whose window contains residue `position`
    fn covering(&self, position: usize) -> impl Iterator<Item = &Fragments> + '_;

    /// Templates matched anywhere in the map, in map order, without repeats
    fn templates(&self) -> Vec<&str>;

    /// Total number of fragments across all segments
    fn total_fragments(&self) -> usize;
}

impl FragmentMapExt for FragmentMap {
    fn covering(&self, position: usize) -> impl Iterator<Item = &Fragments> + '_ {
        // segments are sorted by start, so nothing after `position` can cover it
        self.segments()
            .take_while(move |segment| segment.start <= position)
            .filter(move |segment| position < segment.end)
    }

    fn templates(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.fragments()
            .map(|(_, frag)| frag.template.as_str())
            .filter(|template| seen.insert(*template))
            .collect()
    }

    fn total_fragments(&self) -> usize {
        self.segments().map(|segment| segment.frags.len()).sum()
    }
}
