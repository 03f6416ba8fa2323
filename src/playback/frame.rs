//! Cursor frames
//!
//! A [`CursorFrame`] is the spatial and temporal box a UI animates its
//! highlight across while the cursor sits on one Sequence entry:
//!
//! - **time**: the entry's tick range
//! - **x**: from the left edge of the entry to the left edge of the next entry,
//!   or to the right edge of the measure when the next entry is elsewhere
//!   (another system, a backward jump, or the end)
//! - **y**: the top and bottom of the part within its system
//!
//! Frames are cheap to create. The box, along with the set of sounding
//! elements used for [`CursorHint`]s, is computed on first read and cached.
//! Nothing here panics: a frame over a missing entry, or with unusable layout
//! numbers, is simply empty.

use super::deferred::Deferred;
use super::sequence::Sequence;
use super::types::{PlaybackElement, Span, TickRange};
use serde::Serialize;
use std::sync::Arc;

/// The box a frame covers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameBounds {
    pub time_range: TickRange,
    pub x_range: Span,
    pub y_range: Span,
}

/// How an element changes between two frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "element", rename_all = "lowercase")]
pub enum CursorHint {
    /// Sounding now, was not before
    Start(PlaybackElement),
    /// Sounded before, does not now
    Stop(PlaybackElement),
    /// Keeps sounding across both frames
    Sustain(PlaybackElement),
    /// Sounded before and is struck again now
    Retrigger(PlaybackElement),
}

#[derive(Debug, Clone)]
struct FrameSource {
    sequence: Arc<Sequence>,
    index: usize,
}

#[derive(Debug, Clone, Default)]
struct FrameData {
    bounds: Option<FrameBounds>,
    /// Elements starting at this entry
    starting: Vec<PlaybackElement>,
    /// Elements sounding at the start of this entry, `starting` included
    sounding: Vec<PlaybackElement>,
}

#[derive(Debug)]
pub struct CursorFrame {
    data: Option<Deferred<FrameSource, FrameData>>,
}

impl CursorFrame {
    /// The sentinel frame: no bounds, no elements.
    pub fn empty() -> Self {
        Self { data: None }
    }

    /// Frame for one entry. Out-of-range indexes give an empty frame.
    pub fn new(sequence: Arc<Sequence>, index: usize) -> Self {
        if sequence.entry(index).is_none() {
            return Self::empty();
        }
        Self {
            data: Some(Deferred::new(FrameSource { sequence, index }, compute_frame)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().is_none()
    }

    /// Index of the entry this frame covers
    pub fn index(&self) -> Option<usize> {
        self.data.as_ref().map(|d| d.input().index)
    }

    pub fn bounds(&self) -> Option<&FrameBounds> {
        self.data.as_ref().and_then(|d| d.get().bounds.as_ref())
    }

    pub fn time_range(&self) -> Option<TickRange> {
        self.bounds().map(|b| b.time_range)
    }

    pub fn x_range(&self) -> Option<Span> {
        self.bounds().map(|b| b.x_range)
    }

    pub fn y_range(&self) -> Option<Span> {
        self.bounds().map(|b| b.y_range)
    }

    /// Elements sounding at the start of this frame.
    pub fn sounding(&self) -> &[PlaybackElement] {
        match &self.data {
            Some(data) => &data.get().sounding,
            None => &[],
        }
    }

    /// Whether the lazy part has been computed yet.
    pub fn is_computed(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.is_computed())
    }

    /// Hints for animating from `previous` to this frame.
    ///
    /// A missing or empty previous frame means everything sounding now starts.
    /// Two empty frames give no hints.
    pub fn hints(&self, previous: Option<&CursorFrame>) -> Vec<CursorHint> {
        let empty: Vec<PlaybackElement> = Vec::new();
        let before = previous.map_or(empty.as_slice(), |p| p.sounding());
        let now = self.sounding();
        let starting = self.data.as_ref().map_or(empty.as_slice(), |d| d.get().starting.as_slice());
        let same_frame = previous.is_some_and(|p| self.same_entry(p));

        let mut hints: Vec<CursorHint> = before
            .iter()
            .filter(|e| !now.contains(e))
            .map(|e| CursorHint::Stop(*e))
            .collect();
        for element in now {
            if !before.contains(element) {
                hints.push(CursorHint::Start(*element));
            } else if starting.contains(element) && !same_frame {
                hints.push(CursorHint::Retrigger(*element));
            } else {
                hints.push(CursorHint::Sustain(*element));
            }
        }
        hints
    }

    fn same_entry(&self, other: &CursorFrame) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => {
                Arc::ptr_eq(&a.input().sequence, &b.input().sequence) && a.input().index == b.input().index
            }
            _ => false,
        }
    }
}

impl Default for CursorFrame {
    fn default() -> Self {
        Self::empty()
    }
}

fn compute_frame(source: &FrameSource) -> FrameData {
    let sequence = &source.sequence;
    let Some(entry) = sequence.entry(source.index) else {
        return FrameData::default();
    };

    let starting: Vec<PlaybackElement> = entry.interactables.iter().map(|i| i.element).collect();

    // Earlier entries of the same measure occurrence may still be sounding
    let start = entry.tick_range.start;
    let mut sounding = starting.clone();
    for earlier in sequence.entries()[..source.index]
        .iter()
        .rev()
        .take_while(|e| e.play_index == entry.play_index)
    {
        for interactable in &earlier.interactables {
            if interactable.time_range.start <= start
                && interactable.time_range.end > start
                && !sounding.contains(&interactable.element)
            {
                sounding.push(interactable.element);
            }
        }
    }

    let x_start = left_edge(entry.interactables.iter().map(|i| i.element));
    let next_left = sequence
        .entry(source.index + 1)
        .filter(|next| {
            next.element.system_index == entry.element.system_index && next.play_index >= entry.play_index
        })
        .map(|next| left_edge(next.interactables.iter().map(|i| i.element)))
        .filter(|left| *left > x_start);
    let x_end = next_left.unwrap_or_else(|| entry.element.part_rect.right().max(x_start));

    let part_rect = entry.element.part_rect;
    let bounds = FrameBounds {
        time_range: entry.tick_range,
        x_range: Span::new(x_start, x_end),
        y_range: Span::new(part_rect.top(), part_rect.bottom()),
    };
    let finite = [x_start, x_end, part_rect.top(), part_rect.bottom()]
        .iter()
        .all(|v| v.is_finite());

    FrameData {
        bounds: finite.then_some(bounds),
        starting,
        sounding,
    }
}

fn left_edge(elements: impl Iterator<Item = PlaybackElement>) -> f64 {
    elements.map(|e| e.rect.left()).fold(f64::INFINITY, f64::min)
}
