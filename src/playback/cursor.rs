//! Cursors
//!
//! A [`DiscreteCursor`] walks one Sequence entry by entry. A [`Cursor`] adds
//! time-based seeking on top, through a cheap/expensive locator pair.
//!
//! Cursors own their position, their locators and their subscribers. The
//! Sequence itself is shared (`Arc`) and never mutated, so any number of
//! cursors can read the same one.

use super::frame::{CursorFrame, CursorHint};
use super::locator::{CheapLocator, ExpensiveLocator, Locator};
use super::sequence::Sequence;
use super::subscribers::{SubscriptionId, Subscribers};
use super::types::{CursorState, PlaybackElement, SequenceEntry};
use crate::error::PlaybackError;
use log::trace;
use std::sync::Arc;

#[derive(Debug)]
pub struct DiscreteCursor {
    sequence: Arc<Sequence>,
    index: usize,
    subscribers: Subscribers<CursorState>,
    frame: CursorFrame,
    previous_frame: CursorFrame,
}

impl DiscreteCursor {
    pub fn new(sequence: Arc<Sequence>) -> Self {
        let frame = CursorFrame::new(sequence.clone(), 0);
        Self {
            sequence,
            index: 0,
            subscribers: Subscribers::new(),
            frame,
            previous_frame: CursorFrame::empty(),
        }
    }

    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_entry(&self) -> Option<&SequenceEntry> {
        self.sequence.entry(self.index)
    }

    pub fn current_element(&self) -> Option<PlaybackElement> {
        self.current_entry().map(|e| e.element)
    }

    pub fn state(&self) -> CursorState {
        CursorState {
            index: self.index,
            length: self.sequence.len(),
            element: self.current_element(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.sequence.len()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0 && !self.sequence.is_empty()
    }

    /// Step forward. At the last entry this does nothing.
    pub fn next(&mut self) {
        if self.has_next() {
            self.go_to(self.index + 1);
        }
    }

    /// Step back. At the first entry this does nothing.
    pub fn previous(&mut self) {
        if self.has_previous() {
            self.go_to(self.index - 1);
        }
    }

    /// Move to `index`, clamped to the Sequence. Subscribers hear about it
    /// only if the index actually changed.
    pub fn go_to(&mut self, index: usize) {
        let Some(last) = self.sequence.len().checked_sub(1) else {
            return;
        };
        let index = index.min(last);
        if index == self.index {
            return;
        }
        self.index = index;
        let frame = CursorFrame::new(self.sequence.clone(), index);
        self.previous_frame = std::mem::replace(&mut self.frame, frame);
        let state = self.state();
        self.subscribers.emit(&state);
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&CursorState) + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Frame of the current entry. Empty for an empty Sequence.
    pub fn frame(&self) -> &CursorFrame {
        &self.frame
    }

    /// Frame the cursor was on before its last move. Empty until it moves.
    pub fn previous_frame(&self) -> &CursorFrame {
        &self.previous_frame
    }

    /// Hints for animating from the previous frame to the current one.
    pub fn hints(&self) -> Vec<CursorHint> {
        self.frame.hints(Some(&self.previous_frame))
    }
}

/// A [`DiscreteCursor`] that can also be positioned by time.
#[derive(Debug)]
pub struct Cursor {
    inner: DiscreteCursor,
    cheap: CheapLocator,
    expensive: ExpensiveLocator,
}

impl Cursor {
    pub fn new(sequence: Arc<Sequence>) -> Self {
        Self {
            cheap: CheapLocator::new(sequence.clone()),
            expensive: ExpensiveLocator::new(sequence.clone()),
            inner: DiscreteCursor::new(sequence),
        }
    }

    /// Move to the entry sounding at `time_ms`.
    ///
    /// Times outside `[0, duration]` are clamped first. The cheap locator is
    /// asked before the expensive one. Seeking an empty Sequence does nothing.
    pub fn seek(&mut self, time_ms: f64) -> Result<(), PlaybackError> {
        let sequence = self.inner.sequence();
        if sequence.is_empty() {
            return Ok(());
        }
        let duration_ms = sequence.duration_ms();
        let time_ms = if time_ms.is_nan() { 0.0 } else { time_ms.clamp(0.0, duration_ms) };

        let index = match self.cheap.locate(time_ms) {
            Some(index) => index,
            None => {
                trace!("Cheap locator missed {}ms near index {}", time_ms, self.cheap.index());
                self.expensive
                    .locate(time_ms)
                    .ok_or_else(|| PlaybackError::LocatorCoverage {
                        time_ms,
                        duration_ms,
                        length: sequence.len(),
                    })?
            }
        };
        self.go_to(index);
        Ok(())
    }

    pub fn go_to(&mut self, index: usize) {
        self.inner.go_to(index);
        self.cheap.set_index(self.inner.current_index());
    }

    pub fn next(&mut self) {
        self.inner.next();
        self.cheap.set_index(self.inner.current_index());
    }

    pub fn previous(&mut self) {
        self.inner.previous();
        self.cheap.set_index(self.inner.current_index());
    }

    pub fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    pub fn has_previous(&self) -> bool {
        self.inner.has_previous()
    }

    pub fn sequence(&self) -> &Arc<Sequence> {
        self.inner.sequence()
    }

    pub fn current_index(&self) -> usize {
        self.inner.current_index()
    }

    pub fn current_entry(&self) -> Option<&SequenceEntry> {
        self.inner.current_entry()
    }

    pub fn current_element(&self) -> Option<PlaybackElement> {
        self.inner.current_element()
    }

    pub fn state(&self) -> CursorState {
        self.inner.state()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&CursorState) + 'static,
    {
        self.inner.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    pub fn frame(&self) -> &CursorFrame {
        self.inner.frame()
    }

    pub fn previous_frame(&self) -> &CursorFrame {
        self.inner.previous_frame()
    }

    pub fn hints(&self) -> Vec<CursorHint> {
        self.inner.hints()
    }
}
