//! Locators
//!
//! Map a queried time to a Sequence index. The [`CheapLocator`] answers
//! frame-to-frame queries in constant time by looking around the last known
//! index; the [`ExpensiveLocator`] binary-searches the whole Sequence and is
//! consulted when the cheap one misses (after a scrub, for example).
//!
//! Neither locator clamps. Times outside `[0, duration]` simply miss; the
//! cursor clamps before asking.

use super::sequence::Sequence;
use std::sync::Arc;

/// Strategy mapping a time in milliseconds to a Sequence index
pub trait Locator {
    /// The index whose entry owns `time_ms`, or `None`. Never a wrong index.
    fn locate(&self, time_ms: f64) -> Option<usize>;
}

/// Checks the neighbourhood of a remembered index: `index - 1`, `index`, `index + 1`.
#[derive(Debug, Clone)]
pub struct CheapLocator {
    sequence: Arc<Sequence>,
    index: usize,
}

impl CheapLocator {
    pub fn new(sequence: Arc<Sequence>) -> Self {
        Self { sequence, index: 0 }
    }

    /// Remember where the caller currently is.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Builder form of [`CheapLocator::set_index`].
    pub fn set_starting_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Locator for CheapLocator {
    fn locate(&self, time_ms: f64) -> Option<usize> {
        let candidates = [self.index.checked_sub(1), Some(self.index), self.index.checked_add(1)];
        candidates
            .into_iter()
            .flatten()
            .find(|&index| self.sequence.covers(index, time_ms))
    }
}

/// Binary search over the Sequence's sorted, non-overlapping tick ranges.
#[derive(Debug, Clone)]
pub struct ExpensiveLocator {
    sequence: Arc<Sequence>,
}

impl ExpensiveLocator {
    pub fn new(sequence: Arc<Sequence>) -> Self {
        Self { sequence }
    }
}

impl Locator for ExpensiveLocator {
    fn locate(&self, time_ms: f64) -> Option<usize> {
        let entries = self.sequence.entries();
        // First entry that has not ended by `time_ms`
        let index = entries.partition_point(|e| e.tick_range.end <= time_ms);
        if self.sequence.covers(index, time_ms) {
            return Some(index);
        }
        // The end of the Sequence belongs to the last entry
        let last = entries.len().checked_sub(1)?;
        self.sequence.covers(last, time_ms).then_some(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackConfig;
    use crate::playback::schedule::MeasureSchedule;
    use crate::playback::sequence::SequenceFactory;
    use crate::playback::tests::fixtures::*;

    fn sequence() -> Arc<Sequence> {
        let score = ScoreBuilder::new(1)
            .measure(0, vec![part(0, vec![quarter_notes(1, 4)])])
            .measure(0, vec![part(0, vec![half_notes(5, 2)])])
            .measure(0, vec![part(0, vec![eighth_notes(7, 8)])])
            .tempo(100.0)
            .build();
        let schedule = MeasureSchedule::new(&score, &PlaybackConfig::default());
        Arc::new(SequenceFactory::new(&score, &schedule).create_for_part(0))
    }

    fn linear_scan(sequence: &Sequence, time_ms: f64) -> Option<usize> {
        (0..sequence.len()).find(|&i| sequence.covers(i, time_ms))
    }

    #[test]
    fn test_expensive_matches_linear_scan() {
        let sequence = sequence();
        let locator = ExpensiveLocator::new(sequence.clone());
        let mut t = 0.0;
        while t < sequence.duration_ms() {
            assert_eq!(locator.locate(t), linear_scan(&sequence, t), "mismatch at {}ms", t);
            t += 37.5;
        }
        // Every boundary exactly
        for entry in sequence.iter() {
            let t = entry.tick_range.start;
            assert_eq!(locator.locate(t), linear_scan(&sequence, t));
        }
    }

    #[test]
    fn test_cheap_is_never_wrong() {
        let sequence = sequence();
        for start in 0..sequence.len() {
            let locator = CheapLocator::new(sequence.clone()).set_starting_index(start);
            let mut t = 0.0;
            while t < sequence.duration_ms() {
                if let Some(found) = locator.locate(t) {
                    assert_eq!(Some(found), linear_scan(&sequence, t));
                }
                t += 50.0;
            }
        }
    }

    #[test]
    fn test_cheap_finds_neighbours() {
        let sequence = sequence();
        let mut locator = CheapLocator::new(sequence.clone());
        locator.set_index(1);
        assert_eq!(locator.locate(0.0), Some(0));
        assert_eq!(locator.locate(700.0), Some(1));
        assert_eq!(locator.locate(1300.0), Some(2));
        // Two steps away is a miss, not a guess
        assert_eq!(locator.locate(1900.0), None);
    }

    #[test]
    fn test_end_of_sequence_belongs_to_last_entry() {
        let sequence = sequence();
        let last = sequence.len() - 1;
        let expensive = ExpensiveLocator::new(sequence.clone());
        assert_eq!(expensive.locate(sequence.duration_ms()), Some(last));
        let cheap = CheapLocator::new(sequence.clone()).set_starting_index(last);
        assert_eq!(cheap.locate(sequence.duration_ms()), Some(last));
    }

    #[test]
    fn test_out_of_range_misses() {
        let sequence = sequence();
        let expensive = ExpensiveLocator::new(sequence.clone());
        assert_eq!(expensive.locate(-1.0), None);
        assert_eq!(expensive.locate(sequence.duration_ms() + 1.0), None);
    }

    #[test]
    fn test_empty_sequence_misses() {
        let empty = Arc::new(Sequence::new(0, vec![], 0.0));
        assert_eq!(ExpensiveLocator::new(empty.clone()).locate(0.0), None);
        assert_eq!(CheapLocator::new(empty).locate(0.0), None);
    }
}
