//! Tempo map
//!
//! Converts played-beat positions into milliseconds across tempo changes.

use crate::fraction::Fraction;
use log::warn;

/// One stretch of constant tempo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSegment {
    /// Played-beat position (quarter notes since playback start) where the tempo takes effect
    pub start_beat: Fraction,
    /// Millisecond time of `start_beat`
    pub start_ms: f64,
    /// Quarter-note BPM
    pub bpm: f64,
}

impl TempoSegment {
    fn ms_per_quarter(&self) -> f64 {
        60000.0 / self.bpm
    }
}

/// Piecewise-linear beat → millisecond mapping.
///
/// Tempo changes must be pushed in ascending beat order, which is what walking
/// the play order produces. A change never affects time before it.
#[derive(Debug, Clone)]
pub struct TempoMap {
    segments: Vec<TempoSegment>,
    /// Divides every millisecond value
    rate: f64,
}

impl TempoMap {
    /// A map with one segment at beat zero.
    pub fn new(initial_bpm: f64, playback_rate: f64) -> Self {
        let bpm = sanitize_bpm(initial_bpm).unwrap_or(crate::config::DEFAULT_TEMPO);
        Self {
            segments: vec![TempoSegment {
                start_beat: Fraction::zero(),
                start_ms: 0.0,
                bpm,
            }],
            rate: if playback_rate.is_finite() && playback_rate > 0.0 {
                playback_rate
            } else {
                1.0
            },
        }
    }

    /// Switch tempo at `beat`. Invalid tempos are ignored with a warning.
    pub fn set_tempo(&mut self, beat: Fraction, bpm: f64) {
        let Some(bpm) = sanitize_bpm(bpm) else {
            warn!("Ignoring invalid tempo {} at beat {}", bpm, beat);
            return;
        };

        let last = self.segments[self.segments.len() - 1];
        if beat < last.start_beat {
            warn!(
                "Ignoring tempo {} at beat {} before the current segment at beat {}",
                bpm, beat, last.start_beat
            );
            return;
        }
        if last.bpm == bpm {
            return;
        }

        let start_ms = self.unscaled_ms_at(beat);
        if beat == last.start_beat {
            // Several directions at the same instant: the last one wins
            let len = self.segments.len();
            self.segments[len - 1].bpm = bpm;
        } else {
            self.segments.push(TempoSegment {
                start_beat: beat,
                start_ms,
                bpm,
            });
        }
    }

    /// Millisecond time of a played-beat position.
    pub fn ms_at(&self, beat: Fraction) -> f64 {
        self.unscaled_ms_at(beat) / self.rate
    }

    /// Tempo in effect at a played-beat position.
    pub fn bpm_at(&self, beat: Fraction) -> f64 {
        self.segment_at(beat).bpm
    }

    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }

    fn unscaled_ms_at(&self, beat: Fraction) -> f64 {
        let segment = self.segment_at(beat);
        let elapsed = match beat.checked_sub(segment.start_beat) {
            Some(elapsed) => elapsed.to_f64(),
            None => beat.to_f64() - segment.start_beat.to_f64(),
        };
        segment.start_ms + elapsed * segment.ms_per_quarter()
    }

    fn segment_at(&self, beat: Fraction) -> &TempoSegment {
        // Last segment starting at or before `beat`; the first one covers negatives
        let after = self.segments.partition_point(|s| s.start_beat <= beat);
        &self.segments[after.saturating_sub(1)]
    }
}

fn sanitize_bpm(bpm: f64) -> Option<f64> {
    (bpm.is_finite() && bpm > 0.0).then_some(bpm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_tempo() {
        let map = TempoMap::new(100.0, 1.0);
        // 600ms per quarter at 100 BPM
        assert_eq!(map.ms_at(Fraction::from_integer(1)), 600.0);
        assert_eq!(map.ms_at(Fraction::from_integer(4)), 2400.0);
        assert_eq!(map.ms_at(Fraction::new(1, 2)), 300.0);
    }

    #[test]
    fn test_tempo_change_is_prospective() {
        let mut map = TempoMap::new(120.0, 1.0);
        map.set_tempo(Fraction::from_integer(4), 60.0);
        // First four beats at 500ms each are untouched
        assert_eq!(map.ms_at(Fraction::from_integer(4)), 2000.0);
        // Afterwards one beat lasts a full second
        assert_eq!(map.ms_at(Fraction::from_integer(5)), 3000.0);
        assert_eq!(map.bpm_at(Fraction::from_integer(3)), 120.0);
        assert_eq!(map.bpm_at(Fraction::from_integer(4)), 60.0);
    }

    #[test]
    fn test_invalid_tempo_is_ignored() {
        let mut map = TempoMap::new(120.0, 1.0);
        map.set_tempo(Fraction::from_integer(1), 0.0);
        map.set_tempo(Fraction::from_integer(1), f64::NAN);
        assert_eq!(map.segments().len(), 1);
    }

    #[test]
    fn test_same_instant_last_wins() {
        let mut map = TempoMap::new(120.0, 1.0);
        map.set_tempo(Fraction::from_integer(2), 60.0);
        map.set_tempo(Fraction::from_integer(2), 30.0);
        assert_eq!(map.segments().len(), 2);
        assert_eq!(map.bpm_at(Fraction::from_integer(2)), 30.0);
    }

    #[test]
    fn test_playback_rate_scales_time() {
        let map = TempoMap::new(120.0, 2.0);
        assert_eq!(map.ms_at(Fraction::from_integer(1)), 250.0);
    }

    #[test]
    fn test_invalid_initial_tempo_falls_back() {
        let map = TempoMap::new(-10.0, 1.0);
        assert_eq!(map.bpm_at(Fraction::zero()), 120.0);
    }
}
