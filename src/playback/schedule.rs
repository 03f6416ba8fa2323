//! Measure schedule
//!
//! Lays the play order out in time. Each rendered measure is flattened once
//! into placed elements (offset + duration from the measure start); each
//! played measure then gets absolute beat and millisecond bounds from the
//! tempo map. Sequences and the timeline both read from here, so every part
//! agrees on when a measure starts.

use super::measures::MeasureSequenceIterator;
use super::tempo::TempoMap;
use super::types::PlaybackElement;
use crate::config::PlaybackConfig;
use crate::fraction::Fraction;
use crate::score::{Measure, MeasurePart, Score, Voice, VoiceEntry};
use log::{debug, warn};

/// A playable element positioned inside its measure
#[derive(Debug, Clone, Copy)]
pub struct PlacedElement {
    /// Quarter notes from the start of the measure
    pub offset: Fraction,
    pub duration: Fraction,
    pub element: PlaybackElement,
}

/// A measure flattened into time order, independent of how often it is played
#[derive(Debug, Clone, Default)]
pub struct MeasureLayout {
    /// Longest voice extent, summed over fragments
    pub length: Fraction,
    /// All parts' elements, ordered by offset, score order within an offset
    pub elements: Vec<PlacedElement>,
    /// Tempo directions as `(offset, bpm)`, ordered by offset
    pub tempos: Vec<(Fraction, f64)>,
}

/// One measure occurrence in play order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledMeasure {
    /// Position in play order
    pub play_index: usize,
    /// Position in the score's measure list
    pub position: usize,
    pub measure_index: usize,
    pub system_index: usize,
    pub start_beat: Fraction,
    pub end_beat: Fraction,
    pub start_ms: f64,
    pub end_ms: f64,
}

#[derive(Debug, Clone)]
pub struct MeasureSchedule {
    layouts: Vec<MeasureLayout>,
    measures: Vec<ScheduledMeasure>,
    tempo: TempoMap,
    jump_times: Vec<f64>,
    system_end_times: Vec<f64>,
}

impl MeasureSchedule {
    /// Expand the score's repeats and schedule the resulting play order.
    pub fn new(score: &Score, config: &PlaybackConfig) -> Self {
        let mut iter = MeasureSequenceIterator::from_score(score);
        let positions: Vec<usize> = std::iter::from_fn(|| iter.next_position())
            .map(|(_, position)| position)
            .collect();
        Self::from_positions(score, &positions, config)
    }

    /// Schedule an explicit play order, given as positions in `score.measures`.
    ///
    /// Positions outside the measure list are skipped with a warning.
    pub fn from_positions(score: &Score, positions: &[usize], config: &PlaybackConfig) -> Self {
        let layouts: Vec<MeasureLayout> = score.measures.iter().map(layout_measure).collect();

        let initial_bpm = score.metadata.tempo.unwrap_or(config.default_tempo);
        let mut tempo = TempoMap::new(initial_bpm, config.playback_rate);
        let mut beat = Fraction::zero();
        let mut placed = Vec::with_capacity(positions.len());

        for &position in positions {
            let Some(measure) = score.measures.get(position) else {
                warn!("Skipping play-order position {} outside the score", position);
                continue;
            };
            let layout = &layouts[position];
            let Some(end_beat) = beat.checked_add(layout.length) else {
                warn!(
                    "Play order overflows the beat range at measure {}; dropping the remaining {} measure(s)",
                    measure.index,
                    positions.len() - placed.len()
                );
                break;
            };
            for (offset, bpm) in &layout.tempos {
                if let Some(at) = beat.checked_add(*offset) {
                    tempo.set_tempo(at, *bpm);
                }
            }
            placed.push((position, measure, beat, end_beat));
            beat = end_beat;
        }

        let measures: Vec<ScheduledMeasure> = placed
            .into_iter()
            .enumerate()
            .map(|(play_index, (position, measure, start_beat, end_beat))| ScheduledMeasure {
                play_index,
                position,
                measure_index: measure.index,
                system_index: measure.system_index,
                start_beat,
                end_beat,
                start_ms: tempo.ms_at(start_beat),
                end_ms: tempo.ms_at(end_beat),
            })
            .collect();

        let mut jump_times = Vec::new();
        let mut system_end_times = Vec::new();
        for (current, next) in measures.iter().zip(measures.iter().skip(1).map(Some).chain([None])) {
            match next {
                Some(next) => {
                    if next.position <= current.position {
                        jump_times.push(current.end_ms);
                    }
                    if next.system_index != current.system_index {
                        system_end_times.push(current.end_ms);
                    }
                }
                None => system_end_times.push(current.end_ms),
            }
        }

        debug!(
            "Scheduled {} measures over {}ms with {} jumps and {} tempo segments",
            measures.len(),
            measures.last().map_or(0.0, |m| m.end_ms),
            jump_times.len(),
            tempo.segments().len()
        );

        Self {
            layouts,
            measures,
            tempo,
            jump_times,
            system_end_times,
        }
    }

    pub fn measures(&self) -> &[ScheduledMeasure] {
        &self.measures
    }

    /// The flattened layout of the measure at a score list position.
    pub fn layout(&self, position: usize) -> Option<&MeasureLayout> {
        self.layouts.get(position)
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo
    }

    /// Millisecond time of an absolute played-beat position.
    pub fn ms_at(&self, beat: Fraction) -> f64 {
        self.tempo.ms_at(beat)
    }

    pub fn duration_ms(&self) -> f64 {
        self.measures.last().map_or(0.0, |m| m.end_ms)
    }

    /// End times of measures after which playback jumps backwards.
    pub fn jump_times(&self) -> &[f64] {
        &self.jump_times
    }

    /// End times of measures after which playback leaves their system.
    pub fn system_end_times(&self) -> &[f64] {
        &self.system_end_times
    }
}

/// Flatten one measure: walk fragments, parts, staves and voices in score order.
fn layout_measure(measure: &Measure) -> MeasureLayout {
    let mut layout = MeasureLayout::default();
    let mut fragment_start = Fraction::zero();

    for fragment in &measure.fragments {
        let mut fragment_length = Fraction::zero();
        for part in &fragment.parts {
            for stave in &part.staves {
                for voice in &stave.voices {
                    let extent = place_voice(voice, measure, part, fragment_start, &mut layout);
                    fragment_length = fragment_length.max(extent);
                }
            }
        }
        match fragment_start.checked_add(fragment_length) {
            Some(end) => fragment_start = end,
            None => {
                warn!(
                    "Measure {} overflows the beat range; ignoring its later fragments",
                    measure.index
                );
                break;
            }
        }
    }

    layout.length = fragment_start;
    layout.elements.sort_by_key(|e| e.offset);
    layout.tempos.sort_by_key(|(offset, _)| *offset);
    layout
}

/// Place one voice's entries; returns how far the voice reaches into the fragment.
///
/// Entries whose position would overflow the beat range are dropped with a
/// warning and leave the voice cursor where it was.
fn place_voice(
    voice: &Voice,
    measure: &Measure,
    part: &MeasurePart,
    fragment_start: Fraction,
    layout: &mut MeasureLayout,
) -> Fraction {
    let mut cursor = Fraction::zero();
    let mut extent = Fraction::zero();

    for entry in &voice.entries {
        match entry {
            VoiceEntry::Tempo { bpm } => match fragment_start.checked_add(cursor) {
                Some(offset) => layout.tempos.push((offset, *bpm)),
                None => overflow_warning(measure, part, "tempo"),
            },
            VoiceEntry::Backup { duration } => {
                let duration = non_negative(*duration, measure, part, "backup");
                match cursor.checked_sub(duration).filter(|c| !c.is_negative()) {
                    Some(moved) => cursor = moved,
                    None => {
                        warn!(
                            "Backup of {} exceeds elapsed {} in measure {} part {}; clamping to zero",
                            duration, cursor, measure.index, part.part_index
                        );
                        cursor = Fraction::zero();
                    }
                }
            }
            VoiceEntry::Forward { duration } => {
                let duration = non_negative(*duration, measure, part, "forward");
                match advance(fragment_start, cursor, duration) {
                    Some(moved) => {
                        cursor = moved;
                        extent = extent.max(cursor);
                    }
                    None => overflow_warning(measure, part, "forward"),
                }
            }
            VoiceEntry::Note(_) | VoiceEntry::Rest(_) | VoiceEntry::Chord(_) => {
                let Some((kind, playable)) = entry.playable() else {
                    continue;
                };
                let duration = non_negative(playable.duration, measure, part, "duration");
                let (Some(end), Some(offset)) =
                    (advance(fragment_start, cursor, duration), fragment_start.checked_add(cursor))
                else {
                    overflow_warning(measure, part, "element");
                    continue;
                };
                layout.elements.push(PlacedElement {
                    offset,
                    duration,
                    element: PlaybackElement {
                        id: playable.id,
                        kind,
                        part_index: part.part_index,
                        measure_index: measure.index,
                        system_index: measure.system_index,
                        rect: playable.rect,
                        part_rect: part.rect,
                    },
                });
                cursor = end;
                extent = extent.max(cursor);
            }
        }
    }

    extent
}

/// `cursor + duration`, provided the result also fits once offset by `fragment_start`.
fn advance(fragment_start: Fraction, cursor: Fraction, duration: Fraction) -> Option<Fraction> {
    let moved = cursor.checked_add(duration)?;
    fragment_start.checked_add(moved)?;
    Some(moved)
}

fn overflow_warning(measure: &Measure, part: &MeasurePart, what: &str) {
    warn!(
        "Dropping {} in measure {} part {}: position overflows the beat range",
        what, measure.index, part.part_index
    );
}

fn non_negative(duration: Fraction, measure: &Measure, part: &MeasurePart, what: &str) -> Fraction {
    if duration.is_negative() {
        warn!(
            "Negative {} {} in measure {} part {}; clamping to zero",
            what, duration, measure.index, part.part_index
        );
    }
    duration.clamp_non_negative()
}
