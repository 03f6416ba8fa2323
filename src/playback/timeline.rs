//! Timeline
//!
//! One absolute, time-ordered event log merged from every Sequence of a
//! score: element starts and stops, backward repeat jumps, and system ends.
//! Built once per render; the host walks it to drive audio or highlighting.
//!
//! ## Ordering
//! - Events are ascending by integer-millisecond time.
//! - All transitions at one millisecond share a single [`TimelineEvent::Transition`],
//!   with stops listed before starts, so a re-struck note never appears to
//!   overlap itself.
//! - At equal times, kinds are ordered transition, then jump, then system end.

use super::schedule::MeasureSchedule;
use super::sequence::Sequence;
use super::types::PlaybackElement;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub element: PlaybackElement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimelineEvent {
    Transition { time: u64, transitions: Vec<Transition> },
    Jump { time: u64 },
    SystemEnd { time: u64 },
}

impl TimelineEvent {
    pub fn time(&self) -> u64 {
        match self {
            TimelineEvent::Transition { time, .. }
            | TimelineEvent::Jump { time }
            | TimelineEvent::SystemEnd { time } => *time,
        }
    }

    /// Tie-break between kinds at equal times
    fn rank(&self) -> u8 {
        match self {
            TimelineEvent::Transition { .. } => 0,
            TimelineEvent::Jump { .. } => 1,
            TimelineEvent::SystemEnd { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    duration_ms: u64,
}

#[derive(Default)]
struct Moment {
    stops: Vec<Transition>,
    starts: Vec<Transition>,
}

impl Timeline {
    /// Merge Sequences (in the given order) with the schedule's jumps and system ends.
    pub fn new(sequences: &[Sequence], schedule: &MeasureSchedule) -> Self {
        let mut instants: BTreeMap<u64, Moment> = BTreeMap::new();

        for sequence in sequences {
            for entry in sequence {
                for interactable in &entry.interactables {
                    let element = interactable.element;
                    instants
                        .entry(to_millis(interactable.time_range.start))
                        .or_default()
                        .starts
                        .push(Transition {
                            kind: TransitionKind::Start,
                            element,
                        });
                    instants
                        .entry(to_millis(interactable.time_range.end))
                        .or_default()
                        .stops
                        .push(Transition {
                            kind: TransitionKind::Stop,
                            element,
                        });
                }
            }
        }

        let mut events: Vec<TimelineEvent> = instants
            .into_iter()
            .map(|(time, moment)| {
                let mut transitions = moment.stops;
                transitions.extend(moment.starts);
                TimelineEvent::Transition { time, transitions }
            })
            .collect();
        events.extend(
            schedule
                .jump_times()
                .iter()
                .map(|&t| TimelineEvent::Jump { time: to_millis(t) }),
        );
        events.extend(
            schedule
                .system_end_times()
                .iter()
                .map(|&t| TimelineEvent::SystemEnd { time: to_millis(t) }),
        );
        events.sort_by_key(|e| (e.time(), e.rank()));

        let duration_ms = to_millis(schedule.duration_ms());
        debug!("Built timeline with {} events over {}ms", events.len(), duration_ms);

        Self { events, duration_ms }
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Events with `start_ms <= time < end_ms`.
    pub fn events_between(&self, start_ms: u64, end_ms: u64) -> &[TimelineEvent] {
        let from = self.events.partition_point(|e| e.time() < start_ms);
        let to = self.events.partition_point(|e| e.time() < end_ms).max(from);
        &self.events[from..to]
    }
}

fn to_millis(time_ms: f64) -> u64 {
    time_ms.max(0.0).round() as u64
}
