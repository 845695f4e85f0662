//! Timeline events and their post-processing.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::timeline::{Duplicate, Timeline};

/// A `(community name, time step)` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub name: String,
    pub step: u32,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, step: u32) -> Self {
        Self {
            name: name.into(),
            step,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Split,
    Merge,
    Birth,
    Death,
    Intermittence,
    Expansion,
    Contraction,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Split => "split",
            Self::Merge => "merge",
            Self::Birth => "birth",
            Self::Death => "death",
            Self::Intermittence => "intermittence",
            Self::Expansion => "expansion",
            Self::Contraction => "contraction",
        })
    }
}

/// A life-cycle event.
///
/// Edge events link two endpoints; point events mark a single one. The
/// untagged representation yields the visualisation wire shapes
/// `{"source":..,"target":..}` and `{"name":..,"step":..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Split { source: Endpoint, target: Endpoint },
    Merge { source: Endpoint, target: Endpoint },
    Expansion { source: Endpoint, target: Endpoint, growth: f64 },
    Contraction { source: Endpoint, target: Endpoint, reduction: f64 },
    Birth(Endpoint),
    Death(Endpoint),
    Intermittence(Endpoint),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Split { .. } => EventKind::Split,
            Self::Merge { .. } => EventKind::Merge,
            Self::Expansion { .. } => EventKind::Expansion,
            Self::Contraction { .. } => EventKind::Contraction,
            Self::Birth(_) => EventKind::Birth,
            Self::Death(_) => EventKind::Death,
            Self::Intermittence(_) => EventKind::Intermittence,
        }
    }

    /// Source endpoint of an edge event, or the single endpoint of a point event.
    pub fn source(&self) -> &Endpoint {
        match self {
            Self::Split { source, .. }
            | Self::Merge { source, .. }
            | Self::Expansion { source, .. }
            | Self::Contraction { source, .. } => source,
            Self::Birth(at) | Self::Death(at) | Self::Intermittence(at) => at,
        }
    }

    pub fn target(&self) -> Option<&Endpoint> {
        match self {
            Self::Split { target, .. }
            | Self::Merge { target, .. }
            | Self::Expansion { target, .. }
            | Self::Contraction { target, .. } => Some(target),
            Self::Birth(_) | Self::Death(_) | Self::Intermittence(_) => None,
        }
    }

    fn target_mut(&mut self) -> Option<&mut Endpoint> {
        match self {
            Self::Split { target, .. }
            | Self::Merge { target, .. }
            | Self::Expansion { target, .. }
            | Self::Contraction { target, .. } => Some(target),
            Self::Birth(_) | Self::Death(_) | Self::Intermittence(_) => None,
        }
    }
}

/// An ordered collection of events, in detection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventSet(Vec<Event>);

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.0.push(event);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.0.iter()
    }

    /// Repoint every target that names a removed duplicate to its survivor.
    pub fn correct_target(&mut self, duplicates: &[Duplicate]) {
        if duplicates.is_empty() {
            return;
        }
        let survivors: HashMap<&str, &str> = duplicates
            .iter()
            .map(|d| (d.removed.as_str(), d.survivor.as_str()))
            .collect();

        for target in self.0.iter_mut().filter_map(Event::target_mut) {
            if let Some(&survivor) = survivors.get(target.name.as_str()) {
                debug!(from = %target.name, to = survivor, "retargeting event");
                target.name = survivor.to_string();
            }
        }
    }

    /// Drop events whose endpoints no longer exist in `timeline`.
    ///
    /// An endpoint naming a community that is gone entirely counts as missing.
    pub fn remove_orphans(&mut self, timeline: &Timeline) {
        let present: HashMap<&str, HashSet<u32>> = timeline
            .iter()
            .map(|d| (d.name(), d.steps().iter().map(|s| s.number).collect()))
            .collect();
        let exists = |at: &Endpoint| {
            present
                .get(at.name.as_str())
                .is_some_and(|steps| steps.contains(&at.step))
        };

        let before = self.0.len();
        self.0
            .retain(|e| exists(e.source()) && e.target().is_none_or(|t| exists(t)));
        let removed = before - self.0.len();
        if removed > 0 {
            debug!(removed, "dropped orphan events");
        }
    }
}

impl From<Vec<Event>> for EventSet {
    fn from(events: Vec<Event>) -> Self {
        Self(events)
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EventSet {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Every event detected over a timeline, keyed by kind.
///
/// Field order is the key order of the serialized event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventLog {
    pub splits: EventSet,
    pub births: EventSet,
    pub merges: EventSet,
    pub deaths: EventSet,
    pub intermittents: EventSet,
    pub expansions: EventSet,
    pub contractions: EventSet,
}

impl EventLog {
    pub fn len(&self) -> usize {
        self.sets().map(EventSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.sets().flat_map(EventSet::iter)
    }

    fn sets(&self) -> impl Iterator<Item = &EventSet> {
        [
            &self.splits,
            &self.births,
            &self.merges,
            &self.deaths,
            &self.intermittents,
            &self.expansions,
            &self.contractions,
        ]
        .into_iter()
    }
}
