//! Dynamic community timeline and life-cycle event detection.
//!
//! Event definitions follow Greene, Doyle and Cunningham, "Tracking the
//! evolution of communities in dynamic social networks" (ASONAM 2010).
//!
//! Split and merge detection *regularize* the timeline: the lineage a
//! branching community shares with its sibling is cut away, which can leave
//! two communities with identical steps. Those are deduplicated and events
//! that named the removed copy are repointed at the survivor. Every other
//! detector reads the regularized state, so splits and merges run first.

use std::collections::HashSet;
use std::io::Read;

use serde::Serialize;
use tracing::{debug, info};

use crate::community::{DynamicCommunity, Step};
use crate::error::{Result, TimelineError};
use crate::events::{Endpoint, Event, EventSet};
use crate::membership::StepCommunities;
use crate::records::read_records;

/// A community removed by deduplication, and the one that absorbed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub survivor: String,
    pub removed: String,
}

/// Ordered collection of dynamic communities, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    communities: Vec<DynamicCommunity>,
}

impl Timeline {
    /// Read a timeline in tracker text format, one `NAME:T=C,...` per line.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut communities = Vec::new();
        let mut names = HashSet::new();
        for (line, record) in read_records(reader, b':')? {
            if record.len() != 2 {
                return Err(TimelineError::MalformedLine {
                    line,
                    content: record.iter().collect::<Vec<_>>().join(":"),
                });
            }

            let community = DynamicCommunity::parse(&record[0], &record[1], line)?;
            if !names.insert(community.name.clone()) {
                return Err(TimelineError::DuplicateName {
                    line,
                    name: community.name,
                });
            }
            communities.push(community);
        }

        info!(communities = communities.len(), "parsed timeline");
        Ok(Self { communities })
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DynamicCommunity> {
        self.communities.iter()
    }

    pub fn get(&self, name: &str) -> Option<&DynamicCommunity> {
        self.communities.iter().find(|d| d.name == name)
    }

    /// Remove communities whose steps equal those of an earlier community.
    ///
    /// The first community of each group of identical lineages survives and
    /// every other member is reported against it, in timeline order.
    pub fn deduplicate(&mut self) -> Vec<Duplicate> {
        let n = self.communities.len();
        let mut removed = vec![false; n];
        let mut duplicates = Vec::new();

        for j in 1..n {
            let survivor = (0..j).find(|&i| {
                !removed[i] && self.communities[i].steps == self.communities[j].steps
            });
            if let Some(i) = survivor {
                removed[j] = true;
                debug!(
                    survivor = %self.communities[i].name,
                    removed = %self.communities[j].name,
                    "removing duplicate community"
                );
                duplicates.push(Duplicate {
                    survivor: self.communities[i].name.clone(),
                    removed: self.communities[j].name.clone(),
                });
            }
        }

        let mut flags = removed.into_iter();
        self.communities.retain(|_| !flags.next().unwrap_or(false));
        duplicates
    }

    /// Find split events and regularize the branching communities.
    ///
    /// A split occurs when D_j shares the lineage of D_i up to time t-1 but
    /// diverges from t onwards. D_j keeps only its steps from t.
    pub fn find_splits(&mut self) -> EventSet {
        let mut splits = EventSet::new();
        let n = self.communities.len();

        for i in 0..n {
            for j in i + 1..n {
                let (d_i, d_j) = self.pair_mut(i, j);
                if d_i.first() != d_j.first() {
                    continue;
                }
                let Some((shared, branch)) =
                    first_divergence(d_i.steps.iter(), d_j.steps.iter())
                else {
                    continue;
                };

                debug!(from = %d_i.name, to = %d_j.name, at = branch.number, "split");
                splits.push(Event::Split {
                    source: Endpoint::new(&d_i.name, shared.number),
                    target: Endpoint::new(&d_j.name, branch.number),
                });
                d_j.remove_until(branch);
            }
        }

        let duplicates = self.deduplicate();
        splits.correct_target(&duplicates);
        info!(
            splits = splits.len(),
            duplicates = duplicates.len(),
            "detected splits"
        );
        splits
    }

    /// Find merge events and regularize the merging communities.
    ///
    /// A merge occurs when D_i and D_j, distinct at time t-1, match the same
    /// step community at t and share their lineage from there. D_j keeps
    /// only its steps up to t-1.
    pub fn find_merges(&mut self) -> EventSet {
        let mut merges = EventSet::new();
        let n = self.communities.len();

        for i in 0..n {
            for j in i + 1..n {
                let (d_i, d_j) = self.pair_mut(i, j);
                if d_i.last() != d_j.last() {
                    continue;
                }
                let Some((shared, branch)) =
                    first_divergence(d_i.steps.iter().rev(), d_j.steps.iter().rev())
                else {
                    continue;
                };

                debug!(from = %d_j.name, to = %d_i.name, at = shared.number, "merge");
                merges.push(Event::Merge {
                    source: Endpoint::new(&d_j.name, branch.number),
                    target: Endpoint::new(&d_i.name, shared.number),
                });
                d_j.remove_after(branch);
            }
        }

        let duplicates = self.deduplicate();
        merges.correct_target(&duplicates);
        info!(
            merges = merges.len(),
            duplicates = duplicates.len(),
            "detected merges"
        );
        merges
    }

    /// One birth per community, at its first step.
    pub fn find_births(&self) -> EventSet {
        self.iter()
            .map(|d| Event::Birth(Endpoint::new(&d.name, d.first().number)))
            .collect()
    }

    pub fn find_deaths(&self) -> EventSet {
        self.iter()
            .map(|d| Event::Death(Endpoint::new(&d.name, d.last().number)))
            .collect()
    }

    /// One intermittence per gap, at the first missing time step.
    pub fn find_intermittents(&self) -> EventSet {
        self.iter()
            .flat_map(|d| {
                d.steps
                    .windows(2)
                    .filter(|w| w[0].number + 1 != w[1].number)
                    .map(move |w| Event::Intermittence(Endpoint::new(&d.name, w[0].number + 1)))
            })
            .collect()
    }

    /// Consecutive steps where the step community grows by more than
    /// `threshold` (e.g. 0.10 for 10%).
    pub fn find_expansions(&self, table: &StepCommunities, threshold: f64) -> Result<EventSet> {
        let mut expansions = EventSet::new();
        for d in self.iter() {
            for w in d.steps.windows(2) {
                let (c_i, c_j) = (table.size(w[0])?, table.size(w[1])?);
                if let Some(growth) = relative_change(c_i, c_j).filter(|&g| g > threshold) {
                    expansions.push(Event::Expansion {
                        source: Endpoint::new(&d.name, w[0].number),
                        target: Endpoint::new(&d.name, w[1].number),
                        growth,
                    });
                }
            }
        }
        info!(expansions = expansions.len(), threshold, "detected expansions");
        Ok(expansions)
    }

    /// Consecutive steps where the step community shrinks by more than
    /// `threshold`, measured against the later, smaller size.
    pub fn find_contractions(
        &self,
        table: &StepCommunities,
        threshold: f64,
    ) -> Result<EventSet> {
        let mut contractions = EventSet::new();
        for d in self.iter() {
            for w in d.steps.windows(2) {
                let (c_i, c_j) = (table.size(w[0])?, table.size(w[1])?);
                if let Some(reduction) = relative_change(c_j, c_i).filter(|&r| r > threshold) {
                    contractions.push(Event::Contraction {
                        source: Endpoint::new(&d.name, w[0].number),
                        target: Endpoint::new(&d.name, w[1].number),
                        reduction,
                    });
                }
            }
        }
        info!(
            contractions = contractions.len(),
            threshold,
            "detected contractions"
        );
        Ok(contractions)
    }

    fn pair_mut(&mut self, i: usize, j: usize) -> (&DynamicCommunity, &mut DynamicCommunity) {
        debug_assert!(i < j);
        let (head, tail) = self.communities.split_at_mut(j);
        (&head[i], &mut tail[0])
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a DynamicCommunity;
    type IntoIter = std::slice::Iter<'a, DynamicCommunity>;

    fn into_iter(self) -> Self::IntoIter {
        self.communities.iter()
    }
}

/// Walk two step sequences in lockstep and return the last shared step of
/// the first one together with the second's step at the first position
/// where both have a step and they differ.
fn first_divergence<'a>(
    a: impl Iterator<Item = &'a Step>,
    b: impl Iterator<Item = &'a Step>,
) -> Option<(Step, Step)> {
    let mut shared = None;
    for (s_i, s_j) in a.zip(b) {
        if s_i != s_j {
            return shared.map(|prev| (prev, *s_j));
        }
        shared = Some(*s_i);
    }
    None
}

/// `(larger - smaller) / smaller` when `larger` really is larger.
///
/// A change of exactly the threshold never compares as greater.
fn relative_change(smaller: usize, larger: usize) -> Option<f64> {
    (larger > smaller).then(|| (larger - smaller) as f64 / smaller as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(text: &str) -> Timeline {
        Timeline::parse(text).unwrap()
    }

    fn lines(t: &Timeline) -> Vec<String> {
        t.iter().map(ToString::to_string).collect()
    }

    fn split(src: (&str, u32), dst: (&str, u32)) -> Event {
        Event::Split {
            source: Endpoint::new(src.0, src.1),
            target: Endpoint::new(dst.0, dst.1),
        }
    }

    fn merge(src: (&str, u32), dst: (&str, u32)) -> Event {
        Event::Merge {
            source: Endpoint::new(src.0, src.1),
            target: Endpoint::new(dst.0, dst.1),
        }
    }

    #[test]
    fn parse_reports_line_numbers() {
        let err = Timeline::parse("A:1=1\nB 1=1\n").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedLine { line: 2, .. }));

        let err = Timeline::parse("A:1=1\n\nB:1=x\n").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedStep { line: 3, .. }));

        let err = Timeline::parse("A:1=1\r\n\r\nB:1=1\r\nC:1=x\r\n").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedStep { line: 4, .. }));

        let err = Timeline::parse("A:1=1\nA:2=1\n").unwrap_err();
        assert!(matches!(err, TimelineError::DuplicateName { line: 2, .. }));

        let err = Timeline::parse("A:1=1:2=1\n").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn parse_keeps_input_order() {
        let t = timeline("B:1=1,2=1\r\nA:2=3\n");
        assert_eq!(lines(&t), vec!["B:1=1,2=1", "A:2=3"]);
        assert_eq!(t.get("A").unwrap().first(), Step::new(2, 3));
    }

    #[test]
    fn split_emits_branch_point_and_drops_shared_prefix() {
        let mut t = timeline("A:1=1,2=1,3=1\nB:1=1,2=2,3=2\n");
        let splits = t.find_splits();

        assert_eq!(splits.iter().cloned().collect::<Vec<_>>(), vec![split(("A", 1), ("B", 2))]);
        assert_eq!(lines(&t), vec!["A:1=1,2=1,3=1", "B:2=2,3=2"]);
    }

    #[test]
    fn split_requires_same_first_step() {
        let mut t = timeline("A:1=1,2=1\nB:1=2,2=2\nC:2=1,3=1\n");
        assert!(t.find_splits().is_empty());
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn prefix_lineage_is_not_a_split() {
        let mut t = timeline("A:1=1,2=1,3=1\nB:1=1,2=1\n");
        assert!(t.find_splits().is_empty());
        assert_eq!(lines(&t), vec!["A:1=1,2=1,3=1", "B:1=1,2=1"]);
    }

    #[test]
    fn split_compares_by_position_not_time() {
        // B skips time 2: position 1 is 3=1 against 2=1.
        let mut t = timeline("A:1=1,2=1,3=1\nB:1=1,3=1\n");
        let splits = t.find_splits();
        assert_eq!(splits.iter().cloned().collect::<Vec<_>>(), vec![split(("A", 1), ("B", 3))]);
        assert_eq!(lines(&t), vec!["A:1=1,2=1,3=1", "B:3=1"]);
    }

    #[test]
    fn identical_lineages_collapse_after_splits() {
        let mut t = timeline("A:1=1,2=1\nB:1=1,2=1\n");
        assert!(t.find_splits().is_empty());
        assert_eq!(lines(&t), vec!["A:1=1,2=1"]);
    }

    #[test]
    fn split_targets_follow_deduplicated_survivor() {
        // B and C both branch off A into the same community and collapse.
        let mut t = timeline("A:1=1,2=1\nB:1=1,2=2\nC:1=1,2=2\n");
        let splits = t.find_splits();

        assert_eq!(lines(&t), vec!["A:1=1,2=1", "B:2=2"]);
        assert_eq!(
            splits.iter().cloned().collect::<Vec<_>>(),
            vec![split(("A", 1), ("B", 2)), split(("A", 1), ("B", 2))]
        );
    }

    #[test]
    fn merge_emits_merge_point_and_drops_shared_suffix() {
        let mut t = timeline("A:1=1,2=1\nB:1=2,2=1\n");
        let merges = t.find_merges();

        assert_eq!(merges.iter().cloned().collect::<Vec<_>>(), vec![merge(("B", 1), ("A", 2))]);
        assert_eq!(lines(&t), vec!["A:1=1,2=1", "B:1=2"]);
    }

    #[test]
    fn merge_after_longer_shared_suffix() {
        let mut t = timeline("A:1=1,2=1,3=1,4=1\nB:1=3,2=2,3=1,4=1\n");
        let merges = t.find_merges();

        assert_eq!(merges.iter().cloned().collect::<Vec<_>>(), vec![merge(("B", 2), ("A", 3))]);
        assert_eq!(lines(&t), vec!["A:1=1,2=1,3=1,4=1", "B:1=3,2=2"]);
    }

    #[test]
    fn deduplicate_is_transitive_and_idempotent() {
        let mut t = timeline("A:1=1\nB:1=1\nC:2=1\nD:1=1\nE:2=1\n");
        let duplicates = t.deduplicate();

        assert_eq!(
            duplicates,
            vec![
                Duplicate { survivor: "A".into(), removed: "B".into() },
                Duplicate { survivor: "A".into(), removed: "D".into() },
                Duplicate { survivor: "C".into(), removed: "E".into() },
            ]
        );
        assert_eq!(lines(&t), vec!["A:1=1", "C:2=1"]);
        assert!(t.deduplicate().is_empty());
    }

    #[test]
    fn births_and_deaths_per_community() {
        let t = timeline("A:1=1,3=1\nB:2=2,4=1,5=1\n");
        let births: Vec<_> = t.find_births().iter().cloned().collect();
        let deaths: Vec<_> = t.find_deaths().iter().cloned().collect();

        assert_eq!(
            births,
            vec![
                Event::Birth(Endpoint::new("A", 1)),
                Event::Birth(Endpoint::new("B", 2)),
            ]
        );
        assert_eq!(
            deaths,
            vec![
                Event::Death(Endpoint::new("A", 3)),
                Event::Death(Endpoint::new("B", 5)),
            ]
        );
    }

    #[test]
    fn intermittence_marks_first_missing_step() {
        let t = timeline("A:1=1,3=1\nB:1=2,2=2,6=2,8=1\n");
        let events: Vec<_> = t.find_intermittents().iter().cloned().collect();
        assert_eq!(
            events,
            vec![
                Event::Intermittence(Endpoint::new("A", 2)),
                Event::Intermittence(Endpoint::new("B", 3)),
                Event::Intermittence(Endpoint::new("B", 7)),
            ]
        );
    }

    fn sized(sizes: &[(u32, u32, usize)]) -> StepCommunities {
        let mut table = StepCommunities::new();
        for &(step, community, size) in sizes {
            table.insert(step, community, (0..size as u64).collect());
        }
        table
    }

    #[test]
    fn expansion_is_strictly_above_threshold() {
        let t = timeline("A:1=1,2=1,3=1\n");
        let table = sized(&[(1, 1, 10), (2, 1, 11), (3, 1, 14)]);

        let events: Vec<_> = t.find_expansions(&table, 0.10).unwrap().iter().cloned().collect();
        // 10 -> 11 is exactly 10%; 11 -> 14 is ~27%.
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Expansion { source, target, growth } => {
                assert_eq!(source, &Endpoint::new("A", 2));
                assert_eq!(target, &Endpoint::new("A", 3));
                assert!((growth - 3.0 / 11.0).abs() < 1e-12);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn expansion_of_twenty_percent() {
        let t = timeline("A:1=1,2=1\n");
        let table = sized(&[(1, 1, 10), (2, 1, 12)]);

        let events: Vec<_> = t.find_expansions(&table, 0.10).unwrap().iter().cloned().collect();
        assert_eq!(
            events,
            vec![Event::Expansion {
                source: Endpoint::new("A", 1),
                target: Endpoint::new("A", 2),
                growth: 0.2,
            }]
        );
        assert!(t.find_contractions(&table, 0.10).unwrap().is_empty());
    }

    #[test]
    fn contraction_measured_against_smaller_size() {
        let t = timeline("A:1=1,2=2,3=1\n");
        let table = sized(&[(1, 1, 12), (2, 2, 10), (3, 1, 10)]);

        let events: Vec<_> = t.find_contractions(&table, 0.10).unwrap().iter().cloned().collect();
        assert_eq!(
            events,
            vec![Event::Contraction {
                source: Endpoint::new("A", 1),
                target: Endpoint::new("A", 2),
                reduction: 0.2,
            }]
        );
        assert!(t.find_contractions(&table, 0.20).unwrap().is_empty());
        assert!(t.find_expansions(&table, 0.10).unwrap().is_empty());
    }

    #[test]
    fn missing_membership_is_an_error() {
        let t = timeline("A:1=1,2=3\n");
        let table = sized(&[(1, 1, 10), (2, 1, 10)]);
        assert!(matches!(
            t.find_expansions(&table, 0.10),
            Err(TimelineError::MissingMembership { step: 2, community: 3 })
        ));
    }

    #[test]
    fn single_step_communities_need_no_membership() {
        let t = timeline("A:4=4\n");
        let table = StepCommunities::new();
        assert!(t.find_expansions(&table, 0.10).unwrap().is_empty());
        assert!(t.find_contractions(&table, 0.10).unwrap().is_empty());
    }
}
