//! Step-community membership: who belongs to each step-local community.
//!
//! Step files (`*.comm`) hold one step-local community per line as
//! space-separated member ids. Files sorted by name give time steps 1, 2, ...
//! and lines within a file give community ids 1, 2, ...

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::community::Step;
use crate::error::{Result, TimelineError};
use crate::records::read_records;

/// File extension of step community files.
pub const STEP_FILE_EXTENSION: &str = "comm";

/// Members of one time step, keyed by step-local community id.
pub type StepMembers = BTreeMap<u32, Vec<u64>>;

/// Mapping from time step to its step-local communities and their members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepCommunities {
    steps: BTreeMap<u32, StepMembers>,
}

impl StepCommunities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, step: u32, community: u32, members: Vec<u64>) {
        self.steps.entry(step).or_default().insert(community, members);
    }

    pub fn members(&self, step: u32, community: u32) -> Option<&[u64]> {
        self.steps
            .get(&step)
            .and_then(|communities| communities.get(&community))
            .map(Vec::as_slice)
    }

    /// Number of members of the step community a timeline [`Step`] points at.
    ///
    /// Fails when the table has no such community, or when it is empty.
    pub fn size(&self, step: Step) -> Result<usize> {
        let members = self.members(step.number, step.community).ok_or(
            TimelineError::MissingMembership {
                step: step.number,
                community: step.community,
            },
        )?;
        if members.is_empty() {
            return Err(TimelineError::EmptyMembership {
                step: step.number,
                community: step.community,
            });
        }
        Ok(members.len())
    }

    /// Number of time steps in the table.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Read the step-local communities of one step file.
    ///
    /// `path` is only used in error messages.
    pub fn read_step<R: Read>(reader: R, path: &Path) -> Result<StepMembers> {
        let malformed = |line: u64, token: &str| TimelineError::MalformedMembership {
            path: path.to_path_buf(),
            line,
            token: token.to_string(),
        };

        let mut communities = StepMembers::new();
        for (index, (line, record)) in read_records(reader, b' ')?.into_iter().enumerate() {
            // A blank line would shift every later community id.
            let expected_line = index as u64 + 1;
            if line != expected_line {
                return Err(malformed(expected_line, ""));
            }

            let members = record
                .iter()
                .filter(|field| !field.is_empty())
                .map(|field| field.parse::<u64>().map_err(|_| malformed(line, field)))
                .collect::<Result<Vec<_>>>()?;
            if members.is_empty() {
                return Err(malformed(line, ""));
            }

            communities.insert(index as u32 + 1, members);
        }
        Ok(communities)
    }

    /// Load every `*.comm` file in `dir`, one time step per file.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == STEP_FILE_EXTENSION)
            })
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        // Parallel parsing of step files
        let steps: BTreeMap<u32, StepMembers> = files
            .par_iter()
            .enumerate()
            .map(|(index, path)| -> Result<(u32, StepMembers)> {
                let communities = Self::read_step(File::open(path)?, path)?;
                debug!(
                    step = index + 1,
                    file = %path.display(),
                    communities = communities.len(),
                    "read step file"
                );
                Ok((index as u32 + 1, communities))
            })
            .collect::<Result<_>>()?;

        info!(dir = %dir.display(), steps = steps.len(), "loaded step communities");
        Ok(Self { steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Result<StepMembers> {
        StepCommunities::read_step(text.as_bytes(), Path::new("t.comm"))
    }

    #[test]
    fn lines_are_one_based_communities() {
        let step = read("1 2 3\n4 5\n6\n").unwrap();
        assert_eq!(step.len(), 3);
        assert_eq!(step[&1], vec![1, 2, 3]);
        assert_eq!(step[&2], vec![4, 5]);
        assert_eq!(step[&3], vec![6]);
    }

    #[test]
    fn tolerates_missing_final_newline_and_crlf() {
        let step = read("1 2\r\n3").unwrap();
        assert_eq!(step[&1], vec![1, 2]);
        assert_eq!(step[&2], vec![3]);
    }

    #[test]
    fn rejects_blank_line_between_communities() {
        let err = read("1 2\n\n3\n").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedMembership { line: 2, .. }));
    }

    #[test]
    fn rejects_blank_line_in_crlf_file() {
        let err = read("1 2\r\n3\r\n\r\n4\r\n").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedMembership { line: 3, .. }));
    }

    #[test]
    fn rejects_whitespace_only_line() {
        let err = read("1 2\n   \n3\n").unwrap_err();
        assert!(matches!(err, TimelineError::MalformedMembership { line: 2, .. }));
    }

    #[test]
    fn rejects_non_numeric_member() {
        let err = read("1 2\n3 bob\n").unwrap_err();
        assert!(
            matches!(err, TimelineError::MalformedMembership { line: 2, ref token, .. } if token == "bob")
        );
    }

    #[test]
    fn size_lookup_errors() {
        let mut table = StepCommunities::new();
        table.insert(1, 1, vec![10, 11]);
        table.insert(1, 2, vec![]);

        assert_eq!(table.size(Step::new(1, 1)).unwrap(), 2);
        assert!(matches!(
            table.size(Step::new(1, 2)),
            Err(TimelineError::EmptyMembership { step: 1, community: 2 })
        ));
        assert!(matches!(
            table.size(Step::new(2, 1)),
            Err(TimelineError::MissingMembership { step: 2, community: 1 })
        ));
    }
}
