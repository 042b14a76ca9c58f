use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::job::{JobOutcome, JobType};
use crate::subject::SubjectId;

/// Outcomes for a single subject, keyed by job-type.
pub type SubjectResults = IndexMap<JobType, JobOutcome>;

/// Merged outcomes of one or more batches, keyed by subject.
///
/// Merging is per job-type: a later outcome replaces an earlier one for the
/// same subject and job-type, everything else is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: IndexMap<SubjectId, SubjectResults>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one subject's outcomes into the set.
    pub fn insert(&mut self, id: SubjectId, results: SubjectResults) {
        let entry = self.entries.entry(id).or_default();
        for (jt, outcome) in results {
            entry.insert(jt, outcome);
        }
    }

    /// Fold another set into this one; `other` wins on overlapping job-types.
    pub fn merge(&mut self, other: ResultSet) {
        for (id, results) in other.entries {
            self.insert(id, results);
        }
    }

    /// Merge batches in order, later batches winning.
    pub fn merge_all(batches: impl IntoIterator<Item = ResultSet>) -> Self {
        let mut merged = ResultSet::new();
        for batch in batches {
            merged.merge(batch);
        }
        merged
    }

    pub fn get(&self, id: &SubjectId) -> Option<&SubjectResults> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectId, &SubjectResults)> {
        self.entries.iter()
    }

    /// Subjects from `expected` that have no entry at all.
    pub fn missing<'a>(&self, expected: impl IntoIterator<Item = &'a SubjectId>) -> Vec<SubjectId> {
        expected
            .into_iter()
            .filter(|id| !self.entries.contains_key(*id))
            .copied()
            .collect()
    }

    /// Subjects with at least one failed job-type.
    pub fn terminal_failures(&self) -> Vec<SubjectId> {
        self.entries
            .iter()
            .filter(|(_, results)| results.values().any(|o| !o.success))
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobError;
    use serde_json::json;

    fn results(list: &[(JobType, JobOutcome)]) -> SubjectResults {
        list.iter().cloned().collect()
    }

    #[test]
    fn later_outcome_wins_on_overlap() {
        let id = SubjectId::new();
        let mut first = ResultSet::new();
        first.insert(
            id,
            results(&[
                (JobType::Sp, JobOutcome::failed(JobError::ScfNotConverged)),
                (JobType::XtbRrho, JobOutcome::succeeded(json!(0.01))),
            ]),
        );
        let mut retry = ResultSet::new();
        retry.insert(id, results(&[(JobType::Sp, JobOutcome::succeeded(json!(-1.2)))]));

        let merged = ResultSet::merge_all([first, retry]);
        let entry = merged.get(&id).unwrap();
        assert!(entry[&JobType::Sp].success);
        assert_eq!(entry[&JobType::Sp].value, json!(-1.2));
        assert!(entry[&JobType::XtbRrho].success);
        assert!(merged.terminal_failures().is_empty());
    }

    #[test]
    fn merge_with_self_is_idempotent() {
        let mut set = ResultSet::new();
        set.insert(
            SubjectId::new(),
            results(&[(JobType::Sp, JobOutcome::succeeded(json!(1.0)))]),
        );
        set.insert(
            SubjectId::new(),
            results(&[(JobType::Gsolv, JobOutcome::failed(JobError::MissingOutcome))]),
        );

        let mut merged = set.clone();
        merged.merge(set.clone());
        assert_eq!(merged, set);
    }

    #[test]
    fn missing_reports_absent_subjects() {
        let present = SubjectId::new();
        let absent = SubjectId::new();
        let mut set = ResultSet::new();
        set.insert(present, SubjectResults::new());

        assert_eq!(set.missing([&present, &absent]), vec![absent]);
    }

    #[test]
    fn serializes_keyed_by_subject_and_job_type() {
        let id = SubjectId::new();
        let mut set = ResultSet::new();
        set.insert(id, results(&[(JobType::Sp, JobOutcome::succeeded(json!(2.0)))]));

        let value: serde_json::Value = serde_json::to_value(&set).unwrap();
        assert_eq!(value[id.to_string()]["sp"]["success"], json!(true));
        assert_eq!(value[id.to_string()]["sp"]["value"], json!(2.0));
    }
}
