use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use qmpar_core::{ResultSet, Subject};

/// Render results keyed by subject name, each entry carrying the subject id
/// and its per-job-type outcomes. Subjects without results are omitted.
pub fn by_subject_name(subjects: &[Subject], results: &ResultSet) -> Result<Value> {
    let mut entries = Map::new();
    for subject in subjects {
        let Some(outcomes) = results.get(&subject.id) else {
            continue;
        };
        let outcomes = serde_json::to_value(outcomes)
            .with_context(|| format!("failed to serialize results for {}", subject.name))?;
        entries.insert(
            subject.name.clone(),
            json!({ "id": subject.id, "results": outcomes }),
        );
    }
    Ok(Value::Object(entries))
}

pub fn to_pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize results")
}
