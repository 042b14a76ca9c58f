use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a subject (e.g. a conformer), assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(Uuid);

impl SubjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One member of the ensemble that jobs are built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    /// Guess artifacts produced for this subject, oldest first.
    #[serde(default)]
    pub guess_files: Vec<PathBuf>,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SubjectId::new(),
            name: name.into(),
            guess_files: Vec::new(),
        }
    }

    /// Most recently produced guess artifact, if any.
    pub fn latest_guess(&self) -> Option<&PathBuf> {
        self.guess_files.last()
    }
}
