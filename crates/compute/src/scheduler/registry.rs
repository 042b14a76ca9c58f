use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use qmpar_core::{ConfigError, ParallelConfig};

use super::runners::CommandRunner;
use super::task::Runner;

/// Runners available for execution, keyed by program name.
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn Runner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self {
            runners: HashMap::new(),
        }
    }

    /// Build a registry with a [`CommandRunner`] for every configured program.
    /// Programs run below `workdir`.
    pub fn from_config(config: &ParallelConfig, workdir: &Path) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, program) in &config.programs {
            registry.register(CommandRunner::new(name, program.clone(), workdir))?;
        }
        Ok(registry)
    }

    /// Register a runner. Returns error if its program is already registered.
    pub fn register(&mut self, runner: impl Runner + 'static) -> Result<(), ConfigError> {
        self.register_arc(Arc::new(runner))
    }

    pub fn register_arc(&mut self, runner: Arc<dyn Runner>) -> Result<(), ConfigError> {
        let name = runner.program().to_string();
        if self.runners.contains_key(&name) {
            return Err(ConfigError::DuplicateProgram(name));
        }
        self.runners.insert(name, runner);
        Ok(())
    }

    pub fn get(&self, program: &str) -> Option<Arc<dyn Runner>> {
        self.runners.get(program).cloned()
    }

    /// Look up a runner, failing with [`ConfigError::UnknownProgram`].
    pub fn resolve(&self, program: &str) -> Result<Arc<dyn Runner>, ConfigError> {
        self.get(program)
            .ok_or_else(|| ConfigError::UnknownProgram(program.to_string()))
    }

    pub fn programs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.runners.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
