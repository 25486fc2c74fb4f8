use std::collections::HashMap;
use std::path::PathBuf;

use crate::prelude::*;
use crate::run::helpers::expand_variables;

pub mod resolver;

pub use resolver::resolve;

/// The caller's view of the build: where patterns resolve from, where matches are staged,
/// and the variables artifact paths and run names may reference.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub staging_dir: PathBuf,
    pub env: HashMap<String, String>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging_dir: staging_dir.into(),
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn expand(&self, template: &str) -> String {
        expand_variables(template, &self.env)
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Expands `pattern` then resolves it to a staged local copy.
    pub fn resolve(&self, pattern: &str) -> Result<PathBuf> {
        let expanded = self.expand(pattern);
        if expanded != pattern {
            debug!("Expanded '{pattern}' to '{expanded}'");
        }
        resolve(&expanded, &self.root, &self.staging_dir)
    }
}
