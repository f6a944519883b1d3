use crate::core::{interfaces::SourceProvider, models::*};
use crate::utils::{NeuterError, Result};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeMap;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Module buffers handed over by the caller, keyed by canonical path.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceProvider {
    files: BTreeMap<CanonicalPath, SourceFile>,
}

impl MemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files<'a, I>(files: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut provider = Self::new();
        for (path, contents) in files {
            provider.insert(path, contents);
        }
        provider
    }

    pub fn insert(&mut self, path: &str, contents: impl Into<String>) {
        let path = CanonicalPath::new(path);
        self.files.insert(path.clone(), SourceFile::new(path, contents));
    }

    pub fn insert_file(&mut self, file: SourceFile) {
        self.files.insert(file.path.clone(), file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait::async_trait]
impl SourceProvider for MemorySourceProvider {
    async fn read_source(&self, path: &CanonicalPath) -> Result<Option<SourceFile>> {
        Ok(self.files.get(path).cloned())
    }

    async fn expand_glob(&self, pattern: &CanonicalPath) -> Result<Vec<CanonicalPath>> {
        let pattern = Pattern::new(pattern.as_str())
            .map_err(|e| NeuterError::config(format!("Invalid glob {}: {}", pattern, e)))?;

        Ok(self
            .files
            .keys()
            .filter(|path| pattern.matches_with(path.as_str(), MATCH_OPTIONS))
            .cloned()
            .collect())
    }
}
