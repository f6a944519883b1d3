use crate::core::interfaces::{ContentProcessor, SpecifierRewrite};
use crate::core::models::CanonicalPath;
use crate::utils::{NeuterError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_SEPARATOR: &str = "\n";
pub const DEFAULT_EXTENSION: &str = "js";

/// Per-module content processing
#[derive(Clone)]
pub enum ProcessOption {
    /// Values interpolated into `<%= name %>` placeholders
    Values(Map<String, Value>),
    /// Arbitrary rewrite of (path, content)
    Function(Arc<dyn ContentProcessor>),
}

impl ProcessOption {
    /// Build from a configuration value, which must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(ProcessOption::Values(map)),
            other => Err(NeuterError::config(format!(
                "process must be an object of template values, got {}",
                other
            ))),
        }
    }

    pub fn function<F>(f: F) -> Self
    where
        F: ContentProcessor + 'static,
    {
        ProcessOption::Function(Arc::new(f))
    }
}

impl fmt::Debug for ProcessOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessOption::Values(map) => f.debug_tuple("Values").field(map).finish(),
            ProcessOption::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Configuration of one bundle run
#[derive(Clone)]
pub struct BundleOptions {
    pub output_name: Option<String>,
    pub map_name: Option<String>,
    /// When set, non-relative specifiers resolve from the base instead of the
    /// requiring module's directory.
    pub base_path: Option<PathBuf>,
    pub separator: String,
    pub skip_paths: BTreeSet<CanonicalPath>,
    pub specifier_rewrite: Option<Arc<dyn SpecifierRewrite>>,
    pub process: Option<ProcessOption>,
    /// Appended to specifiers that name no extension
    pub extension: String,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            output_name: None,
            map_name: None,
            base_path: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            skip_paths: BTreeSet::new(),
            specifier_rewrite: None,
            process: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl fmt::Debug for BundleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleOptions")
            .field("output_name", &self.output_name)
            .field("map_name", &self.map_name)
            .field("base_path", &self.base_path)
            .field("separator", &self.separator)
            .field("skip_paths", &self.skip_paths)
            .field("specifier_rewrite", &self.specifier_rewrite.as_ref().map(|_| ".."))
            .field("process", &self.process)
            .field("extension", &self.extension)
            .finish()
    }
}

impl BundleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, output_name: impl Into<String>, map_name: Option<String>) -> Self {
        self.output_name = Some(output_name.into());
        self.map_name = map_name;
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_skip_path(mut self, path: &str) -> Self {
        self.skip_paths.insert(CanonicalPath::new(path));
        self
    }

    pub fn with_specifier_rewrite<R>(mut self, rewrite: R) -> Self
    where
        R: SpecifierRewrite + 'static,
    {
        self.specifier_rewrite = Some(Arc::new(rewrite));
        self
    }

    pub fn with_process(mut self, process: ProcessOption) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn wants_map(&self) -> bool {
        self.map_name.is_some()
    }

    pub fn is_skipped(&self, path: &CanonicalPath) -> bool {
        self.skip_paths.contains(path)
    }

    /// Reject incomplete or malformed configuration before any traversal.
    pub fn validate(&self) -> Result<()> {
        match (&self.output_name, &self.map_name) {
            (None, Some(_)) => return Err(NeuterError::config("Missing outputName parameter")),
            (Some(_), None) => return Err(NeuterError::config("Missing mapName parameter")),
            _ => {}
        }

        for (label, name) in [("outputName", &self.output_name), ("mapName", &self.map_name)] {
            if let Some(name) = name {
                if name.trim().is_empty() {
                    return Err(NeuterError::config(format!("{} must not be empty", label)));
                }
                if name.starts_with('/') || name.starts_with('\\') {
                    return Err(NeuterError::config(format!(
                        "{} must be relative to the base path, got {}",
                        label, name
                    )));
                }
            }
        }

        if let (Some(output), Some(map)) = (&self.output_name, &self.map_name) {
            if CanonicalPath::new(output) == CanonicalPath::new(map) {
                return Err(NeuterError::config("outputName and mapName must differ"));
            }
        }

        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(NeuterError::config(format!(
                "extension must be non-empty and without a leading dot, got {:?}",
                self.extension
            )));
        }

        Ok(())
    }
}
