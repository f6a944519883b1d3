use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized, base-relative module identity.
///
/// Separators are `/`, `.` segments are dropped and `..` segments collapse
/// lexically, so every spelling of one file maps to one value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    pub fn new(raw: &str) -> Self {
        let unified = raw.replace('\\', "/");
        let unified = if cfg!(windows) {
            unified.to_lowercase()
        } else {
            unified
        };

        let absolute = unified.starts_with('/');
        let mut segments: Vec<&str> = Vec::new();

        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(last) if *last != ".." => {
                        segments.pop();
                    }
                    // Nothing above the filesystem root
                    _ if absolute => {}
                    _ => segments.push(".."),
                },
                other => segments.push(other),
            }
        }

        let joined = segments.join("/");
        if absolute {
            Self(format!("/{}", joined))
        } else {
            Self(joined)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Directory containing this path; the root directory is the empty path.
    pub fn dir(&self) -> CanonicalPath {
        match self.0.rfind('/') {
            Some(0) => Self("/".to_string()),
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self(String::new()),
        }
    }

    pub fn join(&self, relative: &str) -> CanonicalPath {
        let relative = relative.replace('\\', "/");
        if relative.starts_with('/') || self.0.is_empty() {
            Self::new(&relative)
        } else {
            Self::new(&format!("{}/{}", self.0, relative))
        }
    }

    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Whether the last segment carries an extension (`a.js`, not `.hidden`).
    pub fn has_extension(&self) -> bool {
        let name = self.file_name();
        matches!(name.rfind('.'), Some(idx) if idx > 0 && idx + 1 < name.len())
    }

    /// Path of `self` as seen from the directory `from_dir`.
    pub fn relative_to(&self, from_dir: &CanonicalPath) -> String {
        let target: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        let base: Vec<&str> = from_dir.0.split('/').filter(|s| !s.is_empty()).collect();

        let common = target
            .iter()
            .zip(base.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = Vec::new();
        parts.extend(std::iter::repeat("..").take(base.len() - common));
        parts.extend(&target[common..]);

        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        }
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Half-open byte range into a module's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One raw module buffer as supplied by a source provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: CanonicalPath,
    pub contents: String,
    /// Position map left by an earlier transformation of this file
    pub input_map: Option<String>,
}

impl SourceFile {
    pub fn new(path: CanonicalPath, contents: impl Into<String>) -> Self {
        Self {
            path,
            contents: contents.into(),
            input_map: None,
        }
    }

    pub fn with_input_map(mut self, map: impl Into<String>) -> Self {
        self.input_map = Some(map.into());
        self
    }
}

/// How a dependency declaration was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Target modules in declaration order (several for a glob).
    Modules(Vec<CanonicalPath>),
    /// No such module: a runtime reference, left in the output verbatim.
    External,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Modules(_))
    }

    pub fn targets(&self) -> &[CanonicalPath] {
        match self {
            Resolution::Modules(targets) => targets,
            Resolution::External => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReference {
    pub specifier: String,
    /// The `require(...)` call expression
    pub call: Span,
    /// Text removed from the output when the reference resolves
    pub excision: Span,
    pub line: usize,
    pub column: usize,
    pub resolution: Resolution,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub path: CanonicalPath,
    pub source: String,
    pub input_map: Option<String>,
    pub references: Vec<DependencyReference>,
}

impl Module {
    /// Resolution recorded for a raw specifier, if this module declared it.
    pub fn resolution_for(&self, specifier: &str) -> Option<&Resolution> {
        self.references
            .iter()
            .find(|r| r.specifier == specifier)
            .map(|r| &r.resolution)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: CanonicalPath,
    pub content: String,
    pub size: usize,
}

impl OutputFile {
    pub fn new(path: CanonicalPath, content: String) -> Self {
        let size = content.len();
        Self { path, content, size }
    }
}

/// Result of one bundle run
#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub entry: CanonicalPath,
    pub inclusion_order: Vec<CanonicalPath>,
    /// Edges not followed because they re-entered a module in progress
    pub cycle_breaks: Vec<(CanonicalPath, CanonicalPath)>,
    pub code: OutputFile,
    pub map: Option<OutputFile>,
}

impl BundleOutput {
    /// Every artifact of the run, primary first.
    pub fn artifacts(&self) -> impl Iterator<Item = &OutputFile> {
        std::iter::once(&self.code).chain(self.map.iter())
    }
}
