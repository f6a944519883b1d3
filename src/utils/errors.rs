use crate::core::models::CanonicalPath;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by injected hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Enhanced error with file location context
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub code_snippet: Option<String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            file_path: None,
            line: None,
            column: None,
            code_snippet: None,
        }
    }

    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_snippet(mut self, snippet: String) -> Self {
        self.code_snippet = Some(snippet);
        self
    }
}

#[derive(Error, Debug)]
pub enum NeuterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entry module not found: {0}")]
    MissingEntry(CanonicalPath),

    #[error(
        "Cannot load '{specifier}' required by {requirer} at line {line}, column {column}: {reason}"
    )]
    UnresolvedRequiredFile {
        requirer: CanonicalPath,
        specifier: String,
        line: usize,
        column: usize,
        reason: String,
        snippet: Option<String>,
    },

    #[error("{source}")]
    Processing {
        path: CanonicalPath,
        #[source]
        source: BoxError,
    },

    #[error("Source map error in {path}: {message}")]
    SourceMap { path: CanonicalPath, message: String },
}

impl NeuterError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn processing(path: CanonicalPath, source: BoxError) -> Self {
        Self::Processing { path, source }
    }

    pub fn source_map(path: CanonicalPath, message: impl Into<String>) -> Self {
        Self::SourceMap {
            path,
            message: message.into(),
        }
    }

    /// The hook failure exactly as the hook raised it.
    pub fn processing_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            NeuterError::Processing { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Location context, when the error points into a module
    pub fn context(&self) -> Option<ErrorContext> {
        match self {
            NeuterError::UnresolvedRequiredFile {
                requirer,
                line,
                column,
                snippet,
                ..
            } => {
                let mut ctx = ErrorContext::new()
                    .with_file(PathBuf::from(requirer.as_str()))
                    .with_location(*line, *column);
                if let Some(snippet) = snippet {
                    ctx = ctx.with_snippet(snippet.clone());
                }
                Some(ctx)
            }
            NeuterError::Processing { path, .. } | NeuterError::SourceMap { path, .. } => {
                Some(ErrorContext::new().with_file(PathBuf::from(path.as_str())))
            }
            _ => None,
        }
    }

    /// Format error with enhanced context display
    pub fn format_detailed(&self) -> String {
        match self {
            NeuterError::UnresolvedRequiredFile { .. } => {
                self.format_error_with_context("Unresolved Require", &self.context())
            }
            NeuterError::Processing { .. } => {
                self.format_error_with_context("Processing Error", &self.context())
            }
            _ => format!("❌ Error: {}", self),
        }
    }

    fn format_error_with_context(&self, error_type: &str, context: &Option<ErrorContext>) -> String {
        let mut output = format!("❌ {}: {}", error_type, self);

        if let Some(ctx) = context {
            if let Some(ref file_path) = ctx.file_path {
                output.push_str(&format!("\n📁 File: {}", file_path.display()));
            }

            if let (Some(line), Some(column)) = (ctx.line, ctx.column) {
                output.push_str(&format!("\n📍 Location: line {}, column {}", line, column));
            }

            if let Some(ref snippet) = ctx.code_snippet {
                output.push_str(&format!("\n📝 Code:\n{}", format_code_snippet(snippet, ctx.line)));
            }
        }

        output
    }
}

/// The snippet is the single offending line; `error_line` labels it.
fn format_code_snippet(snippet: &str, error_line: Option<usize>) -> String {
    let mut output = String::new();
    let first = error_line.unwrap_or(1);

    for (i, line) in snippet.lines().enumerate() {
        let line_num = first + i;
        if i == 0 {
            output.push_str(&format!("→ {:3} │ {}\n", line_num, line));
            output.push_str(&format!("     │ {}\n", "^".repeat(line.trim_end().len().clamp(1, 60))));
        } else {
            output.push_str(&format!("  {:3} │ {}\n", line_num, line));
        }
    }

    output
}

pub type Result<T> = std::result::Result<T, NeuterError>;

impl From<serde_json::Error> for NeuterError {
    fn from(err: serde_json::Error) -> Self {
        NeuterError::config(format!("Invalid JSON: {}", err))
    }
}
