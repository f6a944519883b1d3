use crate::core::models::*;
use crate::utils::{BoxError, Result};
use async_trait::async_trait;

/// Supplies raw module buffers to a bundle run
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// `Ok(None)` means there is no such module; `Err` means it exists but
    /// could not be acquired.
    async fn read_source(&self, path: &CanonicalPath) -> Result<Option<SourceFile>>;

    /// All module paths matching a glob pattern, in any order.
    async fn expand_glob(&self, pattern: &CanonicalPath) -> Result<Vec<CanonicalPath>>;
}

/// Bundle service interface
#[async_trait]
pub trait BundleService: Send + Sync {
    async fn bundle(&self, entry: &CanonicalPath) -> Result<BundleOutput>;
}

/// Rewrites a raw specifier before it is resolved.
pub trait SpecifierRewrite: Send + Sync {
    fn rewrite(&self, specifier: &str) -> String;
}

impl<F> SpecifierRewrite for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn rewrite(&self, specifier: &str) -> String {
        self(specifier)
    }
}

/// Replaces a module's content before it is concatenated.
pub trait ContentProcessor: Send + Sync {
    fn process(&self, path: &CanonicalPath, content: &str) -> std::result::Result<String, BoxError>;
}

impl<F> ContentProcessor for F
where
    F: Fn(&CanonicalPath, &str) -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn process(&self, path: &CanonicalPath, content: &str) -> std::result::Result<String, BoxError> {
        self(path, content)
    }
}
