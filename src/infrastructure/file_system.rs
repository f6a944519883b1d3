use crate::core::{interfaces::SourceProvider, models::*};
use crate::utils::{NeuterError, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Reads modules from disk, with canonical paths taken relative to `root`.
///
/// A sibling `<module>.map` file is attached as the module's input map.
#[derive(Debug, Clone)]
pub struct TokioFileSystemService {
    root: PathBuf,
}

impl TokioFileSystemService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn full_path(&self, path: &CanonicalPath) -> PathBuf {
        self.root.join(path.as_str())
    }

    pub async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            self.create_directory(parent).await?;
        }

        fs::write(path, content).await.map_err(NeuterError::Io)
    }

    pub async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(NeuterError::Io)
    }
}

/// `Ok(None)` when the file is absent or is not a regular file.
async fn read_if_file(path: &Path) -> Result<Option<String>> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(NeuterError::Io(e)),
    }

    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(NeuterError::Io(e)),
    }
}

/// Drop `<module>.map` matches whose module matched too; `read_source`
/// already attaches them as input maps.
fn without_input_maps(matched: Vec<CanonicalPath>) -> Vec<CanonicalPath> {
    let modules: HashSet<&str> = matched.iter().map(|p| p.as_str()).collect();
    let keep: Vec<bool> = matched
        .iter()
        .map(|p| {
            p.as_str()
                .strip_suffix(".map")
                .map_or(true, |module| !modules.contains(module))
        })
        .collect();

    matched
        .into_iter()
        .zip(keep)
        .filter_map(|(path, keep)| keep.then_some(path))
        .collect()
}

#[async_trait::async_trait]
impl SourceProvider for TokioFileSystemService {
    async fn read_source(&self, path: &CanonicalPath) -> Result<Option<SourceFile>> {
        let full = self.full_path(path);
        let Some(contents) = read_if_file(&full).await? else {
            return Ok(None);
        };

        let mut map_path = full.into_os_string();
        map_path.push(".map");

        let mut file = SourceFile::new(path.clone(), contents);
        if let Some(map) = read_if_file(Path::new(&map_path)).await? {
            file = file.with_input_map(map);
        }
        Ok(Some(file))
    }

    async fn expand_glob(&self, pattern: &CanonicalPath) -> Result<Vec<CanonicalPath>> {
        let root = self.root.clone();
        let full_pattern = if root.as_os_str().is_empty() {
            pattern.to_string()
        } else {
            format!(
                "{}/{}",
                glob::Pattern::escape(&root.to_string_lossy()),
                pattern.as_str().trim_start_matches('/')
            )
        };

        tokio::task::spawn_blocking(move || {
            let entries = glob::glob(&full_pattern)
                .map_err(|e| NeuterError::config(format!("Invalid glob {}: {}", full_pattern, e)))?;

            let mut matched = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| NeuterError::Io(e.into()))?;
                if !path.is_file() {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&root) {
                    matched.push(CanonicalPath::new(&relative.to_string_lossy()));
                }
            }
            Ok(without_input_maps(matched))
        })
        .await
        .map_err(|e| NeuterError::Io(std::io::Error::new(ErrorKind::Other, e)))?
    }
}
