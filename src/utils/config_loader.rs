use crate::core::models::CanonicalPath;
use crate::core::options::{BundleOptions, ProcessOption};
use crate::utils::{Logger, NeuterError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "neuter.config.json";
pub const DEFAULT_OUTDIR: &str = "dist";

/// Configuration file format (neuter.config.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuterConfig {
    /// Entry modules, relative to the working directory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<String>,

    /// Directory canonical paths are taken relative to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,

    /// Text placed between modules (default: "\n")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_paths: Vec<String>,

    /// Template values, must be a JSON object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<Value>,

    /// Prepended to every require specifier before resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specifier_prefix: Option<String>,

    /// Extension for specifiers without one (default: "js")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Output directory (default: "dist")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdir: Option<String>,
}

/// Values given on the command line; each one beats the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub entries: Vec<String>,
    pub base_path: Option<String>,
    pub output_name: Option<String>,
    pub map_name: Option<String>,
    pub separator: Option<String>,
    pub skip_paths: Vec<String>,
    pub defines: Vec<(String, Value)>,
    pub specifier_prefix: Option<String>,
    pub extension: Option<String>,
    pub outdir: Option<String>,
}

/// Everything one `build` invocation needs
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Directory modules are read from
    pub root: PathBuf,
    pub entries: Vec<CanonicalPath>,
    pub outdir: PathBuf,
    pub options: BundleOptions,
}

/// Config loader that supports config files with CLI override
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `neuter.config.json` from `dir` if it exists
    pub fn load_from_file(dir: &Path) -> Result<Option<NeuterConfig>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            Logger::debug(&format!("No {} found, using defaults", CONFIG_FILE_NAME));
            return Ok(None);
        }

        Self::load(&config_path).map(Some)
    }

    /// Load an explicitly named config file; it must exist.
    pub fn load(config_path: &Path) -> Result<NeuterConfig> {
        Logger::debug(&format!("Loading config from {}", config_path.display()));

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            NeuterError::config(format!("Cannot read {}: {}", config_path.display(), e))
        })?;

        let config: NeuterConfig = serde_json::from_str(&content).map_err(|e| {
            NeuterError::config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;

        Ok(config)
    }

    /// Merge file config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(
        file_config: Option<NeuterConfig>,
        cwd: &Path,
        cli: CliOverrides,
    ) -> Result<BuildSettings> {
        let base = file_config.unwrap_or_default();

        let base_path = cli.base_path.or(base.base_path);
        let root = match &base_path {
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };

        let raw_entries = if cli.entries.is_empty() { base.entries } else { cli.entries };
        if raw_entries.is_empty() {
            return Err(NeuterError::config("No entry modules given"));
        }

        let entries = raw_entries.iter().map(|e| rebase(cwd, &root, e)).collect();

        let mut options = BundleOptions::default();
        if base_path.is_some() {
            options = options.with_base_path(&root);
        }
        options.output_name = cli.output_name.or(base.output_name);
        options.map_name = cli.map_name.or(base.map_name);
        if let Some(separator) = cli.separator.or(base.separator) {
            options = options.with_separator(separator);
        }
        if let Some(extension) = cli.extension.or(base.extension) {
            options = options.with_extension(extension);
        }
        for skip in base.skip_paths.iter().chain(&cli.skip_paths) {
            options.skip_paths.insert(rebase(cwd, &root, skip));
        }
        if let Some(prefix) = cli.specifier_prefix.or(base.specifier_prefix) {
            options = options.with_specifier_rewrite(move |raw: &str| format!("{}{}", prefix, raw));
        }
        if let Some(process) = merge_process(base.process, cli.defines)? {
            options = options.with_process(process);
        }

        options.validate()?;

        let outdir = cli
            .outdir
            .or(base.outdir)
            .unwrap_or_else(|| DEFAULT_OUTDIR.to_string());
        let outdir = if Path::new(&outdir).is_absolute() {
            PathBuf::from(outdir)
        } else {
            cwd.join(outdir)
        };

        Ok(BuildSettings {
            root,
            entries,
            outdir,
            options,
        })
    }

    /// Generate example config file
    pub fn generate_example() -> String {
        let example = NeuterConfig {
            entries: vec!["src/main.js".to_string()],
            base_path: Some("src".to_string()),
            output_name: Some("app.js".to_string()),
            map_name: Some("app.js.map".to_string()),
            skip_paths: vec!["src/vendor/jquery.js".to_string()],
            outdir: Some(DEFAULT_OUTDIR.to_string()),
            ..Default::default()
        };
        serde_json::to_string_pretty(&example).unwrap_or_default()
    }
}

/// Parse a `KEY=VALUE` definition; the value is JSON when it parses as JSON.
pub fn parse_define(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| NeuterError::config(format!("Expected KEY=VALUE, got {}", raw)))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(NeuterError::config(format!("Empty key in definition {}", raw)));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn merge_process(file: Option<Value>, defines: Vec<(String, Value)>) -> Result<Option<ProcessOption>> {
    let mut values = match file {
        Some(value) => match ProcessOption::from_value(value)? {
            ProcessOption::Values(map) => map,
            ProcessOption::Function(_) => Map::new(),
        },
        None if defines.is_empty() => return Ok(None),
        None => Map::new(),
    };

    for (key, value) in defines {
        values.insert(key, value);
    }
    Ok(Some(ProcessOption::Values(values)))
}

/// Express a path given relative to `cwd` as a canonical path under `root`.
fn rebase(cwd: &Path, root: &Path, raw: &str) -> CanonicalPath {
    let absolute = CanonicalPath::new(&cwd.join(raw).to_string_lossy());
    let root = CanonicalPath::new(&root.to_string_lossy());
    CanonicalPath::new(&absolute.relative_to(&root))
}
