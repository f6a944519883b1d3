use crate::core::{interfaces::*, models::*, services::*, ScanCache};
use crate::infrastructure::TokioFileSystemService;
use crate::utils::config_loader::{parse_define, BuildSettings, CliOverrides, ConfigLoader};
use crate::utils::{Logger, Result, Timer};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "neuter")]
#[command(about = "Neuter - bundle a require() tree into one file in load order")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bundle one or more entry modules
    Build {
        /// Entry modules, relative to the working directory
        entries: Vec<String>,
        /// Directory canonical paths and bare specifiers resolve from
        #[arg(short, long)]
        base_path: Option<String>,
        /// Output file name (defaults to the entry's file name)
        #[arg(short = 'o', long = "output")]
        output: Option<String>,
        /// Source map file name; requires --output
        #[arg(short, long)]
        map: Option<String>,
        /// Text placed between modules
        #[arg(long)]
        separator: Option<String>,
        /// Modules that resolve but are left out of the bundle
        #[arg(long = "skip")]
        skip: Vec<String>,
        /// Template value, KEY=VALUE (VALUE is parsed as JSON when possible)
        #[arg(short = 'D', long = "define")]
        define: Vec<String>,
        /// Prepended to every require specifier
        #[arg(long)]
        specifier_prefix: Option<String>,
        /// Extension for specifiers that name none
        #[arg(long)]
        extension: Option<String>,
        /// Output directory
        #[arg(long)]
        outdir: Option<String>,
        /// Config file (defaults to ./neuter.config.json when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show bundler information
    Info,
}

pub struct CliHandler;

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        // Initialize logging
        Logger::init();

        let cli = Cli::parse();

        match cli.command {
            Commands::Build {
                entries,
                base_path,
                output,
                map,
                separator,
                skip,
                define,
                specifier_prefix,
                extension,
                outdir,
                config,
            } => {
                let defines = define
                    .iter()
                    .map(|d| parse_define(d))
                    .collect::<Result<Vec<_>>>()?;

                let overrides = CliOverrides {
                    entries,
                    base_path,
                    output_name: output,
                    map_name: map,
                    separator,
                    skip_paths: skip,
                    defines,
                    specifier_prefix,
                    extension,
                    outdir,
                };

                let cwd = std::env::current_dir()?;
                self.handle_build_command(&cwd, config.as_deref(), overrides)
                    .await
                    .map(|_| ())
            }
            Commands::Info => self.handle_info_command().await,
        }
    }

    pub async fn handle_build_command(
        &self,
        cwd: &Path,
        config_path: Option<&Path>,
        overrides: CliOverrides,
    ) -> Result<Vec<BundleOutput>> {
        let file_config = match config_path {
            Some(path) => Some(ConfigLoader::load(&cwd.join(path))?),
            None => ConfigLoader::load_from_file(cwd)?,
        };
        let settings = ConfigLoader::merge_with_cli(file_config, cwd, overrides)?;

        build(settings).await
    }

    async fn handle_info_command(&self) -> Result<()> {
        tracing::info!("🦀 Neuter v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("══════════════════════════════════════");
        tracing::info!("📦 Static require() bundler");
        tracing::info!("");
        tracing::info!("🏗️  Pipeline:");
        tracing::info!("  • Lexical scan for require('...') declarations");
        tracing::info!("  • Breadth-first discovery, concurrent reads");
        tracing::info!("  • Post-order inclusion with explicit cycle breaking");
        tracing::info!("  • Template values via <%= name %> placeholders");
        tracing::info!("  • Composite source map through existing input maps");
        tracing::info!("");
        tracing::info!("⚙️  Config file: {}", crate::utils::config_loader::CONFIG_FILE_NAME);
        tracing::info!("{}", ConfigLoader::generate_example());
        Ok(())
    }
}

/// Run every entry and write its artifacts under the output directory.
pub async fn build(settings: BuildSettings) -> Result<Vec<BundleOutput>> {
    let _timer = Timer::start("Build");

    let fs_service = TokioFileSystemService::new(&settings.root);
    let service = NeuterBuildService::new(Arc::new(fs_service.clone()), settings.options)
        .with_scan_cache(Arc::new(ScanCache::new()));

    let outputs = match settings.entries.as_slice() {
        [entry] => vec![service.bundle(entry).await?],
        entries => service.bundle_entries(entries).await?,
    };

    for output in &outputs {
        for artifact in output.artifacts() {
            let path = settings.outdir.join(artifact.path.as_str());
            fs_service.write_file(&path, &artifact.content).await?;
            Logger::artifact_written(&path.display().to_string(), artifact.size);
        }
    }

    Ok(outputs)
}
