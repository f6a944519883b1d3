use crate::core::cache::ScanCache;
use crate::core::concat::{Concatenator, ModuleText};
use crate::core::graph::{inclusion_order, GraphBuilder, ModuleGraph};
use crate::core::interfaces::*;
use crate::core::models::*;
use crate::core::options::BundleOptions;
use crate::core::scanner;
use crate::core::source_map::SourceMapMerger;
use crate::core::template::process_module;
use crate::utils::{Logger, NeuterError, Result, Timer};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Main build service implementation
///
/// Every call to [`BundleService::bundle`] is an isolated run: it builds its
/// own graph and visitation state, so runs may proceed concurrently against
/// one service. Only the scan cache is shared.
pub struct NeuterBuildService {
    provider: Arc<dyn SourceProvider>,
    options: BundleOptions,
    scan_cache: Option<Arc<ScanCache>>,
}

impl NeuterBuildService {
    pub fn new(provider: Arc<dyn SourceProvider>, options: BundleOptions) -> Self {
        Self {
            provider,
            options,
            scan_cache: None,
        }
    }

    pub fn with_scan_cache(mut self, cache: Arc<ScanCache>) -> Self {
        self.scan_cache = Some(cache);
        self
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    /// Bundle several entries concurrently, failing on the first error.
    pub async fn bundle_entries(&self, entries: &[CanonicalPath]) -> Result<Vec<BundleOutput>> {
        if entries.len() > 1 && self.options.output_name.is_some() {
            return Err(NeuterError::config(
                "outputName cannot be shared by several entries; leave it unset to name each output after its entry",
            ));
        }

        try_join_all(entries.iter().map(|entry| self.bundle(entry))).await
    }

    async fn build_graph(&self, entry: &CanonicalPath) -> Result<ModuleGraph> {
        let _timer = Timer::start("Module discovery");
        let builder = GraphBuilder::new(self.provider.as_ref(), &self.options);
        match &self.scan_cache {
            Some(cache) => builder.with_cache(cache).build(entry).await,
            None => builder.build(entry).await,
        }
    }

    /// Final text of one module and the ranges its resolved requires occupy.
    fn module_text(&self, module: &Module) -> Result<ModuleText> {
        let resolved = |r: &DependencyReference| r.resolution.is_resolved().then_some(r.excision);

        let Some(process) = &self.options.process else {
            return Ok(ModuleText {
                path: module.path.clone(),
                text: module.source.clone(),
                excisions: module.references.iter().filter_map(resolved).collect(),
                input_map: module.input_map.clone(),
            });
        };

        let processed = process_module(process, &module.path, &module.source)?;
        if processed == module.source {
            return Ok(ModuleText {
                path: module.path.clone(),
                text: processed,
                excisions: module.references.iter().filter_map(resolved).collect(),
                input_map: module.input_map.clone(),
            });
        }

        // Offsets moved: find the requires again and keep only known resolutions
        let excisions = scanner::scan(&processed)
            .into_iter()
            .filter(|c| {
                module
                    .resolution_for(&c.specifier)
                    .is_some_and(Resolution::is_resolved)
            })
            .map(|c| c.excision)
            .collect();

        Ok(ModuleText {
            path: module.path.clone(),
            text: processed,
            excisions,
            input_map: None,
        })
    }
}

#[async_trait]
impl BundleService for NeuterBuildService {
    async fn bundle(&self, entry: &CanonicalPath) -> Result<BundleOutput> {
        self.options.validate()?;

        let timer = Timer::start(&format!("Bundle {}", entry));
        Logger::bundle_start(entry.as_str());

        let graph = self.build_graph(entry).await?;
        let order = inclusion_order(&graph, &self.options);

        let pieces = order
            .order
            .iter()
            .filter_map(|path| graph.get(path))
            .map(|module| self.module_text(module))
            .collect::<Result<Vec<_>>>()?;

        let concatenation = Concatenator::new(&self.options.separator).concat(pieces);

        let output_path = CanonicalPath::new(
            self.options
                .output_name
                .as_deref()
                .unwrap_or_else(|| entry.file_name()),
        );

        let (code, map) = match &self.options.map_name {
            Some(map_name) => {
                let map_path = CanonicalPath::new(map_name);
                let merger = SourceMapMerger::new(&output_path);
                let map = merger.merge(&concatenation)?;
                let json = merger.to_json(&map)?;
                let code = format!("{}{}", concatenation.code, merger.directive(&map_path));
                (code, Some(OutputFile::new(map_path, json)))
            }
            None => (concatenation.code, None),
        };

        let code = OutputFile::new(output_path, code);
        Logger::bundle_complete(
            entry.as_str(),
            order.order.len(),
            code.size,
            map.is_some(),
            timer.elapsed(),
        );

        Ok(BundleOutput {
            entry: entry.clone(),
            inclusion_order: order.order,
            cycle_breaks: order.cycle_breaks,
            code,
            map,
        })
    }
}
