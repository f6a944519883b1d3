use crate::core::cache::ScanCache;
use crate::core::interfaces::SourceProvider;
use crate::core::line_index::LineIndex;
use crate::core::models::*;
use crate::core::options::BundleOptions;
use crate::core::resolver::{PathResolver, ResolveTarget};
use crate::core::scanner::{self, RequireCandidate};
use crate::utils::{Logger, NeuterError, Result};
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Every module reachable from one entry, keyed by canonical path.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    pub entry: CanonicalPath,
    modules: HashMap<CanonicalPath, Module>,
}

impl ModuleGraph {
    pub fn get(&self, path: &CanonicalPath) -> Option<&Module> {
        self.modules.get(path)
    }

    pub fn contains(&self, path: &CanonicalPath) -> bool {
        self.modules.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Direct dependencies in declaration order, glob matches expanded in place.
    pub fn dependencies(&self, path: &CanonicalPath) -> Vec<CanonicalPath> {
        self.modules
            .get(path)
            .map(|module| {
                module
                    .references
                    .iter()
                    .flat_map(|r| r.resolution.targets().iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Outcome of following one resolve target
#[derive(Debug, Default)]
struct Fetched {
    targets: Vec<CanonicalPath>,
    loaded: Vec<SourceFile>,
    skipped: Vec<CanonicalPath>,
}

pub struct GraphBuilder<'a> {
    provider: &'a dyn SourceProvider,
    options: &'a BundleOptions,
    cache: Option<&'a ScanCache>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(provider: &'a dyn SourceProvider, options: &'a BundleOptions) -> Self {
        Self {
            provider,
            options,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a ScanCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Discover the module set breadth-first from `entry`.
    ///
    /// The new targets of one module are fetched concurrently; results are
    /// applied in declaration order so the graph never depends on timing.
    pub async fn build(&self, entry: &CanonicalPath) -> Result<ModuleGraph> {
        let entry_file = self
            .provider
            .read_source(entry)
            .await?
            .ok_or_else(|| NeuterError::MissingEntry(entry.clone()))?;

        let mut graph = ModuleGraph {
            entry: entry.clone(),
            modules: HashMap::new(),
        };
        let mut queue = VecDeque::new();
        insert_module(&mut graph, &mut queue, entry_file);

        let resolver = PathResolver::new(self.options);

        while let Some(path) = queue.pop_front() {
            let candidates = match graph.modules.get(&path) {
                Some(module) => self.scan(&path, &module.source),
                None => continue,
            };

            let targets: Vec<ResolveTarget> = candidates
                .iter()
                .map(|c| resolver.resolve(&c.specifier, &path))
                .collect();

            let mut unique: Vec<&ResolveTarget> = Vec::new();
            for target in &targets {
                if !unique.contains(&target) {
                    unique.push(target);
                }
            }

            let fetched = join_all(unique.iter().map(|t| self.fetch(t, &graph.modules))).await;

            let mut outcomes: Vec<(&ResolveTarget, Fetched)> = Vec::with_capacity(unique.len());
            for (target, result) in unique.into_iter().zip(fetched) {
                match result {
                    Ok(found) => outcomes.push((target, found)),
                    Err(err) => {
                        let candidate = targets
                            .iter()
                            .position(|t| t == target)
                            .map(|idx| &candidates[idx]);
                        return Err(unresolved(&graph, &path, candidate, err));
                    }
                }
            }

            let mut references = Vec::with_capacity(candidates.len());
            for (candidate, target) in candidates.iter().zip(&targets) {
                let outcome = outcomes
                    .iter()
                    .find(|(t, _)| *t == target)
                    .map(|(_, found)| found);

                let resolution = match outcome {
                    Some(found) if !found.targets.is_empty() => {
                        for skipped in &found.skipped {
                            Logger::skipped_reference(path.as_str(), skipped.as_str());
                        }
                        Resolution::Modules(found.targets.clone())
                    }
                    _ => {
                        Logger::external_reference(path.as_str(), &candidate.specifier);
                        Resolution::External
                    }
                };

                references.push(DependencyReference {
                    specifier: candidate.specifier.clone(),
                    call: candidate.call,
                    excision: candidate.excision,
                    line: candidate.line,
                    column: candidate.column,
                    resolution,
                });
            }

            for (_, found) in outcomes {
                for file in found.loaded {
                    insert_module(&mut graph, &mut queue, file);
                }
            }

            Logger::module_discovered(path.as_str(), references.len());
            if let Some(module) = graph.modules.get_mut(&path) {
                module.references = references;
            }
        }

        Ok(graph)
    }

    fn scan(&self, path: &CanonicalPath, source: &str) -> Arc<Vec<RequireCandidate>> {
        match self.cache {
            Some(cache) => cache.scan(path, source),
            None => Arc::new(scanner::scan(source)),
        }
    }

    async fn fetch(
        &self,
        target: &ResolveTarget,
        known: &HashMap<CanonicalPath, Module>,
    ) -> Result<Fetched> {
        let mut fetched = Fetched::default();

        match target {
            ResolveTarget::File(candidates) => {
                for candidate in candidates {
                    if known.contains_key(candidate) {
                        fetched.targets.push(candidate.clone());
                        break;
                    }
                    if self.options.is_skipped(candidate) {
                        fetched.skipped.push(candidate.clone());
                        fetched.targets.push(candidate.clone());
                        break;
                    }
                    if let Some(file) = self.provider.read_source(candidate).await? {
                        fetched.targets.push(candidate.clone());
                        fetched.loaded.push(file);
                        break;
                    }
                }
            }
            ResolveTarget::Glob(pattern) => {
                let mut matches = self.provider.expand_glob(pattern).await?;
                matches.sort();
                matches.dedup();

                let mut to_load = Vec::new();
                for path in matches {
                    if known.contains_key(&path) {
                        fetched.targets.push(path);
                    } else if self.options.is_skipped(&path) {
                        fetched.skipped.push(path.clone());
                        fetched.targets.push(path);
                    } else {
                        to_load.push(path);
                    }
                }

                let loaded = join_all(to_load.iter().map(|p| self.provider.read_source(p))).await;
                for (path, result) in to_load.into_iter().zip(loaded) {
                    // Vanished between listing and reading: nothing to include
                    if let Some(file) = result? {
                        fetched.targets.push(path);
                        fetched.loaded.push(file);
                    }
                }
                fetched.targets.sort();
            }
        }

        Ok(fetched)
    }
}

fn insert_module(graph: &mut ModuleGraph, queue: &mut VecDeque<CanonicalPath>, file: SourceFile) {
    if graph.modules.contains_key(&file.path) {
        return;
    }
    let path = file.path.clone();
    graph.modules.insert(
        path.clone(),
        Module {
            path: path.clone(),
            source: file.contents,
            input_map: file.input_map,
            references: Vec::new(),
        },
    );
    queue.push_back(path);
}

fn unresolved(
    graph: &ModuleGraph,
    requirer: &CanonicalPath,
    candidate: Option<&RequireCandidate>,
    err: NeuterError,
) -> NeuterError {
    let Some(candidate) = candidate else {
        return err;
    };

    let snippet = graph.modules.get(requirer).map(|module| {
        LineIndex::new(&module.source)
            .line_text(&module.source, candidate.call.start)
            .to_string()
    });

    NeuterError::UnresolvedRequiredFile {
        requirer: requirer.clone(),
        specifier: candidate.specifier.clone(),
        line: candidate.line,
        column: candidate.column,
        reason: err.to_string(),
        snippet,
    }
}

/// Modules in emission order plus the edges dropped to break cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionOrder {
    pub order: Vec<CanonicalPath>,
    pub cycle_breaks: Vec<(CanonicalPath, CanonicalPath)>,
}

/// Post-order depth-first walk from the entry.
///
/// Every module appears after all of its dependencies, except along edges
/// that close a cycle; those are recorded and not followed. Skip-listed
/// modules count as already emitted.
pub fn inclusion_order(graph: &ModuleGraph, options: &BundleOptions) -> InclusionOrder {
    let mut state: HashMap<CanonicalPath, VisitState> = HashMap::new();
    for skipped in &options.skip_paths {
        if *skipped != graph.entry {
            state.insert(skipped.clone(), VisitState::Finished);
        }
    }

    let mut result = InclusionOrder::default();
    if !graph.contains(&graph.entry) {
        return result;
    }

    let mut stack: Vec<(CanonicalPath, Vec<CanonicalPath>, usize)> = Vec::new();
    state.insert(graph.entry.clone(), VisitState::InProgress);
    stack.push((graph.entry.clone(), graph.dependencies(&graph.entry), 0));

    while let Some((path, deps, next)) = stack.last_mut() {
        if *next == deps.len() {
            let path = path.clone();
            stack.pop();
            state.insert(path.clone(), VisitState::Finished);
            result.order.push(path);
            continue;
        }

        let dep = deps[*next].clone();
        *next += 1;

        match state.get(&dep).copied().unwrap_or(VisitState::Unvisited) {
            VisitState::Finished => {}
            VisitState::InProgress => {
                Logger::cycle_broken(path.as_str(), dep.as_str());
                result.cycle_breaks.push((path.clone(), dep));
            }
            VisitState::Unvisited => {
                if graph.contains(&dep) {
                    state.insert(dep.clone(), VisitState::InProgress);
                    let dep_deps = graph.dependencies(&dep);
                    stack.push((dep, dep_deps, 0));
                }
            }
        }
    }

    result
}
