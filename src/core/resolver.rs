use crate::core::models::CanonicalPath;
use crate::core::options::BundleOptions;

/// Where a specifier points, before anything is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveTarget {
    /// Candidate files, tried in order; the first one that exists wins.
    File(Vec<CanonicalPath>),
    /// A pattern expanded against the module set
    Glob(CanonicalPath),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest<'r> {
    /// Specifier after the rewrite hook ran
    pub specifier: String,
    pub importer: &'r CanonicalPath,
}

pub struct PathResolver<'a> {
    options: &'a BundleOptions,
}

impl<'a> PathResolver<'a> {
    pub fn new(options: &'a BundleOptions) -> Self {
        Self { options }
    }

    pub fn request<'r>(&self, raw: &str, importer: &'r CanonicalPath) -> ResolveRequest<'r> {
        let specifier = match &self.options.specifier_rewrite {
            Some(rewrite) => rewrite.rewrite(raw),
            None => raw.to_string(),
        };
        ResolveRequest { specifier, importer }
    }

    pub fn resolve(&self, raw: &str, importer: &CanonicalPath) -> ResolveTarget {
        let request = self.request(raw, importer);
        let specifier = request.specifier.as_str();

        if is_glob(specifier) {
            return ResolveTarget::Glob(self.base_dir(&request).join(specifier));
        }

        let mut candidates = vec![self.with_extension(self.base_dir(&request).join(specifier))];

        // Without a base path, bare specifiers may still name a file from the root
        if self.options.base_path.is_none() && !is_relative(specifier) && !importer.dir().is_empty() {
            let from_root = self.with_extension(CanonicalPath::new(specifier));
            if !candidates.contains(&from_root) {
                candidates.push(from_root);
            }
        }

        ResolveTarget::File(candidates)
    }

    fn base_dir(&self, request: &ResolveRequest<'_>) -> CanonicalPath {
        if is_relative(&request.specifier) || self.options.base_path.is_none() {
            request.importer.dir()
        } else {
            CanonicalPath::new("")
        }
    }

    fn with_extension(&self, path: CanonicalPath) -> CanonicalPath {
        if path.has_extension() {
            path
        } else {
            CanonicalPath::new(&format!("{}.{}", path, self.options.extension))
        }
    }
}

pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Wildcard specifiers that also parse as a pattern. Anything else, `data[`
/// included, is an ordinary file name.
pub fn is_glob(specifier: &str) -> bool {
    specifier.contains(&['*', '?', '['][..]) && glob::Pattern::new(specifier).is_ok()
}
