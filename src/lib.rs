//! Static `require()` bundler.
//!
//! Starting from an entry module, every statically declared dependency is
//! discovered, ordered so that dependencies precede their dependents, and
//! concatenated into one artifact with the declarations removed. An optional
//! composite source map points back into the original modules.

pub mod cli;
pub mod core;
pub mod infrastructure;
pub mod utils;

pub use crate::core::{BundleOptions, BundleOutput, BundleService, CanonicalPath, NeuterBuildService};
pub use crate::utils::{NeuterError, Result};
