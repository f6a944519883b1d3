// Core domain layer
pub mod cache;
pub mod concat;
pub mod graph;
pub mod interfaces;
pub mod line_index;
pub mod models;
pub mod options;
pub mod resolver;
pub mod scanner;
pub mod services;
pub mod source_map;
pub mod template;

pub use cache::ScanCache;
pub use graph::{inclusion_order, GraphBuilder, InclusionOrder, ModuleGraph};
pub use interfaces::*;
pub use models::*;
pub use options::{BundleOptions, ProcessOption};
pub use services::*;
