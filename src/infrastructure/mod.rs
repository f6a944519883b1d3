// Infrastructure layer
pub mod file_system;
pub mod memory;

pub use file_system::*;
pub use memory::*;
