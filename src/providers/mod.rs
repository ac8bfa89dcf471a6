//! Block sources feeding the pipeline.

pub mod memory;
pub mod portal;
pub mod traits;

pub use memory::InMemoryBlockSource;
pub use portal::PortalBlockSource;
pub use traits::{BlockSource, DataSourceError};
