pub mod builder;
pub mod loader;
pub mod migrations;
pub mod models;
pub mod store;

pub use builder::{DatasetNotFound, IndexBuilder, IndexSettings};
pub use loader::{load_pdf, load_pdf_directory};
pub use models::{Document, DocumentChunk, IndexManifest, SearchResult, SourcePage};
pub use store::VectorStore;
