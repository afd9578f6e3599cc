//! The reading library: publications, their attributions, and tags.
//!
//! - [`filter`] normalizes raw criteria into the form stored columns use.
//! - [`query`] answers "how many" and "which page" for one reader.
//! - [`store`] is the write path used to populate the library.

pub mod filter;
pub mod query;
pub mod store;
pub mod types;

pub use filter::{LibraryFilter, OrderBy, RawFilter};
pub use query::Library;
