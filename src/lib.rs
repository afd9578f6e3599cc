//! Personal reading-library server.
//!
//! Readers keep publications (books and documents), each with attributions
//! (authors, editors, ...) and tags (stacks, workspaces). The centre of the
//! crate is the library query: one reader's publications filtered by any mix
//! of title, type, language, keyword, author, attribution, collection,
//! workspace and free-text search, ordered by title, publication date or last
//! update, and paginated, with a matching total count.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite connection setup, schema, migrations, and health checks
//! - [`library`]: Filter normalization, the library query, and the write path
//! - [`server`]: HTTP surface rendering library pages as ActivityStreams collections
//! - [`error`]: Error type for the library query

pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod server;
