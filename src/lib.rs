//! Read-only access to evaluation results written by the ETL step, plus the
//! aggregation and formatting helpers the viewer renders them with.

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod loader;
pub mod models;
pub mod output;
pub mod store;
pub mod view;

pub use error::{ErrorKind, LoaderError, LoaderResult, StoreError};
pub use loader::DataLoader;
pub use store::{FsStore, MemoryStore, RawStore, StoreKey};
pub use view::AggregationView;
