// filehub client - bindings for the deduplicating file storage API
// Wraps upload, listing, search, delete, stats and download behind one typed interface

#[macro_use]
extern crate log;

pub mod client;
pub mod error;
pub mod types;

pub use client::{read_upload, FileApi, FileHubClient};
pub use error::{ApiError, ErrorKind, Result};
pub use types::{
    ClientConfig, DateRange, DedupStatus, FileRecord, FilterSet, OriginalFileDetails,
    StorageStats,
};
