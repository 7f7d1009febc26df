//! # gridmatch-io
//!
//! Read feature tables from Parquet and write match results back to Parquet.
//! Bridges external files into the `FeatureMatrix` values consumed by
//! `gridmatch-knn`.

mod error;
mod parquet_read;
mod parquet_write;
mod reader;
mod writer;

pub use error::IoError;
pub use reader::{FeatureTable, ReaderConfig, check_compatible, read_features};
pub use writer::{Compression, WriterConfig, write_matches};
