pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod dhash;
pub mod error;
pub mod hamming;
pub mod maintainer;
mod metrics;
mod server;
pub mod source;

pub use catalog::{Catalog, CatalogBuilder};
pub use config::Opts;
pub use error::FingerprintError;
