// terabox-lib: shared library for the TeraBox uploader binaries

pub mod config;
pub mod crypto;
pub mod errors;
pub mod logger;
pub mod output;
