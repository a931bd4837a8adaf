pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod filename;
pub mod format;
pub mod key;
pub mod reader;
pub mod resolve;
pub mod restart;
pub mod series;
pub mod smspec;
pub mod summary;
pub mod writer;
