pub mod attachment;
pub mod config;
pub mod error;
pub mod observability;
pub mod render;
pub mod stream;

pub(crate) mod json_scan;
mod util;
