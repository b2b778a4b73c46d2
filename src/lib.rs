pub mod config;
pub mod diagnostics;
pub mod error;
pub mod factors;
pub mod jurisdiction;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod table;

pub use error::{PipelineError, Result};
