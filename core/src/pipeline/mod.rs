// pipewright/src/pipeline/mod.rs

//! Defines the `Pipeline<TData>` struct, its registration API, the step
//! executor with its retry loop, and failure routing.

pub mod definition;
pub mod execution;
pub mod fallback;
pub mod hooks;
pub mod interceptor;

pub use definition::{ErrorHandler, Pipeline};
pub use execution::RunReport;
pub use fallback::{DefaultFallback, FallbackHandler};
