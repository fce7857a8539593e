// pipewright/src/lib.rs

//! Pipewright: an ASYNC request pipeline engine for HTTP handlers.
//!
//! A route is served by a pipeline of ordered steps:
//!  - Steps are declared as `<order>-<label>` (or discovered from files named
//!    that way) and always run in ascending numeric order, one at a time.
//!  - A step that finalizes the response ends the run early, as a success.
//!  - A failing step is wrapped with its pipeline position and routed to the
//!    pipeline's error handler, which can respond, retry the whole pipeline
//!    or escalate to the process-wide fallback handler.
//!  - After a successful run, independently ordered background tasks run on
//!    a spawned task, isolated from each other and from the response.
//!  - An optional debug tracer records per-step context diffs and timings.

pub mod core;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod tracer;

// --- Re-exports for the Public API ---

pub use crate::core::context::{Context, ContextError};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{ErrorOutcome, PipelineOutcome, RetrySignal};
pub use crate::core::http::{Request, Response, ResponseSnapshot};
pub use crate::core::step::{AsyncTask, Step, StepDef};

pub use crate::discovery::{parse_declared_name, scan_dir, Catalog, DiscoveredFile};

pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::execution::RunReport;
pub use crate::pipeline::fallback::{DefaultFallback, FallbackHandler};

pub use crate::error::{FailureKind, HttpError, PipelineError, WrightError, WrightResult, NO_RESPONSE_MESSAGE};

pub use crate::registry::{PipelineSummary, Registry};
pub use crate::scheduler::{BackgroundHandle, BatchReport, TaskReport};
pub use crate::settings::Settings;
pub use crate::tracer::{ChangeKind, KeyChange, StepTrace, TraceSummary};

// Re-exported so hosts and steps use the same versions for the request and response types.
pub use http::header::{HeaderName, HeaderValue};
pub use http::{HeaderMap, Method, StatusCode};

/*
    Request Workflow:
    1. Pick a context type: your own `#[derive(Default, Serialize)]` struct, or `Context`.
    2. Create a `Pipeline<MyCtx>` and register steps with `.step("100-load-user", ...)`,
       background tasks with `.task("100-send-email", ...)`, optionally `.on_error(...)`.
       Or scan two directories with `Pipeline::from_dirs(..)` and a `Catalog`.
    3. Register the pipeline with a `Registry` under the route key your router uses.
    4. Per matched request, call `registry.dispatch(route, request, Response::new()).await`
       and write the response snapshot back to the client.
*/
