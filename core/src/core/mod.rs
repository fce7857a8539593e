pub mod context;
pub mod context_data;
pub mod control;
pub mod http;
pub mod step;

pub use self::context::{Context, ContextError};
pub use self::context_data::ContextData;
pub use self::control::{ErrorOutcome, PipelineOutcome, RetrySignal};
pub use self::http::{Request, Response, ResponseSnapshot};
pub use self::step::{AsyncTask, Ordered, Step, StepDef};
