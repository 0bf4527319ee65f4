pub mod error;
pub mod model;

pub use error::{AppError, CapabilityWarning};
pub use model::{
    Capabilities, DownloadOutcome, DownloadPhase, DownloadRequest, FetchPlan, OutputFormat,
    PostProcessingStep, ProgressEvent, Resolution,
};
