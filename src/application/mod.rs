pub mod capability;
pub mod download_coordinator;
pub mod executor;
pub mod plan_builder;
pub mod progress;

pub use download_coordinator::DownloadCoordinator;
pub use progress::ProgressSink;
