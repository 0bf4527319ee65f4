pub mod client;
pub mod models;

pub use client::HttpClient;
pub use models::{NetworkConfig, Reachability};
