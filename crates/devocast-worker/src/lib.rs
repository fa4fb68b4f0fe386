#![deny(unreachable_patterns)]
//! Worker Pool (§4.M): claims queued jobs and runs each through the pipeline
//! orchestrator, with crash recovery via stream-level reclaim and
//! heartbeat-based reaping.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod logging;
pub mod reaper;

pub use config::WorkerConfig;
pub use context::{build_collaborators, build_shared_collaborators};
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
