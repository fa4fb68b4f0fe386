//! Outbound HTTP clients for the four external dependencies pipeline stages
//! call into: Speech-to-Text, query planning, clip search, and vision
//! moderation (§6).

pub mod clip_search;
pub mod error;
pub mod query_planner;
pub mod transcriber;
pub mod vision_moderator;

pub use clip_search::ClipSearchClient;
pub use error::{ClientError, ClientResult};
pub use query_planner::{PlannedQuery, QueryPlannerClient};
pub use transcriber::TranscriberClient;
pub use vision_moderator::VisionModeratorClient;
