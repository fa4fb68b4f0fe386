//! One module per `StageName` variant (§4.L); `crate::stage::dispatch` routes
//! into these by name.

pub mod acquire_clips;
pub mod apply_intro_outro;
pub mod compose_body;
pub mod finalize;
pub mod persist_artifacts;
pub mod plan_queries;
pub mod post_process_subtitles;
pub mod transcribe;
pub mod validate_input;
