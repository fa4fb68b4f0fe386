//! `plan_queries` (§4.L band 25-30, §4.F): derive one search slot per
//! background-clip segment from the finalized subtitle list.

use devocast_models::{plan_slot_count, Slot, StageName};
use tracing::{info, warn};

use crate::context::JobContext;
use crate::error::PipelineResult;

/// Concatenate every subtitle segment whose span overlaps `[start, start+duration)`.
fn text_for_window(segments: &[devocast_models::SubtitleSegment], start: f64, duration: f64) -> String {
    let end = start + duration;
    segments
        .iter()
        .filter(|s| s.start_seconds < end && s.end_seconds > start)
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let total_duration = ctx.scratch.audio_duration_seconds.unwrap_or(0.0);
    let slot_count = plan_slot_count(total_duration);
    let slot_duration = if slot_count > 0 { total_duration / slot_count as f64 } else { 0.0 };

    let mut slots = Vec::with_capacity(slot_count as usize);
    for index in 0..slot_count {
        let start = index as f64 * slot_duration;
        let window_text = text_for_window(&ctx.scratch.final_segments, start, slot_duration);

        let planned = ctx.collaborators.query_planner.plan_query(&window_text).await;
        if planned.degraded {
            warn!(job_id = %ctx.job.job_id, slot = index, "query planner degraded, using fallback tag");
        }

        let semantic_tags: Vec<String> = planned.query.split_whitespace().map(str::to_string).collect();
        slots.push(Slot {
            index,
            start_seconds: start,
            duration_seconds: slot_duration,
            query_string: planned.query,
            semantic_tags,
        });
    }

    info!(job_id = %ctx.job.job_id, slot_count, "planned clip slots");
    ctx.scratch.slots = slots;
    ctx.job = ctx.job.clone().with_progress(StageName::PlanQueries, 30);
    Ok(())
}
