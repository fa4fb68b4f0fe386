//! `post_process_subtitles` (§4.L band 20-25, §4.E): apply the tenant's word
//! replacement dictionary, merge short adjacent segments, drop empties.

use std::collections::HashMap;

use devocast_models::{ReplacementEntry, StageName, SubtitleSegment};
use tracing::info;

use crate::context::JobContext;
use crate::error::PipelineResult;

/// Merge threshold: combined duration and combined text length (§4.E).
const MERGE_MAX_DURATION_SECONDS: f64 = 6.0;
const MERGE_MAX_TEXT_CHARS: usize = 40;

fn apply_replacements(text: &str, dictionary: &HashMap<&str, &str>, use_counts: &mut HashMap<String, u64>) -> String {
    text.split(' ')
        .map(|token| match dictionary.get(token) {
            Some(&replacement) => {
                *use_counts.entry(token.to_string()).or_insert(0) += 1;
                replacement
            }
            None => token,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn merge_segments(segments: Vec<SubtitleSegment>) -> Vec<SubtitleSegment> {
    let mut merged: Vec<SubtitleSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(last) = merged.last_mut() {
            let combined_duration = seg.end_seconds - last.start_seconds;
            let combined_len = last.text.len() + 1 + seg.text.len();
            if combined_duration <= MERGE_MAX_DURATION_SECONDS && combined_len <= MERGE_MAX_TEXT_CHARS {
                last.end_seconds = seg.end_seconds;
                last.text = format!("{} {}", last.text, seg.text);
                continue;
            }
        }
        merged.push(seg);
    }
    for (i, seg) in merged.iter_mut().enumerate() {
        seg.index = i as u32 + 1;
    }
    merged
}

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let entries: Vec<ReplacementEntry> = ctx.collaborators.replacement_repo.list(&ctx.job.tenant_id).await?;
    let dictionary: HashMap<&str, &str> =
        entries.iter().map(|e| (e.original_token.as_str(), e.replacement_token.as_str())).collect();

    let mut use_counts: HashMap<String, u64> = HashMap::new();
    let replaced: Vec<SubtitleSegment> = ctx
        .scratch
        .raw_segments
        .iter()
        .map(|seg| SubtitleSegment {
            index: seg.index,
            start_seconds: seg.start_seconds,
            end_seconds: seg.end_seconds,
            text: apply_replacements(seg.text.trim(), &dictionary, &mut use_counts),
        })
        .collect();

    // Merge adjacent segments before trimming/dropping empties (§4.E): a
    // segment emptied by replacement should still get a chance to be
    // absorbed into a neighbor instead of vanishing first.
    let mut merged: Vec<SubtitleSegment> = merge_segments(replaced)
        .into_iter()
        .map(|mut seg| {
            seg.text = seg.text.trim().to_string();
            seg
        })
        .filter(|seg| !seg.text.is_empty())
        .collect();
    for (i, seg) in merged.iter_mut().enumerate() {
        seg.index = i as u32 + 1;
    }

    for entry in &entries {
        if let Some(&count) = use_counts.get(&entry.original_token) {
            let mut updated = entry.clone();
            updated.use_count += count;
            ctx.collaborators.replacement_repo.upsert(&updated).await?;
        }
    }

    ctx.collaborators.subtitle_repo.save(&ctx.job.job_id, &merged).await?;

    info!(job_id = %ctx.job.job_id, segment_count = merged.len(), "post-processed subtitles");
    ctx.scratch.final_segments = merged;
    ctx.job = ctx.job.clone().with_progress(StageName::PostProcessSubtitles, 25);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: u32, start: f64, end: f64, text: &str) -> SubtitleSegment {
        SubtitleSegment { index, start_seconds: start, end_seconds: end, text: text.to_string() }
    }

    #[test]
    fn merges_short_adjacent_segments() {
        let segments = vec![seg(1, 0.0, 1.0, "Grace"), seg(2, 1.0, 2.0, "and peace")];
        let merged = merge_segments(segments);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Grace and peace");
    }

    #[test]
    fn does_not_merge_when_duration_exceeds_threshold() {
        let segments = vec![seg(1, 0.0, 5.0, "Grace"), seg(2, 5.0, 8.0, "and peace")];
        let merged = merge_segments(segments);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn replacement_is_whole_token_and_case_sensitive() {
        let dict: HashMap<&str, &str> = [("Lord", "L—rd")].into_iter().collect();
        let mut counts = HashMap::new();
        let out = apply_replacements("the lord is the Lord", &dict, &mut counts);
        assert_eq!(out, "the lord is the L—rd");
        assert_eq!(counts.get("Lord"), Some(&1));
    }

    /// A segment emptied by replacement must still be eligible to merge into
    /// a neighbor before it's dropped, per the merge-then-trim-then-drop order.
    #[test]
    fn segment_emptied_by_replacement_merges_before_being_dropped() {
        let segments = vec![seg(1, 0.0, 1.0, ""), seg(2, 1.0, 2.0, "and peace")];
        let merged = merge_segments(segments)
            .into_iter()
            .map(|mut s| {
                s.text = s.text.trim().to_string();
                s
            })
            .filter(|s| !s.text.is_empty())
            .collect::<Vec<_>>();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "and peace");
        // Merging first means the empty segment's start time is preserved in
        // the combined span; dropping it first would have left only seg 2's
        // narrower [1.0, 2.0) span.
        assert_eq!(merged[0].start_seconds, 0.0);
    }
}
