//! Clip mode: source video to ranked, captioned short clips.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use reel_media::{write_ass_subtitles, MediaKind, Transcriber, TimeRange, TransformOp};
use reel_models::{
    AspectFormat, ClipCandidate, ClipDescriptor, ClipSet, ClipWord, ProcessVideoRequest,
    RunPayload, Stage, TranscriptWord,
};

use super::{render_failure, RunContext};
use crate::batch::{dispatch_percent, run_bounded};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::scorer::SegmentScorer;

const FALLBACK_TITLE: &str = "Processed Video";

pub(super) async fn run(
    ctx: &RunContext,
    request: &ProcessVideoRequest,
    transcriber: Arc<dyn Transcriber>,
    scorer: &SegmentScorer,
) -> PipelineResult<RunPayload> {
    let source = request.source_url.trim();
    tokio::fs::create_dir_all(&ctx.work_dir).await?;
    tokio::fs::create_dir_all(&ctx.config.clips_dir).await?;

    // Fetch
    ctx.emit(Stage::Fetching, 0, "Downloading audio...").await?;
    let fetcher = &ctx.collaborators.fetcher;
    let audio = fetcher
        .fetch(source, MediaKind::Audio)
        .await
        .map_err(|e| PipelineError::fetch(e.to_string()))?;
    ctx.emit(Stage::Fetching, 20, "Downloading video...").await?;
    ctx.checkpoint()?;

    let video = fetcher
        .fetch(source, MediaKind::Video)
        .await
        .map_err(|e| PipelineError::fetch(e.to_string()))?;
    let title = match fetcher.title(source).await {
        Ok(Some(title)) if !title.trim().is_empty() => title,
        Ok(_) => FALLBACK_TITLE.to_string(),
        Err(e) => {
            ctx.logger.log_warning(&format!("title lookup failed: {e}"));
            FALLBACK_TITLE.to_string()
        }
    };
    ctx.emit(Stage::Fetching, 40, "Download complete").await?;
    ctx.checkpoint()?;

    // Transcribe
    ctx.emit(Stage::Transcribing, 40, "Transcribing audio...").await?;
    let words = transcriber
        .transcribe(&audio)
        .await
        .map_err(|e| PipelineError::transcription(e.to_string()))?;
    ctx.emit(
        Stage::Transcribing,
        60,
        format!("Transcribed {} words", words.len()),
    )
    .await?;
    ctx.checkpoint()?;

    // Analyze
    ctx.emit(Stage::Analyzing, 60, "Finding the best moments...").await?;
    let candidates = scorer.score(&words);
    metrics::record_candidates(candidates.len());
    if candidates.is_empty() {
        return Err(PipelineError::no_candidates(
            "no part of the transcript is long enough to clip",
        ));
    }
    ctx.emit(
        Stage::Analyzing,
        70,
        format!("Found {} candidate clips", candidates.len()),
    )
    .await?;
    ctx.checkpoint()?;

    // Render
    let selected: Vec<ClipCandidate> = candidates
        .into_iter()
        .take(ctx.config.max_clips.max(1))
        .collect();
    let video = video.as_path();
    let words = words.as_slice();
    let format = request.format;

    let clips = run_bounded(
        selected,
        ctx.config.render_concurrency,
        move |index, total| async move {
            ctx.checkpoint()?;
            ctx.emit(
                Stage::Rendering,
                dispatch_percent(70, 30, index, total),
                format!("Rendering clip {}/{}...", index + 1, total),
            )
            .await
        },
        move |index, candidate| render_clip(ctx, video, words, format, index, candidate),
    )
    .await
    .map_err(render_failure)?;

    Ok(RunPayload::Clips(ClipSet {
        clips,
        source_url: source.to_string(),
        title,
    }))
}

/// Cut, caption and reframe one candidate.
async fn render_clip(
    ctx: &RunContext,
    video: &Path,
    words: &[TranscriptWord],
    format: AspectFormat,
    index: usize,
    candidate: ClipCandidate,
) -> PipelineResult<ClipDescriptor> {
    let started = Instant::now();
    let name = format!("clip_{}_{}", ctx.id, index + 1);
    let file_name = format!("{name}.mp4");
    let output = ctx.config.clips_dir.join(&file_name);

    let clip_words = words_in_range(
        words,
        secs_to_ms(candidate.start_time_sec),
        secs_to_ms(candidate.end_time_sec),
    );

    if output.exists() {
        debug!(clip = %name, "Reusing rendered clip");
    } else {
        let subtitles = ctx.work_dir.join(format!("{name}.ass"));
        write_ass_subtitles(&clip_words, format.resolution(), &subtitles).await?;

        let trimmed = ctx.work_dir.join(format!("{name}_trim.mp4"));
        let transform = &ctx.collaborators.transform;
        transform
            .apply(TransformOp::Trim {
                input: video.to_path_buf(),
                output: trimmed.clone(),
                range: TimeRange::new(candidate.start_time_sec, candidate.duration_sec),
            })
            .await?;
        transform
            .apply(TransformOp::CropScale {
                input: trimmed.clone(),
                output: output.clone(),
                format,
                subtitles: Some(subtitles),
                keep_audio: true,
            })
            .await?;
        tokio::fs::remove_file(&trimmed).await.ok();
    }

    metrics::record_render_task(ctx.mode.as_str(), started.elapsed().as_secs_f64());

    Ok(ClipDescriptor {
        id: name,
        title: candidate.title,
        virality_score: candidate.virality_score,
        duration_sec: candidate.duration_sec,
        url: ctx.config.clip_url(&file_name),
        transcript: clip_words
            .iter()
            .map(|w| ClipWord {
                word: w.text.clone(),
                start_time: w.start_ms as f64 / 1000.0,
                end_time: w.end_ms as f64 / 1000.0,
            })
            .collect(),
    })
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

/// Words wholly inside `[start_ms, end_ms]`, rebased to the window start.
fn words_in_range(words: &[TranscriptWord], start_ms: u64, end_ms: u64) -> Vec<TranscriptWord> {
    words
        .iter()
        .filter(|w| w.start_ms >= start_ms && w.end_ms <= end_ms)
        .map(|w| TranscriptWord::new(w.text.clone(), w.start_ms - start_ms, w.end_ms - start_ms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_in_range_rebases() {
        let words = vec![
            TranscriptWord::new("before", 0, 900),
            TranscriptWord::new("edge", 900, 1100),
            TranscriptWord::new("inside", 1000, 1500),
            TranscriptWord::new("last.", 1500, 2000),
            TranscriptWord::new("after", 2000, 2500),
        ];
        let clip = words_in_range(&words, 1000, 2000);
        assert_eq!(
            clip,
            vec![
                TranscriptWord::new("inside", 0, 500),
                TranscriptWord::new("last.", 500, 1000),
            ]
        );
    }

    #[test]
    fn test_secs_to_ms() {
        assert_eq!(secs_to_ms(1.2345), 1235);
        assert_eq!(secs_to_ms(-1.0), 0);
    }
}
