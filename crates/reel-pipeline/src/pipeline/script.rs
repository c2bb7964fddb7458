//! Script mode: text or scenes to one narrated, scored video.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reel_media::{TimeRange, TransformOp};
use reel_models::{
    AspectFormat, GenerateVideoRequest, ParsedScript, RenderedVideo, RunPayload, Scene, Stage,
};

use super::{render_failure, RunContext};
use crate::assets::FootageSource;
use crate::batch::{dispatch_percent, run_bounded};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::segment::{into_parsed_script, title_from_text};

pub(super) async fn run(
    ctx: &RunContext,
    request: GenerateVideoRequest,
    footage: Arc<dyn FootageSource>,
) -> PipelineResult<RunPayload> {
    tokio::fs::create_dir_all(&ctx.work_dir).await?;
    tokio::fs::create_dir_all(&ctx.config.outputs_dir).await?;
    ctx.emit(Stage::Init, 2, "Starting video generation...").await?;

    // Parse
    ctx.emit(Stage::Parsing, 10, "Parsing script...").await?;
    let script = parse(ctx, &request).await?;
    ctx.logger.log_progress(&format!(
        "{} scenes, {:.0}s total",
        script.scenes.len(),
        script.total_duration
    ));
    ctx.checkpoint()?;

    // Narrate
    let narration = narrate(ctx, &script, request.voice_id.as_deref()).await?;
    ctx.checkpoint()?;

    // Render scenes
    ctx.emit(Stage::Rendering, 26, "Preparing footage...").await?;
    let music = match &ctx.collaborators.music {
        Some(source) => source.pick().await.unwrap_or_else(|e| {
            ctx.logger.log_warning(&format!("music lookup failed: {e}"));
            None
        }),
        None => None,
    };
    ctx.emit(Stage::Rendering, 30, "Fetching footage...").await?;

    let format = request.format;
    let footage = footage.as_ref();
    let scene_clips = run_bounded(
        script.scenes.clone(),
        ctx.config.render_concurrency,
        move |index, total| async move {
            ctx.checkpoint()?;
            ctx.emit(
                Stage::Rendering,
                dispatch_percent(30, 40, index, total),
                format!("Rendering scene {}/{}...", index + 1, total),
            )
            .await
        },
        move |index, scene| render_scene(ctx, footage, format, index, scene),
    )
    .await
    .map_err(render_failure)?;
    ctx.emit(Stage::Rendering, 70, "Scenes ready").await?;
    ctx.checkpoint()?;

    // Assemble
    ctx.emit(Stage::Assembling, 72, "Assembling video...").await?;
    let assembled = ctx
        .collaborators
        .transform
        .apply(TransformOp::Concat {
            inputs: scene_clips,
            output: ctx.work_dir.join("assembled.mp4"),
        })
        .await
        .map_err(|e| PipelineError::assembly(e.to_string()))?;
    ctx.emit(Stage::Assembling, 84, "Video assembled").await?;
    ctx.checkpoint()?;

    // Mix
    ctx.emit(Stage::Mixing, 86, "Mixing audio...").await?;
    let mixed = mix(ctx, &assembled, narration, music).await?;
    ctx.emit(Stage::Mixing, 94, "Audio mixed").await?;

    // Finalize
    ctx.emit(Stage::Finalizing, 98, "Finalizing video...").await?;
    let file_name = format!("video_{}.mp4", ctx.id);
    tokio::fs::copy(&mixed, ctx.config.outputs_dir.join(&file_name)).await?;

    Ok(RunPayload::Video(RenderedVideo {
        video_url: ctx.config.output_url(&file_name),
        title: script.title,
    }))
}

/// Scenes from the request, or from segmenting its free text.
async fn parse(ctx: &RunContext, request: &GenerateVideoRequest) -> PipelineResult<ParsedScript> {
    if let Some(scenes) = request.scenes.as_ref().filter(|s| !s.is_empty()) {
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| title_from_text(&scenes[0].narration));
        return Ok(ParsedScript::from_scenes(title, scenes.clone()));
    }

    let text = request
        .script
        .as_deref()
        .ok_or_else(|| PipelineError::script("no scenes or script provided"))?;
    let segments = ctx.collaborators.segmenter.segment(text).await?;
    Ok(into_parsed_script(request.title.as_deref(), segments))
}

/// One narration track for the whole script, if a narrator is configured.
async fn narrate(
    ctx: &RunContext,
    script: &ParsedScript,
    voice: Option<&str>,
) -> PipelineResult<Option<PathBuf>> {
    let Some(narrator) = &ctx.collaborators.narrator else {
        ctx.logger
            .log_warning("no narrator configured, rendering without narration");
        ctx.emit(Stage::Narrating, 24, "Skipping narration").await?;
        return Ok(None);
    };

    ctx.emit(Stage::Narrating, 16, "Generating narration...").await?;
    let text = script
        .scenes
        .iter()
        .map(|s| s.narration.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let track = narrator
        .narrate(&text, voice, &ctx.work_dir.join("narration.wav"))
        .await
        .map_err(|e| PipelineError::Narration(e.to_string()))?;
    ctx.emit(Stage::Narrating, 24, "Narration ready").await?;
    Ok(Some(track))
}

/// Footage for one scene, cut to length and reframed without audio.
async fn render_scene(
    ctx: &RunContext,
    footage: &dyn FootageSource,
    format: AspectFormat,
    index: usize,
    scene: Scene,
) -> PipelineResult<PathBuf> {
    let started = Instant::now();
    let source = footage
        .acquire(&scene.query(), format.orientation(), &ctx.work_dir, index)
        .await?;

    let transform = &ctx.collaborators.transform;
    let trimmed = ctx.work_dir.join(format!("scene_{index:03}_trim.mp4"));
    transform
        .apply(TransformOp::Trim {
            input: source,
            output: trimmed.clone(),
            range: TimeRange::new(0.0, scene.duration_sec),
        })
        .await?;

    let output = transform
        .apply(TransformOp::CropScale {
            input: trimmed.clone(),
            output: ctx.work_dir.join(format!("scene_{index:03}.mp4")),
            format,
            subtitles: None,
            keep_audio: false,
        })
        .await?;
    tokio::fs::remove_file(&trimmed).await.ok();

    metrics::record_render_task(ctx.mode.as_str(), started.elapsed().as_secs_f64());
    Ok(output)
}

/// Put narration and music under the assembled video.
///
/// Music is optional: a failed mix falls back to the narrated video, and a
/// failed music-only mux falls back to the silent one.
async fn mix(
    ctx: &RunContext,
    assembled: &Path,
    narration: Option<PathBuf>,
    music: Option<PathBuf>,
) -> PipelineResult<PathBuf> {
    let transform = &ctx.collaborators.transform;

    match (narration, music) {
        (Some(narration), music) => {
            let narrated = transform
                .apply(TransformOp::MuxAudio {
                    video: assembled.to_path_buf(),
                    audio: narration,
                    output: ctx.work_dir.join("narrated.mp4"),
                })
                .await
                .map_err(|e| PipelineError::assembly(e.to_string()))?;

            let Some(track) = music else {
                return Ok(narrated);
            };
            match transform
                .apply(TransformOp::MixAudio {
                    video: narrated.clone(),
                    track,
                    output: ctx.work_dir.join("mixed.mp4"),
                    volume: ctx.config.music_volume,
                })
                .await
            {
                Ok(mixed) => Ok(mixed),
                Err(e) => {
                    ctx.logger
                        .log_warning(&format!("music mix failed, keeping narration only: {e}"));
                    Ok(narrated)
                }
            }
        }
        (None, Some(track)) => {
            match transform
                .apply(TransformOp::MuxAudio {
                    video: assembled.to_path_buf(),
                    audio: track,
                    output: ctx.work_dir.join("scored.mp4"),
                })
                .await
            {
                Ok(scored) => Ok(scored),
                Err(e) => {
                    ctx.logger
                        .log_warning(&format!("music mux failed, keeping silent video: {e}"));
                    Ok(assembled.to_path_buf())
                }
            }
        }
        (None, None) => Ok(assembled.to_path_buf()),
    }
}
