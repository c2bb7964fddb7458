//! Run orchestration.
//!
//! A run request creates a registry entry, then a detached task drives the
//! run through its stages. Every stage publishes progress through the
//! registry; the first stage error ends the run with one `error` event.

mod clips;
mod script;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::{warn, Instrument};

use reel_media::{
    CommandNarrator, FfmpegRunner, FfmpegTransform, MediaTransform, Narrator, SourceFetcher,
    Transcriber, WhisperTranscriber, YtDlpFetcher,
};
use reel_models::{
    GenerateVideoRequest, ParseScriptRequest, ParsedScript, ProcessVideoRequest, ProgressEvent,
    RunId, RunMode, RunPayload, Stage, TranscriptionMethod,
};
use reel_session::{CancellationFlag, SessionRegistry};

use crate::assets::{FootageSource, LocalFootageLibrary, LocalMusicLibrary, MusicSource};
use crate::batch::BatchError;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::scorer::SegmentScorer;
use crate::segment::{into_parsed_script, RuleBasedSegmenter, ScriptSegmenter};

/// External capabilities a run calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub transcribers: HashMap<TranscriptionMethod, Arc<dyn Transcriber>>,
    pub transform: Arc<dyn MediaTransform>,
    pub segmenter: Arc<dyn ScriptSegmenter>,
    pub footage: Option<Arc<dyn FootageSource>>,
    pub narrator: Option<Arc<dyn Narrator>>,
    pub music: Option<Arc<dyn MusicSource>>,
}

impl Collaborators {
    /// Minimal set: no transcribers, rule-based segmentation, no footage,
    /// narration or music.
    pub fn new(fetcher: Arc<dyn SourceFetcher>, transform: Arc<dyn MediaTransform>) -> Self {
        Self {
            fetcher,
            transcribers: HashMap::new(),
            transform,
            segmenter: Arc::new(RuleBasedSegmenter::new()),
            footage: None,
            narrator: None,
            music: None,
        }
    }

    /// Local tool-backed collaborators described by `config`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut runner = FfmpegRunner::new();
        if let Some(secs) = config.ffmpeg_timeout_secs {
            runner = runner.with_timeout(secs);
        }

        let mut collaborators = Self::new(
            Arc::new(YtDlpFetcher::new(config.work_dir.join("downloads"))),
            Arc::new(FfmpegTransform::new(runner)),
        )
        .with_transcriber(
            TranscriptionMethod::Whisper,
            Arc::new(WhisperTranscriber::new(
                config.python_bin.clone(),
                config.whisper_script.clone(),
            )),
        );

        if let Some(dir) = &config.footage_dir {
            collaborators = collaborators.with_footage(Arc::new(LocalFootageLibrary::new(dir)));
        }
        if let Some(dir) = &config.music_dir {
            collaborators = collaborators.with_music(Arc::new(LocalMusicLibrary::new(dir)));
        }
        if let Some(narrator) = config
            .tts_command
            .as_deref()
            .and_then(|t| CommandNarrator::from_template(t, config.default_voice.clone()))
        {
            collaborators = collaborators.with_narrator(Arc::new(narrator));
        }

        collaborators
    }

    pub fn with_transcriber(
        mut self,
        method: TranscriptionMethod,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        self.transcribers.insert(method, transcriber);
        self
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn ScriptSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn with_footage(mut self, footage: Arc<dyn FootageSource>) -> Self {
        self.footage = Some(footage);
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn with_music(mut self, music: Arc<dyn MusicSource>) -> Self {
        self.music = Some(music);
        self
    }
}

/// Enforces forward-only stages and non-decreasing percent within a run.
#[derive(Debug, Default)]
pub struct StageTracker {
    current: Option<(Stage, u8)>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that has already seen `stage` at `percent`.
    pub fn seeded(stage: Stage, percent: u8) -> Self {
        Self {
            current: Some((stage, percent)),
        }
    }

    pub fn current(&self) -> Option<(Stage, u8)> {
        self.current
    }

    /// Accept the next event or reject it as out of order.
    ///
    /// `Error` is accepted from any non-terminal state regardless of percent.
    pub fn advance(&mut self, stage: Stage, percent: u8) -> PipelineResult<()> {
        if let Some((prev, prev_percent)) = self.current {
            if prev.is_terminal() {
                return Err(PipelineError::StageOrder(format!(
                    "run already ended at {prev}, got {stage}"
                )));
            }
            if stage != Stage::Error {
                if stage.order() < prev.order() {
                    return Err(PipelineError::StageOrder(format!("{stage} after {prev}")));
                }
                if percent < prev_percent {
                    return Err(PipelineError::StageOrder(format!(
                        "{stage} at {percent}% after {prev_percent}%"
                    )));
                }
            }
        }
        self.current = Some((stage, percent));
        Ok(())
    }
}

/// State shared by the stages of one run.
pub(crate) struct RunContext {
    pub id: RunId,
    pub mode: RunMode,
    pub work_dir: PathBuf,
    pub registry: Arc<SessionRegistry>,
    pub collaborators: Collaborators,
    pub config: Arc<PipelineConfig>,
    pub logger: RunLogger,
    cancel: CancellationFlag,
    tracker: Mutex<StageTracker>,
    started: Instant,
}

impl RunContext {
    /// Validate ordering, then record and publish a progress event.
    pub async fn emit(
        &self,
        stage: Stage,
        percent: u8,
        message: impl Into<String>,
    ) -> PipelineResult<()> {
        let message = message.into();
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(stage, percent)?;

        self.logger.log_progress(&format!("[{percent}%] {message}"));
        self.registry
            .record(&self.id, ProgressEvent::new(stage, percent, message))
            .await?;
        Ok(())
    }

    /// Fail with `Cancelled` once the run's flag is set.
    pub fn checkpoint(&self) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn finish(&self, result: PipelineResult<RunPayload>) {
        let elapsed = self.started.elapsed().as_secs_f64();

        let event = match result {
            Ok(payload) => {
                self.logger
                    .log_completion(&format!("finished in {elapsed:.1}s"));
                metrics::record_run_completed(self.mode.as_str(), elapsed);
                ProgressEvent::complete(payload, "Complete!")
            }
            Err(e) => {
                self.logger.log_error(&e.to_string());
                metrics::record_run_failed(self.mode.as_str(), e.kind());
                ProgressEvent::error(format!("Error: {e}"))
            }
        };

        if let Err(e) = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(event.stage, event.percent)
        {
            warn!(run_id = %self.id, error = %e, "Terminal event out of order");
        }
        if let Err(e) = self.registry.record(&self.id, event).await {
            warn!(run_id = %self.id, error = %e, "Run vanished before its terminal event");
        }
        self.registry.expire_after(&self.id, self.registry.retention());

        if self.work_dir.exists() {
            tokio::fs::remove_dir_all(&self.work_dir).await.ok();
        }
    }
}

/// Map a failed render batch to the run error. Cancellation passes through.
fn render_failure(e: BatchError<PipelineError>) -> PipelineError {
    match e.error {
        PipelineError::Cancelled => PipelineError::Cancelled,
        other => PipelineError::render_task(e.index, other.to_string()),
    }
}

/// Starts runs and drives them through their stages.
#[derive(Clone)]
pub struct StagePipeline {
    registry: Arc<SessionRegistry>,
    collaborators: Collaborators,
    config: Arc<PipelineConfig>,
    scorer: Arc<SegmentScorer>,
}

impl StagePipeline {
    pub fn new(
        registry: Arc<SessionRegistry>,
        collaborators: Collaborators,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            collaborators,
            config: Arc::new(config),
            scorer: Arc::new(SegmentScorer::default()),
        }
    }

    /// Replace the default scorer.
    pub fn with_scorer(mut self, scorer: SegmentScorer) -> Self {
        self.scorer = Arc::new(scorer);
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate a clip request, create its run and start it in the background.
    ///
    /// Returns as soon as the run exists; later failures surface as progress
    /// events only.
    pub async fn start_clip_run(&self, request: ProcessVideoRequest) -> PipelineResult<RunId> {
        request.validate().map_err(PipelineError::input)?;
        let transcriber = self
            .collaborators
            .transcribers
            .get(&request.transcription_method)
            .cloned()
            .ok_or_else(|| {
                PipelineError::input(format!(
                    "Transcription method '{}' is not available",
                    request.transcription_method.as_str()
                ))
            })?;

        let ctx = self.create_run(RunMode::Clips, "clip_run").await;
        let id = ctx.id.clone();
        let scorer = self.scorer.clone();

        let span = ctx.logger.create_span();
        tokio::spawn(
            async move {
                ctx.logger.log_start(&request.source_url);
                let result = clips::run(&ctx, &request, transcriber, &scorer).await;
                ctx.finish(result).await;
            }
            .instrument(span),
        );

        Ok(id)
    }

    /// Validate a script request, create its run and start it in the background.
    pub async fn start_script_run(&self, request: GenerateVideoRequest) -> PipelineResult<RunId> {
        request.validate().map_err(PipelineError::input)?;
        let footage = self
            .collaborators
            .footage
            .clone()
            .ok_or_else(|| PipelineError::input("Stock footage is not configured"))?;

        let ctx = self.create_run(RunMode::Script, "script_run").await;
        let id = ctx.id.clone();

        let span = ctx.logger.create_span();
        tokio::spawn(
            async move {
                ctx.logger.log_start(request.title.as_deref().unwrap_or("untitled"));
                let result = script::run(&ctx, request, footage).await;
                ctx.finish(result).await;
            }
            .instrument(span),
        );

        Ok(id)
    }

    /// Segment free text into scenes without starting a run.
    pub async fn parse_script(&self, request: &ParseScriptRequest) -> PipelineResult<ParsedScript> {
        request.validate().map_err(PipelineError::input)?;
        let segments = self.collaborators.segmenter.segment(&request.script).await?;
        Ok(into_parsed_script(None, segments))
    }

    async fn create_run(&self, mode: RunMode, operation: &str) -> Arc<RunContext> {
        let id = self.registry.create(mode).await;
        let cancel = self.registry.cancel_flag(&id).await.unwrap_or_default();
        metrics::record_run_started(mode.as_str());

        Arc::new(RunContext {
            work_dir: self.config.work_dir.join(id.as_str()),
            logger: RunLogger::new(&id, operation),
            id,
            mode,
            registry: self.registry.clone(),
            collaborators: self.collaborators.clone(),
            config: self.config.clone(),
            cancel,
            tracker: Mutex::new(StageTracker::seeded(Stage::Init, 0)),
            started: Instant::now(),
        })
    }
}
