//! End-to-end runs against in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use reel_media::{
    MediaError, MediaKind, MediaResult, MediaTransform, Narrator, SourceFetcher, Transcriber,
    TransformOp,
};
use reel_models::{
    AspectFormat, GenerateVideoRequest, ParseScriptRequest, ProcessVideoRequest, ProgressEvent,
    RunId, RunPayload, RunStatus, Scene, Stage, TranscriptWord, TranscriptionMethod,
};
use reel_pipeline::{
    Collaborators, FootageSource, MusicSource, PipelineConfig, PipelineError, PipelineResult,
    StagePipeline,
};
use reel_session::SessionRegistry;

struct FakeFetcher {
    dir: PathBuf,
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, _source: &str, kind: MediaKind) -> MediaResult<PathBuf> {
        let path = self.dir.join(format!("source.{}", kind.extension()));
        tokio::fs::write(&path, b"media").await?;
        Ok(path)
    }

    async fn title(&self, _source: &str) -> MediaResult<Option<String>> {
        Ok(Some("Demo Talk".to_string()))
    }
}

struct FakeTranscriber {
    words: Vec<TranscriptWord>,
    delay: Duration,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &Path) -> MediaResult<Vec<TranscriptWord>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.words.clone())
    }
}

/// Writes every output file and records the operations it saw.
#[derive(Default)]
struct FakeTransform {
    ops: Mutex<Vec<String>>,
    /// Fail crop/scale ops whose output file name contains this
    fail_output: Option<String>,
    fail_mix: bool,
}

#[async_trait]
impl MediaTransform for FakeTransform {
    async fn apply(&self, op: TransformOp) -> MediaResult<PathBuf> {
        self.ops.lock().unwrap().push(op.name().to_string());
        let output = op.output().to_path_buf();
        let name = output.file_name().unwrap().to_string_lossy().into_owned();

        if let TransformOp::CropScale { .. } = &op {
            if let Some(marker) = &self.fail_output {
                if name.contains(marker.as_str()) {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    return Err(MediaError::ffmpeg_failed("encoder crashed", None, Some(1)));
                }
            }
        }
        if matches!(op, TransformOp::MixAudio { .. }) && self.fail_mix {
            return Err(MediaError::ffmpeg_failed("amix failed", None, Some(1)));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        tokio::fs::write(&output, b"rendered").await?;
        Ok(output)
    }
}

impl FakeTransform {
    fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }
}

struct FakeFootage {
    dir: PathBuf,
}

#[async_trait]
impl FootageSource for FakeFootage {
    async fn acquire(
        &self,
        _query: &str,
        orientation: &str,
        _dest_dir: &Path,
        index: usize,
    ) -> PipelineResult<PathBuf> {
        let path = self.dir.join(format!("stock_{orientation}_{index}.mp4"));
        tokio::fs::write(&path, b"stock").await?;
        Ok(path)
    }
}

struct FakeNarrator;

#[async_trait]
impl Narrator for FakeNarrator {
    async fn narrate(
        &self,
        _text: &str,
        _voice: Option<&str>,
        output: &Path,
    ) -> MediaResult<PathBuf> {
        tokio::fs::write(output, b"voice").await?;
        Ok(output.to_path_buf())
    }
}

struct FakeMusic {
    track: PathBuf,
}

#[async_trait]
impl MusicSource for FakeMusic {
    async fn pick(&self) -> PipelineResult<Option<PathBuf>> {
        Ok(Some(self.track.clone()))
    }
}

/// One 20s sentence per entry, spaced far enough apart to form its own window.
fn spaced_sentences(texts: &[&str]) -> Vec<TranscriptWord> {
    let mut words = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        let start = i as u64 * 100_000;
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let step = 20_000 / tokens.len() as u64;
        for (j, token) in tokens.iter().enumerate() {
            let s = start + j as u64 * step;
            words.push(TranscriptWord::new(*token, s, s + step));
        }
    }
    words
}

struct Harness {
    _dir: TempDir,
    pipeline: StagePipeline,
    registry: Arc<SessionRegistry>,
    transform: Arc<FakeTransform>,
}

fn harness(words: Vec<TranscriptWord>, transform: FakeTransform, max_clips: usize) -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = dir.path().to_path_buf();
    std::fs::create_dir_all(root.join("stock")).unwrap();
    std::fs::write(root.join("music.mp3"), b"music").unwrap();

    let config = PipelineConfig {
        work_dir: root.join("work"),
        clips_dir: root.join("clips"),
        outputs_dir: root.join("outputs"),
        max_clips,
        ..Default::default()
    };

    let transform = Arc::new(transform);
    let collaborators = Collaborators::new(
        Arc::new(FakeFetcher { dir: root.clone() }),
        transform.clone(),
    )
    .with_transcriber(
        TranscriptionMethod::Whisper,
        Arc::new(FakeTranscriber {
            words,
            delay: Duration::from_millis(50),
        }),
    )
    .with_footage(Arc::new(FakeFootage {
        dir: root.join("stock"),
    }))
    .with_narrator(Arc::new(FakeNarrator))
    .with_music(Arc::new(FakeMusic {
        track: root.join("music.mp3"),
    }));

    let registry = Arc::new(SessionRegistry::default());
    let pipeline = StagePipeline::new(registry.clone(), collaborators, config);

    Harness {
        _dir: dir,
        pipeline,
        registry,
        transform,
    }
}

fn clip_request() -> ProcessVideoRequest {
    ProcessVideoRequest {
        source_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        transcription_method: TranscriptionMethod::Whisper,
        format: AspectFormat::Portrait,
        language: None,
    }
}

/// Subscribe and collect events up to and including the terminal one.
async fn collect_events(registry: &SessionRegistry, id: &RunId) -> Vec<ProgressEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry
        .channel()
        .subscribe(id, tx)
        .await
        .expect("run should exist");

    let mut events = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "run did not finish: {events:?}");
    events
}

fn assert_monotone(events: &[ProgressEvent]) {
    let live: Vec<&ProgressEvent> = events.iter().filter(|e| e.stage != Stage::Error).collect();
    for pair in live.windows(2) {
        assert!(
            pair[0].percent <= pair[1].percent,
            "percent went backwards: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
        assert!(pair[0].stage.order() <= pair[1].stage.order());
    }
}

#[tokio::test]
async fn test_clip_run_completes_with_ranked_clips() {
    let words = spaced_sentences(&[
        "this is a calm and ordinary part of the talk about nothing.",
        "here is the secret that nobody tells you about it?",
        "and then we wrapped up with some final closing notes.",
    ]);
    let h = harness(words, FakeTransform::default(), 3);

    let id = h.pipeline.start_clip_run(clip_request()).await.unwrap();
    let events = collect_events(&h.registry, &id).await;

    assert_monotone(&events);

    let terminal = events.last().unwrap();
    assert_eq!(terminal.stage, Stage::Complete);
    assert_eq!(terminal.percent, 100);

    let Some(RunPayload::Clips(set)) = &terminal.payload else {
        panic!("expected clip payload, got {:?}", terminal.payload);
    };
    assert_eq!(set.title, "Demo Talk");
    assert_eq!(set.clips.len(), 3);
    assert_eq!(set.clips[0].virality_score, 88);
    assert!(set.clips[0].title.starts_with("here is the secret"));
    assert_eq!(set.clips[0].id, format!("clip_{}_1", id));
    assert_eq!(set.clips[0].url, format!("/clips/clip_{}_1.mp4", id));
    assert_eq!(set.clips[0].transcript[0].start_time, 0.0);

    let rendering: Vec<u8> = events
        .iter()
        .filter(|e| e.stage == Stage::Rendering)
        .map(|e| e.percent)
        .collect();
    assert_eq!(rendering, vec![70, 80, 90]);

    let run = h.registry.get(&id).await.unwrap();
    assert_eq!(run.status, RunStatus::Complete);
    assert!(run.result.is_some());
}

#[tokio::test]
async fn test_render_failure_fails_whole_run() {
    let words = spaced_sentences(&[
        "first plain sentence for a window of twenty seconds.",
        "second plain sentence for a window of twenty seconds.",
        "third plain sentence for a window of twenty seconds.",
        "fourth plain sentence for a window of twenty seconds.",
        "fifth plain sentence for a window of twenty seconds.",
    ]);
    let transform = FakeTransform {
        fail_output: Some("_2.mp4".to_string()),
        ..Default::default()
    };
    let h = harness(words, transform, 5);

    let id = h.pipeline.start_clip_run(clip_request()).await.unwrap();
    let events = collect_events(&h.registry, &id).await;

    let terminal = events.last().unwrap();
    assert_eq!(terminal.stage, Stage::Error);
    assert_eq!(terminal.percent, 0);
    assert!(terminal.payload.is_none());
    assert!(
        terminal.message.starts_with("Error: Render task 1 failed"),
        "{}",
        terminal.message
    );

    // Tasks past the first batch never started
    let crops = h.transform.ops().iter().filter(|op| *op == "crop_scale").count();
    assert!(crops <= 3, "crop ops: {crops}");

    let run = h.registry.get(&id).await.unwrap();
    assert_eq!(run.status, RunStatus::Error);
    assert!(run.result.is_none());
}

#[tokio::test]
async fn test_short_transcript_reports_no_candidates() {
    let words = vec![
        TranscriptWord::new("I", 0, 600),
        TranscriptWord::new("love.", 600, 1200),
        TranscriptWord::new("Why", 1200, 1700),
        TranscriptWord::new("not?", 1700, 2200),
    ];
    let h = harness(words, FakeTransform::default(), 3);

    let id = h.pipeline.start_clip_run(clip_request()).await.unwrap();
    let events = collect_events(&h.registry, &id).await;

    let terminal = events.last().unwrap();
    assert_eq!(terminal.stage, Stage::Error);
    assert!(terminal.message.contains("No clip candidates found"));
    assert!(events.iter().any(|e| e.stage == Stage::Analyzing));
    assert!(h.transform.ops().is_empty());
}

#[tokio::test]
async fn test_late_subscriber_gets_terminal_event() {
    let h = harness(Vec::new(), FakeTransform::default(), 3);
    let id = h.pipeline.start_clip_run(clip_request()).await.unwrap();

    for _ in 0..200 {
        if h.registry.get(&id).await.is_some_and(|r| r.is_terminal()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let events = collect_events(&h.registry, &id).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].stage, Stage::Error);
}

#[tokio::test]
async fn test_late_subscriber_gets_completion() {
    let words = spaced_sentences(&["one window that renders without any trouble at all."]);
    let h = harness(words, FakeTransform::default(), 3);
    let id = h.pipeline.start_clip_run(clip_request()).await.unwrap();

    for _ in 0..200 {
        if h.registry.get(&id).await.is_some_and(|r| r.is_terminal()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let events = collect_events(&h.registry, &id).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].stage, Stage::Complete);
    assert_eq!(events[0].percent, 100);
    assert!(matches!(&events[0].payload, Some(RunPayload::Clips(set)) if set.clips.len() == 1));
}

#[tokio::test]
async fn test_runs_never_share_rendered_clips() {
    let words = spaced_sentences(&["one window that renders without any trouble at all."]);
    let h = harness(words, FakeTransform::default(), 3);

    let mut urls = Vec::new();
    for _ in 0..2 {
        let id = h.pipeline.start_clip_run(clip_request()).await.unwrap();
        let events = collect_events(&h.registry, &id).await;
        let Some(RunPayload::Clips(set)) = &events.last().unwrap().payload else {
            panic!("expected clip payload, got {:?}", events.last());
        };
        assert!(set.clips[0].id.contains(id.as_str()));
        urls.push(set.clips[0].url.clone());
    }

    assert_ne!(urls[0], urls[1]);
    let crops = h.transform.ops().iter().filter(|op| *op == "crop_scale").count();
    assert_eq!(crops, 2);
}

#[tokio::test]
async fn test_cancelled_run_ends_with_error() {
    let words = spaced_sentences(&["a window that would otherwise be rendered just fine."]);
    let h = harness(words, FakeTransform::default(), 3);

    let id = h.pipeline.start_clip_run(clip_request()).await.unwrap();
    assert!(h.registry.cancel(&id).await);

    let events = collect_events(&h.registry, &id).await;
    let terminal = events.last().unwrap();
    assert_eq!(terminal.stage, Stage::Error);
    assert_eq!(terminal.message, "Error: Run cancelled");
    assert!(h.transform.ops().is_empty());
}

#[tokio::test]
async fn test_invalid_requests_are_rejected_before_a_run_exists() {
    let h = harness(Vec::new(), FakeTransform::default(), 3);

    let mut bad_url = clip_request();
    bad_url.source_url = "ftp://example.com/video".to_string();
    let err = h.pipeline.start_clip_run(bad_url).await.unwrap_err();
    assert!(err.is_input_error());

    let mut unavailable = clip_request();
    unavailable.transcription_method = TranscriptionMethod::AssemblyAi;
    let err = h.pipeline.start_clip_run(unavailable).await.unwrap_err();
    assert!(matches!(err, PipelineError::Input(_)));

    let err = h
        .pipeline
        .start_script_run(GenerateVideoRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_input_error());

    assert!(h.registry.is_empty().await);
}

fn scene(narration: &str, duration_sec: f64) -> Scene {
    Scene {
        narration: narration.to_string(),
        keywords: vec!["city".to_string()],
        duration_sec,
        description: None,
    }
}

#[tokio::test]
async fn test_script_run_produces_video() {
    let h = harness(Vec::new(), FakeTransform::default(), 3);
    let request = GenerateVideoRequest {
        scenes: Some(vec![
            scene("The city never sleeps.", 4.0),
            scene("Lights flicker on every corner.", 12.0),
        ]),
        title: Some("Night City".to_string()),
        format: AspectFormat::Landscape,
        ..Default::default()
    };

    let id = h.pipeline.start_script_run(request).await.unwrap();
    let events = collect_events(&h.registry, &id).await;
    assert_monotone(&events);

    let terminal = events.last().unwrap();
    assert_eq!(terminal.stage, Stage::Complete);
    let Some(RunPayload::Video(video)) = &terminal.payload else {
        panic!("expected video payload, got {:?}", terminal.payload);
    };
    assert_eq!(video.title, "Night City");
    assert_eq!(video.video_url, format!("/outputs/video_{}.mp4", id));

    let ops = h.transform.ops();
    assert_eq!(ops.iter().filter(|op| *op == "trim").count(), 2);
    assert!(ops.ends_with(&[
        "concat".to_string(),
        "mux_audio".to_string(),
        "mix_audio".to_string()
    ]));

    let stages: Vec<Stage> = events.iter().map(|e| e.stage).collect();
    for stage in [
        Stage::Parsing,
        Stage::Narrating,
        Stage::Rendering,
        Stage::Assembling,
        Stage::Mixing,
        Stage::Finalizing,
    ] {
        assert!(stages.contains(&stage), "missing {stage}");
    }
}

#[tokio::test]
async fn test_script_run_survives_mix_failure() {
    let transform = FakeTransform {
        fail_mix: true,
        ..Default::default()
    };
    let h = harness(Vec::new(), transform, 3);
    let request = GenerateVideoRequest {
        script: Some("A quiet morning settles over the harbor town.".to_string()),
        ..Default::default()
    };

    let id = h.pipeline.start_script_run(request).await.unwrap();
    let events = collect_events(&h.registry, &id).await;

    let terminal = events.last().unwrap();
    assert_eq!(terminal.stage, Stage::Complete, "{}", terminal.message);
    let Some(RunPayload::Video(video)) = &terminal.payload else {
        panic!("expected video payload");
    };
    assert_eq!(video.title, "A quiet morning settles over the harbor town");
}

#[tokio::test]
async fn test_parse_script() {
    let h = harness(Vec::new(), FakeTransform::default(), 3);
    let parsed = h
        .pipeline
        .parse_script(&ParseScriptRequest {
            script: "Coffee is brewing in the kitchen, and the radio plays softly.".to_string(),
            language: None,
        })
        .await
        .unwrap();

    assert_eq!(parsed.scenes.len(), 2);
    assert_eq!(parsed.title, "Coffee is brewing in the kitchen");
    assert_eq!(parsed.total_duration, 5.0);

    let err = h
        .pipeline
        .parse_script(&ParseScriptRequest {
            script: "  ".to_string(),
            language: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_input_error());
}
