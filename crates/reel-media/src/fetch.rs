//! Source media fetching using yt-dlp.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use reel_models::extract_source_id;

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Which stream of the source to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Audio only, for transcription
    Audio,
    /// Full video with audio, for rendering
    Video,
}

impl MediaKind {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }
}

/// Resolves a source reference to a local media file.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &str, kind: MediaKind) -> MediaResult<PathBuf>;

    /// Human-readable title of the source, when the backend can tell.
    async fn title(&self, _source: &str) -> MediaResult<Option<String>> {
        Ok(None)
    }
}

/// [`SourceFetcher`] backed by the yt-dlp CLI.
///
/// Files are cached under `cache_dir` by source id and reused on later runs.
/// Each download lands in its own partial file and is renamed into place, so
/// concurrent runs on one source never write the same path.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    cache_dir: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Stable cache file for a source and kind.
    pub fn cache_path(&self, source: &str, kind: MediaKind) -> PathBuf {
        let id = extract_source_id(source).unwrap_or_else(|| {
            let mut hasher = DefaultHasher::new();
            source.trim().hash(&mut hasher);
            format!("src_{:016x}", hasher.finish())
        });
        let suffix = match kind {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        };
        self.cache_dir
            .join(format!("{}_{}.{}", id, suffix, kind.extension()))
    }

    /// Unique sibling of `output` for one download attempt.
    ///
    /// Keeps the media extension last so the audio template still resolves.
    fn partial_path(output: &Path, kind: MediaKind) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let nonce = Uuid::new_v4().simple().to_string();
        output.with_file_name(format!("{}.part-{}.{}", stem, &nonce[..12], kind.extension()))
    }

    fn build_args(source: &str, kind: MediaKind, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = match kind {
            MediaKind::Audio => vec![
                "-x".into(),
                "--audio-format".into(),
                "mp3".into(),
                "--audio-quality".into(),
                "128K".into(),
            ],
            MediaKind::Video => vec![
                "-f".into(),
                "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best"
                    .into(),
                "--merge-output-format".into(),
                "mp4".into(),
                "--retries".into(),
                "3".into(),
            ],
        };
        args.push("--no-playlist".into());
        args.push("-o".into());
        // yt-dlp picks the extension itself for audio extraction
        let template = match kind {
            MediaKind::Audio => output.with_extension("%(ext)s"),
            MediaKind::Video => output.to_path_buf(),
        };
        args.push(template.to_string_lossy().to_string());
        args.push(source.to_string());
        args
    }
}

#[async_trait]
impl SourceFetcher for YtDlpFetcher {
    async fn fetch(&self, source: &str, kind: MediaKind) -> MediaResult<PathBuf> {
        let output_path = self.cache_path(source, kind);

        if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            info!("Using existing {:?} file: {}", kind, output_path.display());
            return Ok(output_path);
        }

        check_ytdlp()?;
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        info!(
            source = %source,
            kind = ?kind,
            "Downloading to {}",
            output_path.display()
        );

        let partial = Self::partial_path(&output_path, kind);
        let output = Command::new("yt-dlp")
            .args(Self::build_args(source, kind, &partial))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            tokio::fs::remove_file(&partial).await.ok();
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let error_msg = stderr.lines().last().unwrap_or("Unknown error");
            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                error_msg
            )));
        }

        if !tokio::fs::try_exists(&partial).await.unwrap_or(false) {
            return Err(MediaError::download_failed("Output file not created"));
        }
        tokio::fs::rename(&partial, &output_path).await?;

        let size = tokio::fs::metadata(&output_path).await?.len();
        info!(
            output = %output_path.display(),
            size_mb = size as f64 / (1024.0 * 1024.0),
            "Downloaded source successfully"
        );

        Ok(output_path)
    }

    async fn title(&self, source: &str) -> MediaResult<Option<String>> {
        check_ytdlp()?;

        let output = Command::new("yt-dlp")
            .args(["--print", "title", "--no-playlist", source])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Ok(None);
        }

        let title = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!title.is_empty()).then_some(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_uses_source_id() {
        let fetcher = YtDlpFetcher::new("/cache");
        assert_eq!(
            fetcher.cache_path("https://youtu.be/dQw4w9WgXcQ", MediaKind::Audio),
            PathBuf::from("/cache/dQw4w9WgXcQ_audio.mp3")
        );
        assert_eq!(
            fetcher.cache_path("https://www.youtube.com/watch?v=dQw4w9WgXcQ", MediaKind::Video),
            PathBuf::from("/cache/dQw4w9WgXcQ_video.mp4")
        );
    }

    #[test]
    fn test_cache_path_is_stable_without_id() {
        let fetcher = YtDlpFetcher::new("/cache");
        let a = fetcher.cache_path("https://example.com/talk", MediaKind::Video);
        let b = fetcher.cache_path("https://example.com/talk", MediaKind::Video);
        assert_eq!(a, b);
        assert!(a.to_string_lossy().contains("src_"));
    }

    #[test]
    fn test_cache_path_distinguishes_other_hosts() {
        let fetcher = YtDlpFetcher::new("/cache");
        let one = fetcher.cache_path(
            "https://media.example.com/lecture-part-one.mp4",
            MediaKind::Video,
        );
        let two = fetcher.cache_path(
            "https://media.example.com/lecture-part-two.mp4",
            MediaKind::Video,
        );
        assert_ne!(one, two);
        assert!(one.to_string_lossy().contains("src_"));
        assert!(two.to_string_lossy().contains("src_"));
    }

    #[test]
    fn test_partial_paths_are_unique_per_download() {
        let output = Path::new("/cache/dQw4w9WgXcQ_audio.mp3");
        let a = YtDlpFetcher::partial_path(output, MediaKind::Audio);
        let b = YtDlpFetcher::partial_path(output, MediaKind::Audio);
        assert_ne!(a, b);
        assert_eq!(a.parent(), output.parent());
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mp3"));
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("dQw4w9WgXcQ_audio.part-"));
    }

    #[test]
    fn test_audio_args_use_extension_template() {
        let args = YtDlpFetcher::build_args(
            "https://youtu.be/dQw4w9WgXcQ",
            MediaKind::Audio,
            Path::new("/cache/x_audio.mp3"),
        );
        assert!(args.contains(&"-x".to_string()));
        assert!(args.contains(&"/cache/x_audio.%(ext)s".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_existing_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::new(dir.path());
        let path = fetcher.cache_path("https://youtu.be/dQw4w9WgXcQ", MediaKind::Video);
        tokio::fs::write(&path, b"cached").await.unwrap();

        let fetched = fetcher
            .fetch("https://youtu.be/dQw4w9WgXcQ", MediaKind::Video)
            .await
            .unwrap();
        assert_eq!(fetched, path);
    }
}
