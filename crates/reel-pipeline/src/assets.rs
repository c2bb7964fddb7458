//! Stock footage and background music sources for script runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "aac", "ogg"];

/// Finds a footage clip for a scene.
#[async_trait]
pub trait FootageSource: Send + Sync {
    /// Return a local video file matching `query`.
    ///
    /// `orientation` is one of `portrait`, `landscape` or `square`.
    /// `dest_dir` is scratch space the source may write into.
    async fn acquire(
        &self,
        query: &str,
        orientation: &str,
        dest_dir: &Path,
        index: usize,
    ) -> PipelineResult<PathBuf>;
}

/// Picks a background track, if any.
#[async_trait]
pub trait MusicSource: Send + Sync {
    async fn pick(&self) -> PipelineResult<Option<PathBuf>>;
}

/// Footage picked from a local directory.
///
/// Files whose name contains the orientation (e.g. `beach_portrait.mp4`) are
/// preferred. Among candidates the choice is a stable hash of the query, so
/// the same scene always gets the same clip.
#[derive(Debug, Clone)]
pub struct LocalFootageLibrary {
    dir: PathBuf,
}

impl LocalFootageLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FootageSource for LocalFootageLibrary {
    async fn acquire(
        &self,
        query: &str,
        orientation: &str,
        _dest_dir: &Path,
        index: usize,
    ) -> PipelineResult<PathBuf> {
        let files = list_files(&self.dir, VIDEO_EXTENSIONS).await?;
        if files.is_empty() {
            return Err(PipelineError::assembly(format!(
                "no footage found in {}",
                self.dir.display()
            )));
        }

        let oriented: Vec<&PathBuf> = files
            .iter()
            .filter(|p| file_name(p).to_lowercase().contains(orientation))
            .collect();
        let pool: Vec<&PathBuf> = if oriented.is_empty() {
            files.iter().collect()
        } else {
            oriented
        };

        let query_lower = query.to_lowercase();
        let matched: Vec<&PathBuf> = pool
            .iter()
            .copied()
            .filter(|p| {
                let stem = file_stem(p).to_lowercase();
                query_lower
                    .split_whitespace()
                    .any(|word| word.len() > 3 && stem.contains(word))
            })
            .collect();
        let pool = if matched.is_empty() { pool } else { matched };

        let mut hasher = DefaultHasher::new();
        query.hash(&mut hasher);
        index.hash(&mut hasher);
        let pick = pool[(hasher.finish() % pool.len() as u64) as usize].clone();

        debug!(query, orientation, file = %pick.display(), "Footage selected");
        Ok(pick)
    }
}

/// Background music picked from a local directory.
#[derive(Debug, Clone)]
pub struct LocalMusicLibrary {
    dir: PathBuf,
}

impl LocalMusicLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl MusicSource for LocalMusicLibrary {
    async fn pick(&self) -> PipelineResult<Option<PathBuf>> {
        let files = list_files(&self.dir, AUDIO_EXTENSIONS).await?;
        Ok(files.into_iter().next())
    }
}

/// Sorted files in `dir` with one of `extensions`. A missing dir is empty.
async fn list_files(dir: &Path, extensions: &[&str]) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e.to_lowercase().as_str()));
        if matches && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn touch(dir: &Path, name: &str) {
        tokio::fs::write(dir.join(name), b"x").await.unwrap();
    }

    #[tokio::test]
    async fn test_footage_prefers_orientation_and_query() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "city_landscape.mp4").await;
        touch(dir.path(), "city_portrait.mp4").await;
        touch(dir.path(), "ocean_portrait.mp4").await;
        touch(dir.path(), "notes.txt").await;

        let library = LocalFootageLibrary::new(dir.path());
        let pick = library
            .acquire("busy city streets", "portrait", dir.path(), 0)
            .await
            .unwrap();
        assert_eq!(file_name(&pick), "city_portrait.mp4");
    }

    #[tokio::test]
    async fn test_footage_pick_is_stable() {
        let dir = TempDir::new().unwrap();
        for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
            touch(dir.path(), name).await;
        }
        let library = LocalFootageLibrary::new(dir.path());

        let first = library.acquire("sunset", "square", dir.path(), 2).await.unwrap();
        let second = library.acquire("sunset", "square", dir.path(), 2).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_footage_dir_fails() {
        let dir = TempDir::new().unwrap();
        let library = LocalFootageLibrary::new(dir.path().join("missing"));
        let err = library
            .acquire("anything", "portrait", dir.path(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Assembly(_)));
    }

    #[tokio::test]
    async fn test_music_pick() {
        let dir = TempDir::new().unwrap();
        let library = LocalMusicLibrary::new(dir.path());
        assert!(library.pick().await.unwrap().is_none());

        touch(dir.path(), "b_track.mp3").await;
        touch(dir.path(), "a_track.wav").await;
        let pick = library.pick().await.unwrap().unwrap();
        assert_eq!(file_name(&pick), "a_track.wav");
    }
}
