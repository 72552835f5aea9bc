//! Screenshot artifacts.
//!
//! Failure screenshots land in a single output directory. Names are
//! deterministic and a save never overwrites an earlier artifact.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::result::WebcheckResult;

/// Timestamp layout for error screenshots (`yyyyMMddHHmmss`)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Output directory for failure screenshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store writing into `dir` (created lazily on first save)
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{test}_error_{yyyyMMddHHmmss}.png` for the given moment
    #[must_use]
    pub fn error_screenshot_name<Tz>(test_name: &str, timestamp: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{}_error_{}.png",
            sanitize(test_name),
            timestamp.format(TIMESTAMP_FORMAT)
        )
    }

    /// Error screenshot name stamped with the local time
    #[must_use]
    pub fn error_screenshot_name_now(test_name: &str) -> String {
        Self::error_screenshot_name(test_name, &Local::now())
    }

    /// Persist `bytes` as `name`, returning the path written.
    ///
    /// If `name` is already taken, `_1`, `_2`, ... is inserted before the
    /// extension.
    pub fn save(&self, name: &str, bytes: &[u8]) -> WebcheckResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.free_path(name);
        fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact saved");
        Ok(path)
    }

    fn free_path(&self, name: &str) -> PathBuf {
        let candidate = self.dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        (1u32..)
            .map(|n| match ext {
                Some(ext) => self.dir.join(format!("{stem}_{n}.{ext}")),
                None => self.dir.join(format!("{stem}_{n}")),
            })
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new("target/webcheck")
    }
}

/// Replace characters outside `[A-Za-z0-9_.-]` with `_`
#[must_use]
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
