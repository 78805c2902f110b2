//! Local persistence of the last result and the preferred language.
//!
//! Two files under one directory:
//!
//! - `results.json`: the most recent [`AnalysisResult`], pretty-printed
//! - `language`: `english` or `arabic`
//!
//! Writes go through a temporary file in the same directory and are renamed
//! into place, so a crash never leaves a half-written entry. A corrupt or
//! unreadable entry is logged and treated as absent.

use crate::error::StudyGuardianError;
use crate::output::AnalysisResult;
use crate::pipeline::input::Language;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const RESULTS_FILE: &str = "results.json";
const LANGUAGE_FILE: &str = "language";

/// Directory-backed store for the last study guide and language choice.
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StudyGuardianError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StudyGuardianError::CacheIo {
            path: dir.clone(),
            source: e,
        })?;
        debug!("Result cache at {}", dir.display());
        Ok(Self { dir })
    }

    /// Open the per-user default directory, see [`ResultCache::default_dir`].
    pub fn open_default() -> Result<Self, StudyGuardianError> {
        Self::open(Self::default_dir())
    }

    /// Default cache directory.
    ///
    /// `$STUDY_GUARDIAN_CACHE_DIR` when set, otherwise `study-guardian` under
    /// the platform cache directory (`~/.cache` on Linux, `~/Library/Caches`
    /// on macOS, `%LOCALAPPDATA%` on Windows).
    pub fn default_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("STUDY_GUARDIAN_CACHE_DIR").filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }

        let base = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir);

        base.join("study-guardian")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replace the stored result.
    pub fn store_result(&self, result: &AnalysisResult) -> Result<(), StudyGuardianError> {
        let json = serde_json::to_vec_pretty(result)
            .map_err(|e| StudyGuardianError::Internal(format!("serialise result: {e}")))?;
        self.write_atomic(RESULTS_FILE, &json)
    }

    /// The stored result, if there is a readable one.
    pub fn load_result(&self) -> Option<AnalysisResult> {
        let path = self.dir.join(RESULTS_FILE);
        let bytes = read_if_present(&path)?;
        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Remove the stored result. Missing is not an error.
    pub fn clear_result(&self) -> Result<(), StudyGuardianError> {
        let path = self.dir.join(RESULTS_FILE);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StudyGuardianError::CacheIo { path, source: e }),
        }
    }

    pub fn store_language(&self, language: Language) -> Result<(), StudyGuardianError> {
        self.write_atomic(LANGUAGE_FILE, language.as_str().as_bytes())
    }

    /// The stored language; unknown values fall back to `None`.
    pub fn load_language(&self) -> Option<Language> {
        let path = self.dir.join(LANGUAGE_FILE);
        let bytes = read_if_present(&path)?;
        let text = String::from_utf8_lossy(&bytes);
        match text.parse() {
            Ok(language) => Some(language),
            Err(e) => {
                warn!("Ignoring stored language in {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), StudyGuardianError> {
        let path = self.dir.join(name);
        let io_err = |source| StudyGuardianError::CacheIo {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

fn read_if_present(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            None
        }
    }
}
