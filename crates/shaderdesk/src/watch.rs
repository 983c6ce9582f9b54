//! mtime-polling watcher over the two shader source files.
//!
//! Change detection only reports that *something* changed; both sources are
//! re-read together so the debounced compile always sees a consistent pair.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};

use crate::defaults::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug)]
struct WatchedFile {
    path: PathBuf,
    mtime: Option<SystemTime>,
}

impl WatchedFile {
    fn read(&mut self) -> Result<String> {
        let source = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read shader '{}'", self.path.display()))?;
        self.mtime = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok();
        Ok(source)
    }

    /// True when the file's mtime moved since the last read. Transient
    /// metadata errors (editors replace files non-atomically) read as
    /// "unchanged" rather than failing the loop.
    fn changed(&self) -> bool {
        match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(mtime) => self.mtime != Some(mtime),
            Err(_) => false,
        }
    }
}

#[derive(Debug)]
pub struct SourceWatcher {
    vertex: Option<WatchedFile>,
    fragment: Option<WatchedFile>,
}

impl SourceWatcher {
    pub fn new(vertex: Option<PathBuf>, fragment: Option<PathBuf>) -> Self {
        Self {
            vertex: vertex.map(|path| WatchedFile { path, mtime: None }),
            fragment: fragment.map(|path| WatchedFile { path, mtime: None }),
        }
    }

    /// Reads both sources, recording mtimes for later change polling.
    pub fn load(&mut self) -> Result<ShaderSources> {
        let vertex = match self.vertex.as_mut() {
            Some(file) => file.read()?,
            None => DEFAULT_VERTEX_SHADER.to_string(),
        };
        let fragment = match self.fragment.as_mut() {
            Some(file) => file.read()?,
            None => DEFAULT_FRAGMENT_SHADER.to_string(),
        };
        Ok(ShaderSources { vertex, fragment })
    }

    /// Re-reads both sources if either watched file changed on disk.
    pub fn poll_changed(&mut self) -> Result<Option<ShaderSources>> {
        let changed = self
            .vertex
            .as_ref()
            .map(WatchedFile::changed)
            .unwrap_or(false)
            || self
                .fragment
                .as_ref()
                .map(WatchedFile::changed)
                .unwrap_or(false);
        if changed {
            self.load().map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, OpenOptions};
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn unwatched_sources_fall_back_to_builtins() {
        let mut watcher = SourceWatcher::new(None, None);
        let sources = watcher.load().unwrap();
        assert_eq!(sources.vertex, DEFAULT_VERTEX_SHADER);
        assert_eq!(sources.fragment, DEFAULT_FRAGMENT_SHADER);
        assert!(watcher.poll_changed().unwrap().is_none());
    }

    #[test]
    fn missing_files_error_with_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.frag");
        let mut watcher = SourceWatcher::new(None, Some(missing.clone()));
        let error = watcher.load().unwrap_err();
        assert!(error.to_string().contains("missing.frag"));
    }

    #[test]
    fn mtime_changes_trigger_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.frag");
        fs::write(&path, "void main() {}").unwrap();

        let mut watcher = SourceWatcher::new(None, Some(path.clone()));
        watcher.load().unwrap();
        assert!(watcher.poll_changed().unwrap().is_none());

        fs::write(&path, "void main() { /* edited */ }").unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(2))
            .unwrap();

        let reloaded = watcher.poll_changed().unwrap().expect("change detected");
        assert!(reloaded.fragment.contains("edited"));
        // The reload recorded the new mtime.
        assert!(watcher.poll_changed().unwrap().is_none());
    }
}
