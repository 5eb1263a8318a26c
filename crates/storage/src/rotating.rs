// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rotating output file.
//!
//! Records are appended to one file per time bucket:
//!   `<base_dir>/<collection>/<collection><bucket><extension><temp_extension>`
//!
//! When the bucket rolls over (or on shutdown) the open file is closed and
//! renamed to drop the temporary extension. Finalization never overwrites an
//! existing file: on collision it probes `_00`..`_99` suffixes before the
//! extension.

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDateTime, Timelike};
use parking_lot::ReentrantMutex;
use serde::Deserialize;
use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of numbered names tried before a finalized file is left under its
/// temporary name.
pub const MAX_COLLISION_SUFFIXES: u32 = 100;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bucket interval must be between 1 and 60 minutes, got {0}")]
    InvalidInterval(u32),

    #[error("invalid filename time format: {0:?}")]
    InvalidTimeFormat(String),
}

impl OutputError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> Self + 'a {
        move |source| OutputError::Io { action, path: path.to_path_buf(), source }
    }
}

/// Output settings, read from the `[output]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
    pub extension: String,
    pub temp_extension: String,
    pub bucket_minutes: u32,
    pub filename_time_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            extension: ".json".to_string(),
            temp_extension: ".tmp".to_string(),
            bucket_minutes: 10,
            filename_time_format: "%Y%m%d_%H%M".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<(), OutputError> {
        if self.bucket_minutes == 0 || self.bucket_minutes > 60 {
            return Err(OutputError::InvalidInterval(self.bucket_minutes));
        }
        let has_error =
            StrftimeItems::new(&self.filename_time_format).any(|item| matches!(item, Item::Error));
        if has_error || self.filename_time_format.is_empty() {
            return Err(OutputError::InvalidTimeFormat(self.filename_time_format.clone()));
        }
        Ok(())
    }
}

struct OpenFile {
    path: PathBuf,
    file: File,
}

struct Inner {
    config: OutputConfig,
    collection_name: String,
    /// `<base_dir>/<collection>/<collection>`
    base_filename: PathBuf,
    current: Option<OpenFile>,
}

/// Thread-safe, time-windowed append file.
///
/// Every public operation holds a reentrant lock for its whole duration, so
/// a rotation triggered from `write` and an explicit `finalize` from a
/// shutdown path never interleave.
pub struct RotatingOutputFile {
    inner: ReentrantMutex<RefCell<Inner>>,
}

impl RotatingOutputFile {
    /// Create a writer for `collection_name`, creating its directory.
    pub fn new(config: OutputConfig, collection_name: &str) -> Result<Self, OutputError> {
        config.validate()?;
        let base_dir = config.base_dir.clone();
        let inner = Inner {
            config,
            collection_name: String::new(),
            base_filename: PathBuf::new(),
            current: None,
        };
        let output = Self { inner: ReentrantMutex::new(RefCell::new(inner)) };
        output.set_collection(base_dir, collection_name)?;
        Ok(output)
    }

    /// Point the writer at a new base directory and/or collection.
    ///
    /// Recomputes the base filename and eagerly creates the destination
    /// directory when either changed. An already open file keeps its name
    /// until the next rotation.
    pub fn set_collection(
        &self,
        base_dir: impl Into<PathBuf>,
        collection_name: &str,
    ) -> Result<(), OutputError> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let base_dir = base_dir.into();

        let changed = inner.config.base_dir != base_dir
            || inner.collection_name != collection_name
            || inner.base_filename.as_os_str().is_empty();
        if !changed {
            return Ok(());
        }

        let dir = base_dir.join(collection_name);
        fs::create_dir_all(&dir).map_err(OutputError::io("create directory", &dir))?;

        inner.base_filename = dir.join(collection_name);
        inner.config.base_dir = base_dir;
        inner.collection_name = collection_name.to_string();
        Ok(())
    }

    /// Bucket timestamp string for `timestamp`, e.g. `19971030_1230`.
    pub fn bucket_string(&self, timestamp: NaiveDateTime) -> String {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner.bucket_string(timestamp)
    }

    /// Full path of the file holding `timestamp`, optionally with the
    /// temporary extension appended.
    pub fn filename_for(&self, timestamp: NaiveDateTime, temp: bool) -> PathBuf {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner.filename_for(timestamp, temp)
    }

    /// Append `line` to the bucket containing the current local time.
    pub fn write(&self, line: &str) -> Result<(), OutputError> {
        self.write_at(line, Local::now().naive_local())
    }

    /// Append `line` plus a newline to the bucket containing `timestamp`,
    /// rotating first if that bucket is not the open one.
    pub fn write_at(&self, line: &str, timestamp: NaiveDateTime) -> Result<(), OutputError> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        let name = inner.filename_for(timestamp, true);
        let needs_open = match &inner.current {
            Some(open) => open.path != name,
            None => true,
        };
        if needs_open {
            inner.end_file()?;
            inner.start_file(name)?;
        }

        let Some(open) = inner.current.as_mut() else {
            return Ok(());
        };
        writeln!(open.file, "{}", line).map_err(OutputError::io("write", &open.path))
    }

    /// Close the open file and rename it to its final name.
    ///
    /// Returns the path the data ended up at, or `None` if nothing was open.
    pub fn finalize(&self) -> Result<Option<PathBuf>, OutputError> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.end_file()
    }

    /// Path of the currently open (temporary) file.
    pub fn current_path(&self) -> Option<PathBuf> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner.current.as_ref().map(|open| open.path.clone())
    }
}

impl Drop for RotatingOutputFile {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            tracing::warn!(error = %e, "failed to finalize output file on drop");
        }
    }
}

impl Inner {
    fn bucket_string(&self, timestamp: NaiveDateTime) -> String {
        let interval = self.config.bucket_minutes.max(1);
        let minute = timestamp.minute() / interval * interval;
        let bucket = timestamp
            .with_minute(minute)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(timestamp);
        bucket.format(&self.config.filename_time_format).to_string()
    }

    fn filename_for(&self, timestamp: NaiveDateTime, temp: bool) -> PathBuf {
        let mut name = self.base_filename.clone().into_os_string();
        name.push(self.bucket_string(timestamp));
        name.push(&self.config.extension);
        if temp {
            name.push(&self.config.temp_extension);
        }
        PathBuf::from(name)
    }

    fn start_file(&mut self, path: PathBuf) -> Result<(), OutputError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(OutputError::io("open", &path))?;
        tracing::debug!(path = %path.display(), "opened output file");
        self.current = Some(OpenFile { path, file });
        Ok(())
    }

    fn end_file(&mut self) -> Result<Option<PathBuf>, OutputError> {
        let Some(open) = self.current.take() else {
            return Ok(None);
        };
        let OpenFile { path, mut file } = open;
        file.flush().map_err(OutputError::io("flush", &path))?;
        drop(file);

        let temp_ext = self.config.temp_extension.as_str();
        let path_str = path.to_string_lossy().into_owned();
        let Some(final_str) =
            path_str.strip_suffix(temp_ext).filter(|_| !temp_ext.is_empty())
        else {
            return Ok(Some(path));
        };
        let final_path = PathBuf::from(final_str);

        let Some(target) = self.free_name(&final_path) else {
            tracing::warn!(
                path = %path.display(),
                "no free name for finalized output file after {} attempts, leaving it in place",
                MAX_COLLISION_SUFFIXES
            );
            return Ok(Some(path));
        };

        fs::rename(&path, &target).map_err(OutputError::io("rename", &path))?;
        tracing::debug!(path = %target.display(), "finalized output file");
        Ok(Some(target))
    }

    /// First of `final_path`, `<stem>_00<ext>`, .. `<stem>_99<ext>` that does
    /// not exist.
    fn free_name(&self, final_path: &Path) -> Option<PathBuf> {
        if !final_path.exists() {
            return Some(final_path.to_path_buf());
        }

        let final_str = final_path.to_string_lossy();
        let ext = self.config.extension.as_str();
        let stem = final_str.strip_suffix(ext).unwrap_or(&final_str);
        let ext = if final_str.ends_with(ext) { ext } else { "" };

        (0..MAX_COLLISION_SUFFIXES)
            .map(|n| PathBuf::from(format!("{}_{:02}{}", stem, n, ext)))
            .find(|candidate| !candidate.exists())
    }
}

#[cfg(test)]
#[path = "rotating_tests.rs"]
mod tests;
