// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup for the supervisor and worker processes.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "capd.log";

/// Filter from CAPD_LOG or RUST_LOG, falling back to `info` when unset or
/// unparseable.
pub fn env_filter() -> EnvFilter {
    crate::env::log_filter()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the supervisor's subscriber: stderr, plus a daily-rolling file
/// under `dir` when one is configured. Keep the returned guard alive until
/// exit so buffered file output is flushed.
pub fn init_supervisor(dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file, guard) = match dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry().with(env_filter()).with(stderr).with(file).try_init();
    guard
}

/// Install the worker's subscriber. Stdout carries message frames, so
/// everything goes to stderr.
pub fn init_worker() {
    let layer = fmt::layer().with_writer(std::io::stderr).with_ansi(false).with_target(false);
    let _ = tracing_subscriber::registry().with(env_filter()).with(layer).try_init();
}
