// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Config file path: CAPD_CONFIG > ./capd.toml
pub fn config_path() -> PathBuf {
    std::env::var("CAPD_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("capd.toml"))
}

/// Coordinator URL override, applied over `coordinator.base_url`.
pub fn base_url_override() -> Option<String> {
    std::env::var("CAPD_BASE_URL").ok().filter(|s| !s.is_empty())
}

/// Log filter directives: CAPD_LOG > RUST_LOG
pub fn log_filter() -> Option<String> {
    std::env::var("CAPD_LOG")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .filter(|s| !s.is_empty())
}
