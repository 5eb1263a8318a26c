// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! capd-storage: time-bucketed output files for captured records

mod rotating;

pub use rotating::{OutputConfig, OutputError, RotatingOutputFile, MAX_COLLISION_SUFFIXES};
