// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! capd-core: shared vocabulary for the capture agent

pub mod clock;
pub mod job;
pub mod status;
pub mod terms;
pub mod ttl_cache;

pub use clock::{Clock, FakeClock, SystemClock};
pub use job::{Job, JobId, JobList, Progress};
pub use status::CaptureStatus;
pub use terms::TermSet;
pub use ttl_cache::TtlCache;
