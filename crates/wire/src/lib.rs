// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor/worker message protocol.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod message;
mod wire;

pub use message::{UpdateData, WorkerMessage};
pub use wire::{
    decode, encode, read_message, read_worker_message, write_message, write_worker_message,
    ProtocolError, MAX_MESSAGE_SIZE,
};
