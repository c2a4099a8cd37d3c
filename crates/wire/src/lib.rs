// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the shell client and the daemon.
//!
//! Requests are newline-terminated 7-bit ASCII lines: `TYPE SP ARG`, with
//! TYPE one of `CMD` (a raw command line) or `CTL` (a one-letter control:
//! `c`, `z`, `d`). Replies are an unframed byte stream by default — child
//! output is written straight to the socket — with an optional
//! sentinel-framed mode for daemon-originated messages.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod request;

pub use frame::{Decoder, FramingMode, MAX_FRAME_BYTES, PROMPT, SENTINEL_CLOSE, SENTINEL_OPEN};
pub use request::{Control, ProtocolError, Request};
