// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Decoder, FramingMode, MAX_FRAME_BYTES, PROMPT, SENTINEL_CLOSE, SENTINEL_OPEN};
use crate::{Control, ProtocolError, Request};

#[test]
fn prompt_is_the_fixed_three_bytes() {
    assert_eq!(PROMPT, b"\n# ");
}

#[test]
fn decodes_one_line() {
    let mut dec = Decoder::new();
    dec.feed(b"CMD echo hi\n");
    assert_eq!(dec.next_request(), Some(Ok(Request::Cmd("echo hi".to_string()))));
    assert_eq!(dec.next_request(), None);
}

#[test]
fn partial_line_waits_for_more_bytes() {
    let mut dec = Decoder::new();
    dec.feed(b"CMD ec");
    assert_eq!(dec.next_request(), None);
    dec.feed(b"ho hi\nCTL c\n");
    assert_eq!(dec.next_request(), Some(Ok(Request::Cmd("echo hi".to_string()))));
    assert_eq!(dec.next_request(), Some(Ok(Request::Ctl(Control::Interrupt))));
    assert_eq!(dec.next_request(), None);
}

#[test]
fn several_lines_in_one_feed() {
    let mut dec = Decoder::new();
    dec.feed(b"CTL z\nCTL d\n");
    assert_eq!(dec.next_request(), Some(Ok(Request::Ctl(Control::Suspend))));
    assert_eq!(dec.next_request(), Some(Ok(Request::Ctl(Control::Eof))));
}

#[test]
fn strips_carriage_return() {
    let mut dec = Decoder::new();
    dec.feed(b"CMD ls\r\n");
    assert_eq!(dec.next_request(), Some(Ok(Request::Cmd("ls".to_string()))));
}

#[test]
fn oversized_line_is_dropped_and_decoding_resyncs() {
    let mut dec = Decoder::new();
    let big = vec![b'x'; MAX_FRAME_BYTES + 10];
    dec.feed(&big);
    assert!(matches!(dec.next_request(), Some(Err(ProtocolError::Oversized(_)))));
    // Rest of the oversized line still in flight, then a good one.
    dec.feed(b"tail of the monster\n");
    assert_eq!(dec.next_request(), None);
    dec.feed(b"CTL c\n");
    assert_eq!(dec.next_request(), Some(Ok(Request::Ctl(Control::Interrupt))));
}

#[test]
fn non_ascii_line_is_dropped() {
    let mut dec = Decoder::new();
    dec.feed(b"CMD caf\xc3\xa9\nCTL d\n");
    assert_eq!(dec.next_request(), Some(Err(ProtocolError::NotAscii)));
    assert_eq!(dec.next_request(), Some(Ok(Request::Ctl(Control::Eof))));
}

#[test]
fn malformed_line_does_not_poison_the_stream() {
    let mut dec = Decoder::new();
    dec.feed(b"BOGUS x\nCMD ls\n");
    assert!(matches!(dec.next_request(), Some(Err(ProtocolError::Malformed(_)))));
    assert_eq!(dec.next_request(), Some(Ok(Request::Cmd("ls".to_string()))));
}

#[test]
fn line_mode_passes_payload_through() {
    let out = FramingMode::Line.encode_reply(b"-yash: near token |\n");
    assert_eq!(out, b"-yash: near token |\n");
}

#[test]
fn sentinel_mode_wraps_payload() {
    let out = FramingMode::Sentinel.encode_reply(b"hello");
    assert_eq!(&out[..2], &SENTINEL_OPEN);
    assert_eq!(&out[2..7], b"hello");
    assert_eq!(&out[7..], &SENTINEL_CLOSE);
}
