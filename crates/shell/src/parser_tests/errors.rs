// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use crate::{parse, ParseError};

#[parameterized(
    redirect_out = { "> out", ">" },
    redirect_in = { "< in", "<" },
    redirect_err = { "2> err", "2>" },
    pipe = { "| grep x", "|" },
)]
fn special_token_opening_a_side(line: &str, tok: &str) {
    assert_eq!(parse(line), Err(ParseError::BadStart(tok.to_string())));
}

#[parameterized(
    redirect_out = { "echo >", ">" },
    redirect_in = { "sort <", "<" },
    redirect_err = { "make 2>", "2>" },
    pipe = { "ls |", "|" },
)]
fn dangling_operator_at_end(line: &str, tok: &str) {
    assert_eq!(parse(line), Err(ParseError::BadEnd(tok.to_string())));
}

#[parameterized(
    redirect_then_pipe = { "echo > | cat", "|" },
    redirect_then_redirect = { "echo > > out", ">" },
    redirect_then_ampersand = { "echo > &", "&" },
    pipe_then_pipe = { "a | | b", "|" },
    pipe_then_redirect = { "a | < in", "<" },
    second_pipe = { "a | b | c", "|" },
)]
fn operator_followed_by_operator(line: &str, tok: &str) {
    assert_eq!(parse(line), Err(ParseError::NearToken(tok.to_string())));
}

#[parameterized(
    mid_line = { "sleep 30 & echo hi" },
    before_pipe = { "a & | b" },
    leading = { "& ls" },
)]
fn ampersand_must_be_last(line: &str) {
    assert_eq!(parse(line), Err(ParseError::AmpersandNotLast));
}

#[test]
fn first_violation_wins() {
    // Both a bad start and a dangling operator; the leftmost one reports.
    assert_eq!(parse("> out <"), Err(ParseError::BadStart(">".to_string())));
}

#[test]
fn diagnostic_templates_render_verbatim() {
    assert_eq!(
        parse("> out").unwrap_err().to_string(),
        "command should not start with >"
    );
    assert_eq!(parse("ls |").unwrap_err().to_string(), "command should not end with |");
    assert_eq!(parse("a | | b").unwrap_err().to_string(), "near token |");
    assert_eq!(
        parse("a & b").unwrap_err().to_string(),
        "& should be the last token"
    );
}
