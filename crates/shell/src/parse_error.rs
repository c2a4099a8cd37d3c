// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser error types.
//!
//! The first syntactic violation wins; each variant renders one of the fixed
//! diagnostic templates the daemon relays to the client verbatim (prefixed
//! with `-yash: ` at the session layer).

use thiserror::Error;

use super::token::{MAX_TOKENS, MAX_TOKEN_BYTES};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A special token in a position where a command must begin.
    #[error("command should not start with {0}")]
    BadStart(String),

    /// An operator immediately followed by another operator.
    #[error("near token {0}")]
    NearToken(String),

    /// An operator left dangling at the end of the line.
    #[error("command should not end with {0}")]
    BadEnd(String),

    /// `&` anywhere but the final position.
    #[error("& should be the last token")]
    AmpersandNotLast,

    #[error("more than {} tokens", MAX_TOKENS)]
    TooManyTokens,

    #[error("token longer than {max} bytes: {0}", max = MAX_TOKEN_BYTES)]
    TokenTooLong(String),
}
