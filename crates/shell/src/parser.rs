// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Left-to-right token scan into a [`Job`] descriptor.

use super::job::{Command, Job};
use super::lexer::tokenize;
use super::parse_error::ParseError;
use super::token::Token;

/// Parse one command line (trailing newline already stripped).
///
/// A line with no tokens parses to a job with an empty left argv; callers
/// treat that as "nothing to run". The first syntactic violation aborts the
/// scan and is returned as the diagnostic for the whole line.
pub fn parse(line: &str) -> Result<Job, ParseError> {
    let tokens = tokenize(line)?;
    let mut job = Job::new(line, tokens.clone());

    // Tokens consumed on the current side; reset when `|` switches sides.
    let mut side_len = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        let last = i + 1 == tokens.len();
        match &tokens[i] {
            Token::Word(w) => {
                side(&mut job).argv.push(w.clone());
                side_len += 1;
                i += 1;
            }
            tok if tok.is_redirection() => {
                if side_len == 0 {
                    return Err(ParseError::BadStart(tok.to_string()));
                }
                if last {
                    return Err(ParseError::BadEnd(tok.to_string()));
                }
                let path = match &tokens[i + 1] {
                    Token::Word(path) => path.clone(),
                    special => return Err(ParseError::NearToken(special.to_string())),
                };
                let cmd = side(&mut job);
                match tok {
                    Token::RedirectIn => cmd.stdin = Some(path),
                    Token::RedirectOut => cmd.stdout = Some(path),
                    _ => cmd.stderr = Some(path),
                }
                side_len += 2;
                i += 2;
            }
            Token::Pipe => {
                if i == 0 {
                    return Err(ParseError::BadStart(Token::Pipe.to_string()));
                }
                if job.pipe {
                    return Err(ParseError::NearToken(Token::Pipe.to_string()));
                }
                if last {
                    return Err(ParseError::BadEnd(Token::Pipe.to_string()));
                }
                if tokens[i + 1].is_special() {
                    return Err(ParseError::NearToken(tokens[i + 1].to_string()));
                }
                job.pipe = true;
                job.right = Some(Command::default());
                side_len = 0;
                i += 1;
            }
            _ => {
                // `&`
                if !last {
                    return Err(ParseError::AmpersandNotLast);
                }
                job.background = true;
                i += 1;
            }
        }
    }

    Ok(job)
}

fn side(job: &mut Job) -> &mut Command {
    if job.pipe {
        if let Some(right) = job.right.as_mut() {
            return right;
        }
    }
    &mut job.left
}

#[cfg(test)]
#[path = "parser_tests/mod.rs"]
mod tests;
