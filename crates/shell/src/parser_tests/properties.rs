// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property-based tests for parser invariants.

use proptest::prelude::*;

use crate::parse;

/// Strategy for plain argv words (never an operator spelling).
fn word_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./-]{1,12}".prop_map(String::from)
}

fn argv_strategy() -> impl Strategy<Value = String> {
    (word_strategy(), prop::collection::vec(word_strategy(), 0..4))
        .prop_map(|(name, args)| {
            let mut s = name;
            for a in args {
                s.push(' ');
                s.push_str(&a);
            }
            s
        })
}

/// Strategy for grammar-valid lines: argv, optional redirections, optional
/// single pipe, optional trailing `&`.
fn valid_line_strategy() -> impl Strategy<Value = String> {
    (
        argv_strategy(),
        prop::option::of(word_strategy()),
        prop::option::of(word_strategy()),
        prop::option::of(argv_strategy()),
        prop::bool::ANY,
    )
        .prop_map(|(left, rin, rout, right, bg)| {
            let mut line = left;
            if let Some(path) = rin {
                line.push_str(" < ");
                line.push_str(&path);
            }
            if let Some(cmd) = right {
                line.push_str(" | ");
                line.push_str(&cmd);
            }
            if let Some(path) = rout {
                line.push_str(" > ");
                line.push_str(&path);
            }
            if bg {
                line.push_str(" &");
            }
            line
        })
}

proptest! {
    /// Grammar-valid lines parse without a diagnostic.
    #[test]
    fn valid_lines_parse(line in valid_line_strategy()) {
        prop_assert!(parse(&line).is_ok(), "failed to parse: {:?}", line);
    }

    /// Reserializing the token sequence reproduces the input modulo
    /// collapsed whitespace.
    #[test]
    fn tokens_round_trip(line in valid_line_strategy()) {
        let job = parse(&line).unwrap();
        let rejoined: Vec<String> = job.tokens.iter().map(|t| t.to_string()).collect();
        let collapsed: Vec<&str> = line.split_whitespace().collect();
        prop_assert_eq!(rejoined, collapsed);
    }

    /// The right side exists exactly when the line contained a pipe.
    #[test]
    fn right_side_iff_pipe(line in valid_line_strategy()) {
        let job = parse(&line).unwrap();
        prop_assert_eq!(job.pipe, job.right.is_some());
        if !job.pipe {
            prop_assert!(job.right.is_none());
        }
    }

    /// Argv words survive parsing in order.
    #[test]
    fn argv_preserved(args in prop::collection::vec(word_strategy(), 1..6)) {
        let line = args.join(" ");
        let job = parse(&line).unwrap();
        prop_assert_eq!(job.left.argv, args);
    }

    /// Whitespace-only noise never changes the parse.
    #[test]
    fn whitespace_insensitive(args in prop::collection::vec(word_strategy(), 1..5)) {
        let tight = args.join(" ");
        let loose = args.join("   ");
        prop_assert_eq!(parse(&tight).unwrap().tokens, parse(&loose).unwrap().tokens);
    }
}
