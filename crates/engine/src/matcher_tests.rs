// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn toks(words: &str) -> Vec<String> {
    words.split_whitespace().map(str::to_string).collect()
}

#[yare::parameterized(
    exact           = { "a b", "a b", true },
    case_sensitive  = { "a B", "a b", false },
    positional      = { "switch * *", "switch on main", true },
    named           = { "switch *state livingroom *sw", "switch on livingroom main", true },
    literal_miss    = { "switch *state kitchen *sw", "switch on livingroom main", false },
    too_short       = { "a b c", "a b", false },
    too_long        = { "a b", "a b c", false },
    empty_vs_empty  = { "", "", true },
)]
fn matching(pattern: &str, event: &str, expected: bool) {
    assert_eq!(Pattern::parse(&toks(pattern)).matches(&toks(event)), expected);
}

#[test]
fn positional_wildcards_bind_one_based_indexes() {
    let pattern = Pattern::parse(&toks("switch * * *"));
    let caps = pattern.captures(&toks("switch on livingroom main")).unwrap();
    assert_eq!(
        caps,
        vec![
            ("1".to_string(), "on".to_string()),
            ("2".to_string(), "livingroom".to_string()),
            ("3".to_string(), "main".to_string()),
        ]
    );
}

#[test]
fn bind_writes_named_captures() {
    let ctx = hearth_core::Context::new();
    let pattern = Pattern::parse(&toks("switch *state livingroom *sw"));
    pattern
        .bind(&toks("switch on livingroom main"), &ctx)
        .unwrap();
    assert_eq!(ctx.get("state").map(|v| v.to_string()), Some("on".into()));
    assert_eq!(ctx.get("sw").map(|v| v.to_string()), Some("main".into()));
}

#[test]
fn bind_count_mismatch_is_bad_arg_count() {
    let ctx = hearth_core::Context::new();
    let pattern = Pattern::parse(&toks("a *x"));
    let err = pattern.bind(&toks("a"), &ctx).unwrap_err();
    assert_eq!(err.class_name(), "BadArgCount");
}

#[test]
fn bind_literal_mismatch_is_bad_args() {
    let ctx = hearth_core::Context::new();
    let pattern = Pattern::parse(&toks("a b"));
    let err = pattern.bind(&toks("a c"), &ctx).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::BadArgs { expected, got } if expected == "b" && got == "c"
    ));
}

#[test]
fn label_round_trips_the_source_form() {
    let source = toks("switch *state * lamp");
    assert_eq!(Pattern::parse(&source).label(), "switch *state * lamp");
}

proptest! {
    /// Re-binding a matching event into the same context leaves it unchanged.
    #[test]
    fn bind_is_idempotent(
        tokens in prop::collection::vec("[a-z]{1,6}", 1..6),
        mask in prop::collection::vec(0u8..3, 1..6),
    ) {
        let pattern_tokens: Vec<String> = tokens
            .iter()
            .zip(mask.iter().cycle())
            .map(|(tok, m)| match m {
                0 => tok.clone(),
                1 => "*".to_string(),
                _ => format!("*cap_{tok}"),
            })
            .collect();
        let pattern = Pattern::parse(&pattern_tokens);
        prop_assert!(pattern.matches(&tokens));

        let ctx = hearth_core::Context::new();
        pattern.bind(&tokens, &ctx).unwrap();
        let first: Vec<Option<String>> = pattern
            .captures(&tokens)
            .unwrap()
            .iter()
            .map(|(key, _)| ctx.get(key).map(|v| v.to_string()))
            .collect();

        pattern.bind(&tokens, &ctx).unwrap();
        let second: Vec<Option<String>> = pattern
            .captures(&tokens)
            .unwrap()
            .iter()
            .map(|(key, _)| ctx.get(key).map(|v| v.to_string()))
            .collect();

        prop_assert_eq!(first, second);
    }
}
