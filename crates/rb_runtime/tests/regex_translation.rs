use std::sync::Arc;

use proptest::prelude::*;
use rb_runtime::regex::translate;
use rb_runtime::{RegexError, RegexOptions, RuntimeContext, RuntimeError};

fn matches(pattern: &str, options: RegexOptions, haystack: &str) -> bool {
    translate(pattern, options).unwrap().regex().unwrap().is_match(haystack)
}

fn unsupported(pattern: &str) -> &'static str {
    match translate(pattern, RegexOptions::NONE) {
        Err(RegexError::Unsupported { construct, .. }) => construct,
        other => panic!("expected {pattern:?} to be rejected, got {other:?}"),
    }
}

#[test]
fn line_anchors_match_at_every_line() {
    assert!(matches("^b$", RegexOptions::NONE, "a\nb\nc"));
    assert!(!matches("a.b", RegexOptions::NONE, "a\nb"));
    assert!(matches("a.b", RegexOptions::MULTILINE, "a\nb"));
    assert!(matches("hello", RegexOptions::IGNORECASE, "HeLLo"));
    assert!(matches("a b # spaced\n c", RegexOptions::EXTENDED, "abc"));
}

#[test]
fn source_escapes_are_rewritten() {
    assert!(matches("\\h+$", RegexOptions::NONE, "c0ffee"));
    assert!(!matches("^\\h+$", RegexOptions::NONE, "coffee"));
    assert!(matches("\\e\\a", RegexOptions::NONE, "\x1b\x07"));
    assert!(matches("\\101\\x42", RegexOptions::NONE, "AB"));
    assert!(matches("end\\Z", RegexOptions::NONE, "the end\n"));
    assert!(matches("[\\b]", RegexOptions::NONE, "\x08"));
}

#[test]
fn named_groups_keep_their_names() {
    let translated = translate("(?<year>\\d{4})-(?'month'\\d\\d)", RegexOptions::NONE).unwrap();
    let re = translated.regex().unwrap();
    let caps = re.captures("on 2024-06").unwrap();
    assert_eq!(&caps["year"], "2024");
    assert_eq!(&caps["month"], "06");
}

#[test]
fn g_anchor_is_reported_to_the_caller() {
    let translated = translate("\\Gfoo", RegexOptions::NONE).unwrap();
    assert!(translated.has_g_anchor());
    assert_eq!(translated.pattern(), "(?m)foo");
    assert!(!translate("foo", RegexOptions::NONE).unwrap().has_g_anchor());
}

#[test]
fn constructs_without_an_equivalent_are_rejected() {
    assert_eq!(unsupported("(?=a)b"), "lookahead");
    assert_eq!(unsupported("(?<!a)b"), "lookbehind");
    assert_eq!(unsupported("(?>ab)"), "atomic group");
    assert_eq!(unsupported("(a)\\1"), "backreference");
    assert_eq!(unsupported("(?<n>a)\\k<n>"), "backreference");
    assert_eq!(unsupported("a++"), "possessive quantifier");
    assert_eq!(unsupported("\\g<0>"), "subexpression call");
    assert_eq!(unsupported("\\cA"), "control escape");
}

#[test]
fn malformed_patterns_report_where() {
    assert!(matches!(
        translate("(a", RegexOptions::NONE),
        Err(RegexError::UnbalancedParenthesis { offset: 0 })
    ));
    assert!(matches!(
        translate("a)", RegexOptions::NONE),
        Err(RegexError::UnbalancedParenthesis { offset: 1 })
    ));
    assert!(matches!(translate("[ab", RegexOptions::NONE), Err(RegexError::UnterminatedClass)));
    assert!(matches!(translate("ab\\", RegexOptions::NONE), Err(RegexError::TrailingEscape)));

    let invalid = translate("a{2,1}", RegexOptions::NONE).unwrap();
    assert!(matches!(invalid.regex(), Err(RegexError::Compile(_))));
}

#[test]
fn context_caches_translations() {
    let ctx = RuntimeContext::default();
    let first = ctx.regex("a+b", RegexOptions::NONE).unwrap();
    let second = ctx.regex("a+b", RegexOptions::NONE).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ctx.regex_cache().translations(), 1);

    let folded = ctx.regex("a+b", RegexOptions::IGNORECASE).unwrap();
    assert!(!Arc::ptr_eq(&first, &folded));
    assert_eq!(ctx.regex_cache().len(), 2);

    assert!(matches!(
        ctx.regex("(?=x)", RegexOptions::NONE),
        Err(RuntimeError::Regex(RegexError::Unsupported { .. }))
    ));
    assert_eq!(ctx.regex_cache().len(), 2);
}

proptest! {
    #[test]
    fn plain_text_translates_to_itself(text in "[a-zA-Z0-9 ]{0,16}") {
        let translated = translate(&text, RegexOptions::NONE).unwrap();
        prop_assert_eq!(translated.pattern(), format!("(?m){text}"));
        prop_assert!(translated.regex().unwrap().is_match(&text));
    }
}
