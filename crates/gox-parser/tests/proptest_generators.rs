//! Strategies for generating template bodies.
//!
//! The generated fragments deliberately avoid sigil characters, quotes,
//! parens, and comment markers so each strategy controls exactly which
//! constructs appear in a body.

use proptest::prelude::*;

/// A host identifier usable inside `#{}` / `${}`. The fixed prefix keeps
/// the generated name from ever being a host keyword.
pub fn arb_ident() -> impl Strategy<Value = String> {
    "q[a-z0-9_]{0,6}"
}

/// A run of SQL-ish text with no sigil characters and no line breaks.
pub fn arb_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ =<>,.*]{1,20}"
}

/// One template piece: plain text or a balanced sigil.
pub fn arb_piece() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_text(),
        arb_ident().prop_map(|e| format!("#{{{e}}}")),
        arb_ident().prop_map(|e| format!("${{{e}}}")),
        arb_text().prop_map(|t| format!("@{{{t}}}")),
        arb_text().prop_map(|t| format!("@@{{{t}}}")),
    ]
}

/// A whole template body built from balanced pieces.
pub fn arb_body() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_piece(), 0..8).prop_map(|ps| ps.concat())
}

/// A strictly alternating body `text sigil text sigil ... text` where every
/// sigil is a simple `#{}` or `${}`. Returns the body and the expected
/// number of builder calls (one per text run, one per sigil).
pub fn arb_counting_body() -> impl Strategy<Value = (String, usize)> {
    let pair = (arb_text(), prop_oneof![Just('#'), Just('$')], arb_ident());
    (prop::collection::vec(pair, 0..6), arb_text()).prop_map(|(pairs, last)| {
        let mut body = String::new();
        for (text, sigil, expr) in &pairs {
            body.push_str(text);
            body.push(*sigil);
            body.push('{');
            body.push_str(expr);
            body.push('}');
        }
        body.push_str(&last);
        let expected = pairs.len() * 2 + 1;
        (body, expected)
    })
}

/// One line of a text-only body: SQL text or a dropped comment line.
pub fn arb_text_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_text(),
        1 => arb_text().prop_map(|t| format!("-- {t}")),
        1 => arb_text().prop_map(|t| format!("// {t}")),
    ]
}

/// A multi-line body containing only text and comment lines.
pub fn arb_text_only_body() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_text_line(), 1..6)
}
