/// Top-level call finder: locates `Sql(<literal>)` call sites in a host
/// source file and extracts their template bodies.
use rowan::TextRange;

use crate::scan::skip_string;

/// Accepted call prefixes. The second form is the long synonym.
const PREFIXES: [&str; 2] = ["Sql(", "runtime::query("];

/// One template call site: the span to replace (prefix through the closing
/// paren) and the extracted template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub range: TextRange,
    pub body: String,
}

impl CallSite {
    pub fn start(&self) -> usize {
        self.range.start().into()
    }

    pub fn end(&self) -> usize {
        self.range.end().into()
    }
}

/// Scan a host source file for template call sites. Double-quoted host
/// strings are skipped; a candidate that fails to match is abandoned and
/// scanning resumes one character past its opening.
pub fn find_call_sites(src: &str) -> Vec<CallSite> {
    let bytes = src.as_bytes();
    let mut sites = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'"' {
            i = skip_string(src, i, b'"');
            continue;
        }

        let Some(prefix_len) = match_prefix(src, i) else {
            i += 1;
            continue;
        };

        // Whitespace between the opening paren and the literal.
        let mut j = i + prefix_len;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() {
            i += 1;
            continue;
        }

        let extracted = match bytes[j] {
            b'`' | b'\'' => extract_quoted(src, j),
            b'/' if bytes.get(j + 1) == Some(&b'*') => extract_comment(src, j),
            _ => None,
        };

        let Some((body, after)) = extracted else {
            i = j + 1;
            continue;
        };

        // Whitespace then the closing paren.
        let mut k = after;
        while k < bytes.len() && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if k < bytes.len() && bytes[k] == b')' {
            sites.push(CallSite {
                range: TextRange::new((i as u32).into(), ((k + 1) as u32).into()),
                body,
            });
            i = k + 1;
        } else {
            i = j + 1;
        }
    }

    sites
}

/// Match a call prefix at `pos`. The prefix must not be glued to a
/// preceding identifier byte (`MySql(` is not a call site; `gox::Sql(` is).
fn match_prefix(src: &str, pos: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    if pos > 0 && crate::scan::is_ident_byte(bytes[pos - 1]) {
        return None;
    }
    PREFIXES
        .iter()
        .find(|p| src[pos..].starts_with(*p))
        .map(|p| p.len())
}

/// Extract a backtick- or single-quoted template body starting at the
/// opening quote. Returns the body and the index just past the closer.
fn extract_quoted(src: &str, open: usize) -> Option<(String, usize)> {
    let quote = src.as_bytes()[open];
    let close = find_closing_quote(src, open + 1, quote, quote == b'`')?;
    Some((src[open + 1..close].to_string(), close + 1))
}

fn find_closing_quote(src: &str, start: usize, quote: u8, raw: bool) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == quote {
            return Some(i);
        }
        if !raw && bytes[i] == b'\\' && i + 1 < bytes.len() {
            i += 1;
        }
        i += 1;
    }
    None
}

/// Extract a `/*[*...] ... */` template body starting at the `/`. Leading
/// `*` after the opener are decorative and skipped.
fn extract_comment(src: &str, open: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut start = open + 2;
    while start < bytes.len() && bytes[start] == b'*' {
        start += 1;
    }
    let end = src[start..].find("*/").map(|off| start + off)?;
    Some((src[start..end].to_string(), end + 2))
}
