/// Template tokenizer: one linear pass over a template body producing the
/// ordered [`TemplateNode`] sequence.
///
/// Sigil openers whose closing delimiter cannot be found degrade to literal
/// text; the tokenizer itself never fails.
use crate::nodes::TemplateNode;
use crate::scan::{
    find_control_paren, find_matching_brace, find_matching_paren, scan_line,
    skip_line_terminator,
};

/// Tokenize one template body. `smart_scope` enables the rule that promotes
/// an `@` line across lines when it opens an unbalanced control paren.
pub fn tokenize(body: &str, smart_scope: bool) -> Vec<TemplateNode> {
    let bytes = body.as_bytes();
    let mut nodes = Vec::new();
    let mut i = 0;
    let mut text_start = 0;

    while i < bytes.len() {
        let b = bytes[i];

        // #{expr}
        if b == b'#' && bytes.get(i + 1) == Some(&b'{') {
            if let Some((inner, close)) = find_matching_brace(body, i + 2) {
                let inner = inner.to_string();
                flush_text(body, text_start, i, &mut nodes);
                nodes.push(TemplateNode::Param(inner));
                i = close + 1;
                text_start = i;
                continue;
            }
        }

        // ${expr}
        if b == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some((inner, close)) = find_matching_brace(body, i + 2) {
                let inner = inner.to_string();
                flush_text(body, text_start, i, &mut nodes);
                nodes.push(TemplateNode::TextExpr(inner));
                i = close + 1;
                text_start = i;
                continue;
            }
        }

        if b == b'@' {
            // @@{...}
            if bytes.get(i + 1) == Some(&b'@') && bytes.get(i + 2) == Some(&b'{') {
                if let Some((inner, close)) = find_matching_brace(body, i + 3) {
                    let inner = inner.to_string();
                    flush_text(body, text_start, i, &mut nodes);
                    nodes.push(TemplateNode::DoubleAtQuery(inner));
                    i = close + 1;
                    text_start = i;
                    continue;
                }
            // @{...}
            } else if bytes.get(i + 1) == Some(&b'{') {
                if let Some((inner, close)) = find_matching_brace(body, i + 2) {
                    let inner = inner.to_string();
                    flush_text(body, text_start, i, &mut nodes);
                    nodes.push(TemplateNode::AtBlock {
                        content: inner,
                        opaque: false,
                    });
                    i = close + 1;
                    text_start = i;
                    continue;
                }
            // @<line-tail>
            } else {
                flush_text(body, text_start, i, &mut nodes);
                i = tokenize_at_line(body, i, smart_scope, &mut nodes);
                text_start = i;
                continue;
            }
        }

        // bare {...} - a host-code block, unless glued to a sigil prefix
        if b == b'{' && (i == 0 || !matches!(bytes[i - 1], b'#' | b'$' | b'@')) {
            if let Some((inner, close)) = find_matching_brace(body, i + 1) {
                let inner = inner.to_string();
                flush_text(body, text_start, i, &mut nodes);
                nodes.push(TemplateNode::CodeBlock(inner));
                i = close + 1;
                text_start = i;
                continue;
            }
        }

        i += 1;
    }

    flush_text(body, text_start, bytes.len(), &mut nodes);
    nodes
}

fn flush_text(body: &str, start: usize, end: usize, nodes: &mut Vec<TemplateNode>) {
    if end > start {
        nodes.push(TemplateNode::Text(body[start..end].to_string()));
    }
}

/// Handle an `@` shorthand starting at `at`. Returns the resume position.
fn tokenize_at_line(
    body: &str,
    at: usize,
    smart_scope: bool,
    nodes: &mut Vec<TemplateNode>,
) -> usize {
    let bytes = body.as_bytes();
    let (line_end, brace_pos) = scan_line(body, at + 1);

    if smart_scope {
        if let Some(close) = smart_scope_close(body, at, line_end) {
            // Promoted: the span runs to the first bare `{` on the line
            // containing the `)`, or to that line's end.
            let (close_line_end, closing_brace) = scan_line(body, close + 1);
            let content_end = closing_brace.unwrap_or(close_line_end);
            nodes.push(TemplateNode::AtBlock {
                content: body[at + 1..content_end].to_string(),
                opaque: true,
            });
            nodes.push(TemplateNode::text("\n"));
            return match closing_brace {
                Some(bp) => bp,
                None => skip_line_terminator(body, close_line_end),
            };
        }
    }

    // Trailing spaces and tabs before a same-line `{` are not part of the
    // shorthand content.
    let mut at_end = line_end;
    if let Some(bp) = brace_pos {
        at_end = bp;
        while at_end > at + 1 && matches!(bytes[at_end - 1], b' ' | b'\t') {
            at_end -= 1;
        }
    }

    let content = body[at + 1..at_end].trim();
    if !content.is_empty() {
        nodes.push(TemplateNode::AtLine(content.to_string()));
    }
    nodes.push(TemplateNode::text("\n"));

    match brace_pos {
        Some(bp) => bp,
        None => skip_line_terminator(body, line_end),
    }
}

/// Smart-scope check for the `@` at `at` whose line ends at `line_end`:
/// the line must open a control paren whose match lies beyond the line.
/// Returns the absolute index of the matching `)`.
pub(crate) fn smart_scope_close(src: &str, at: usize, line_end: usize) -> Option<usize> {
    let tail = &src[at + 1..line_end];
    if !tail.contains('(') {
        return None;
    }

    let p = find_control_paren(tail)?;
    let rest = &src[at + 1..];
    let (_, close) = find_matching_paren(rest, p + 1)?;
    if close < tail.len() {
        return None; // closes on the same line
    }

    Some(at + 1 + close)
}
