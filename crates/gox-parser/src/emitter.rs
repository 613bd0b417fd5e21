/// Code emitter: walks a template's node sequence and produces the host
/// statements that drive a `QueryBuilder`, recursing through host-code
/// blocks and nested call sites.
use crate::finder::find_call_sites;
use crate::nodes::TemplateNode;
use crate::scan::{find_matching_brace, find_outside_strings, line_end, scan_line, skip_line_terminator};
use crate::tokenizer::{smart_scope_close, tokenize};

/// Fallback marker substituted for an expansion that cannot be produced.
pub const PARSE_ERROR_MARKER: &str = "/* parse_error */";

/// A non-fatal defect noticed while emitting. The driver decides how loudly
/// to report these; emission itself always completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitIssue {
    /// 1-based line in the original source file; 0 until the rewrite loop
    /// fills it in.
    pub line: usize,
    pub message: String,
    pub snippet: String,
}

/// Result of rewriting one whole source file.
#[derive(Debug, Clone)]
pub struct Rewrite {
    /// The source with every call site replaced by generated host code.
    pub content: String,
    /// Number of call sites rewritten.
    pub call_sites: usize,
    pub issues: Vec<EmitIssue>,
}

/// Rewrite a whole source file: every `Sql(...)` span is replaced by a
/// block expression that builds and yields a `Query`. The smart-scope flag
/// is derived from the file body.
pub fn rewrite_source(src: &str) -> Rewrite {
    let smart_scope = src.contains(crate::SMART_SCOPE_MARKER);
    let mut emitter = Emitter::new(smart_scope);
    let sites = find_call_sites(src);
    let mut content = src.to_string();

    // Right-to-left so earlier spans stay valid.
    for site in sites.iter().rev() {
        let issues_before = emitter.issues.len();
        let replacement = emitter.emit_query(&site.body);
        let site_line = 1 + src[..site.start()].matches('\n').count();
        for issue in &mut emitter.issues[issues_before..] {
            issue.line = site_line;
        }
        content.replace_range(site.start()..site.end(), &replacement);
    }

    Rewrite {
        content,
        call_sites: sites.len(),
        issues: emitter.issues,
    }
}

/// Compiles template bodies to host statements. One emitter serves a whole
/// file so nested emissions get distinct builder variable names.
pub struct Emitter {
    smart_scope: bool,
    next_builder: usize,
    issues: Vec<EmitIssue>,
}

impl Emitter {
    pub fn new(smart_scope: bool) -> Self {
        Self {
            smart_scope,
            next_builder: 0,
            issues: Vec::new(),
        }
    }

    pub fn issues(&self) -> &[EmitIssue] {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Vec<EmitIssue> {
        std::mem::take(&mut self.issues)
    }

    /// Compile one template body into a block expression yielding a `Query`.
    pub fn emit_query(&mut self, body: &str) -> String {
        let nodes = tokenize(body, self.smart_scope);
        self.emit_block(&nodes)
    }

    fn emit_block(&mut self, nodes: &[TemplateNode]) -> String {
        let b = format!("__gox_qb{}", self.next_builder);
        self.next_builder += 1;

        let mut parts = vec![format!("let mut {b} = QueryBuilder::new();")];
        parts.extend(self.emit_nodes(nodes, &b));
        parts.push(format!("{b}.build()"));

        let mut out = String::from("{\n");
        for part in &parts {
            for line in part.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('}');
        out
    }

    fn emit_nodes(&mut self, nodes: &[TemplateNode], b: &str) -> Vec<String> {
        let mut parts = Vec::new();

        for (idx, node) in nodes.iter().enumerate() {
            match node {
                TemplateNode::Text(t) => parts.extend(emit_text(t, b)),
                TemplateNode::Param(expr) => parts.push(emit_param(expr, b)),
                TemplateNode::TextExpr(expr) => {
                    let e = expr.trim();
                    if is_simple_expr(e) {
                        parts.push(format!("{b}.add_text({e});"));
                    } else {
                        parts.push(self.expand_code(e, b));
                    }
                }
                TemplateNode::AtLine(line) => {
                    parts.push(add_text_lit("\n", b));
                    parts.extend(self.expand_sql_part(line, b));
                }
                TemplateNode::AtBlock { content, opaque } => {
                    if *opaque {
                        parts.push(add_text_lit(content, b));
                    } else {
                        parts.extend(self.expand_sql_part(content.trim(), b));
                    }
                }
                TemplateNode::CodeBlock(code) => {
                    // A block introduced on an `@` line carries SQL context:
                    // its text is quoted and only its sigils expand. A
                    // standalone block is host code.
                    if follows_at_construct(nodes, idx) {
                        parts.extend(self.expand_sql_part(code, b));
                    } else {
                        parts.push(self.expand_code(code.trim(), b));
                    }
                }
                TemplateNode::DoubleAtQuery(inner) => {
                    let nested = self.emit_query(inner);
                    parts.push(format!("{b}.add_text({nested});"));
                }
            }
        }

        parts
    }

    /// Expand a SQL fragment: text is quoted, sigils become builder calls.
    /// This is the sub-grammar shared by `@{...}` blocks and `@` lines.
    fn expand_sql_part(&mut self, part: &str, b: &str) -> Vec<String> {
        let mut calls = Vec::new();
        let mut i = 0;
        let mut text_start = 0;

        while i < part.len() {
            let by = part.as_bytes()[i];

            // #{expr}
            if by == b'#' && part.as_bytes().get(i + 1) == Some(&b'{') {
                if let Some((inner, close)) = find_matching_brace(part, i + 2) {
                    let stmt = emit_param(inner, b);
                    flush_part_text(part, text_start, i, b, &mut calls);
                    calls.push(stmt);
                    i = close + 1;
                    text_start = i;
                    continue;
                }
            }

            // ${expr}
            if by == b'$' && part.as_bytes().get(i + 1) == Some(&b'{') {
                if let Some((inner, close)) = find_matching_brace(part, i + 2) {
                    let expr = inner.trim().to_string();
                    flush_part_text(part, text_start, i, b, &mut calls);
                    if expr.is_empty() {
                        self.issue("empty `${}` text expression", &part[i..close + 1]);
                        calls.push(PARSE_ERROR_MARKER.to_string());
                    } else {
                        calls.push(format!("{b}.add_text({expr});"));
                    }
                    i = close + 1;
                    text_start = i;
                    continue;
                }
            }

            // @@{...} - nested query spliced into this builder
            if by == b'@'
                && part.as_bytes().get(i + 1) == Some(&b'@')
                && part.as_bytes().get(i + 2) == Some(&b'{')
            {
                if let Some((inner, close)) = find_matching_brace(part, i + 3) {
                    let inner = inner.to_string();
                    flush_part_text(part, text_start, i, b, &mut calls);
                    let nested = self.emit_query(&inner);
                    calls.push(format!("{b}.add_text({nested});"));
                    i = close + 1;
                    text_start = i;
                    continue;
                }
            }

            // @{...} - recurse
            if by == b'@' && part.as_bytes().get(i + 1) == Some(&b'{') {
                if let Some((inner, close)) = find_matching_brace(part, i + 2) {
                    let inner = inner.to_string();
                    flush_part_text(part, text_start, i, b, &mut calls);
                    calls.extend(self.expand_sql_part(&inner, b));
                    i = close + 1;
                    text_start = i;
                    continue;
                }
            }

            // @<line> shorthand
            if by == b'@'
                && !(part.as_bytes().get(i + 1) == Some(&b'{')
                    || (part.as_bytes().get(i + 1) == Some(&b'@')
                        && part.as_bytes().get(i + 2) == Some(&b'{')))
            {
                flush_part_text(part, text_start, i, b, &mut calls);

                let le = line_end(part, i + 1);

                // Under smart scope a multi-line tail is one opaque chunk.
                if self.smart_scope {
                    if let Some(close) = smart_scope_close(part, i, le) {
                        let cle = line_end(part, close + 1);
                        let content = part[i + 1..cle].trim().to_string();
                        calls.push(add_text_lit(&content, b));
                        calls.push(add_text_lit("\n", b));
                        i = skip_line_terminator(part, cle);
                        text_start = i;
                        continue;
                    }
                }

                let line = part[i + 1..le].trim().to_string();
                if !line.is_empty() {
                    let sub = self.expand_sql_part(&line, b);
                    calls.extend(sub);
                }
                calls.push(add_text_lit("\n", b));
                i = skip_line_terminator(part, le);
                text_start = i;
                continue;
            }

            // bare {...} - host code embedded in the fragment
            if by == b'{'
                && (i == 0 || !matches!(part.as_bytes()[i - 1], b'#' | b'$' | b'@'))
            {
                if let Some((inner, close)) = find_matching_brace(part, i + 1) {
                    let inner = inner.trim().to_string();
                    flush_part_text(part, text_start, i, b, &mut calls);
                    let code = self.expand_code(&inner, b);
                    if !code.is_empty() {
                        calls.push(code);
                    }
                    i = close + 1;
                    text_start = i;
                    continue;
                }
            }

            i += 1;
        }

        flush_part_text(part, text_start, part.len(), b, &mut calls);
        calls
    }

    /// The host-code pass: expand nested call sites, then the five sigil
    /// sweeps in their fixed order. The order matters: a `@@{}` containing
    /// `#{}` must expand before the bare-param sweep sees it.
    fn expand_code(&mut self, code: &str, b: &str) -> String {
        let mut result = code.to_string();

        let sites = find_call_sites(&result);
        for site in sites.iter().rev() {
            let replacement = self.emit_query(&site.body);
            result.replace_range(site.start()..site.end(), &replacement);
        }

        result = self.sweep_double_at_queries(result);
        result = self.sweep_at_blocks(result, b);
        result = self.sweep_at_lines(result, b);
        result = self.sweep_params(result, b);
        result = self.sweep_text_exprs(result, b);
        result
    }

    /// Sweep 1: every `@@{...}` becomes a nested-query block expression.
    fn sweep_double_at_queries(&mut self, mut result: String) -> String {
        loop {
            let Some(start) = find_outside_strings(&result, 0, "@@{") else {
                break;
            };
            let Some((inner, close)) = find_matching_brace(&result, start + 3) else {
                break;
            };
            let inner = inner.to_string();
            let replacement = self.emit_query(&inner);
            result.replace_range(start..close + 1, &replacement);
        }
        result
    }

    /// Sweep 2: every `@{...}` becomes a flat run of builder statements.
    fn sweep_at_blocks(&mut self, mut result: String, b: &str) -> String {
        loop {
            let Some(start) = find_outside_strings(&result, 0, "@{") else {
                break;
            };
            let Some((inner, close)) = find_matching_brace(&result, start + 2) else {
                break;
            };
            let inner = inner.to_string();
            let replacement = self.expand_sql_part(&inner, b).join("\n");
            result.replace_range(start..close + 1, &replacement);
        }
        result
    }

    /// Sweep 3: every `@<line>` shorthand becomes a leading newline, the
    /// expanded line, and a trailing newline when a `{` block follows on
    /// the same line (which itself stays in place as host code).
    fn sweep_at_lines(&mut self, mut result: String, b: &str) -> String {
        let mut search = 0;
        loop {
            let Some(at) = find_outside_strings(&result, search, "@") else {
                break;
            };

            // Block forms were consumed by the earlier sweeps; whatever is
            // left of them is unmatched and stays literal.
            if result.as_bytes().get(at + 1) == Some(&b'@')
                && result.as_bytes().get(at + 2) == Some(&b'{')
            {
                search = at + 3;
                continue;
            }
            if result.as_bytes().get(at + 1) == Some(&b'{') {
                search = at + 2;
                continue;
            }

            let (le, brace_pos) = scan_line(&result, at + 1);

            if self.smart_scope {
                if let Some(close) = smart_scope_close(&result, at, le) {
                    let cle = line_end(&result, close + 1);
                    let content = result[at + 1..cle].trim().to_string();
                    let replacement = [
                        add_text_lit("\n", b),
                        add_text_lit(&content, b),
                        add_text_lit("\n", b),
                    ]
                    .join("\n");
                    result.replace_range(at..cle, &replacement);
                    search = at + replacement.len();
                    continue;
                }
            }

            let mut at_end = le;
            if let Some(bp) = brace_pos {
                at_end = bp;
                while at_end > at + 1
                    && matches!(result.as_bytes()[at_end - 1], b' ' | b'\t')
                {
                    at_end -= 1;
                }
            }

            let line = result[at + 1..at_end].trim().to_string();
            if line.is_empty() {
                search = brace_pos.unwrap_or(le);
                continue;
            }

            let mut parts = vec![add_text_lit("\n", b)];
            parts.extend(self.expand_sql_part(&line, b));
            if brace_pos.is_some() {
                parts.push(add_text_lit("\n", b));
            }
            let mut replacement = parts.join("\n");

            if brace_pos.is_some() {
                replacement.push('\n');
                result.replace_range(at..at_end, &replacement);
            } else {
                result.replace_range(at..le, &replacement);
            }
            search = at + replacement.len();
        }
        result
    }

    /// Sweep 4: remaining `#{expr}` become `add_param` calls.
    fn sweep_params(&mut self, mut result: String, b: &str) -> String {
        loop {
            let Some(start) = find_outside_strings(&result, 0, "#{") else {
                break;
            };
            let Some((inner, close)) = find_matching_brace(&result, start + 2) else {
                break;
            };
            let expr = inner.trim().to_string();
            let replacement = if expr.is_empty() {
                self.issue("empty `#{}` parameter expression", &result[start..close + 1]);
                PARSE_ERROR_MARKER.to_string()
            } else {
                format!("{b}.add_param({expr});")
            };
            result.replace_range(start..close + 1, &replacement);
        }
        result
    }

    /// Sweep 5: remaining `${expr}` become `add_text` calls.
    fn sweep_text_exprs(&mut self, mut result: String, b: &str) -> String {
        loop {
            let Some(start) = find_outside_strings(&result, 0, "${") else {
                break;
            };
            let Some((inner, close)) = find_matching_brace(&result, start + 2) else {
                break;
            };
            let expr = inner.trim().to_string();
            let replacement = if expr.is_empty() {
                self.issue("empty `${}` text expression", &result[start..close + 1]);
                PARSE_ERROR_MARKER.to_string()
            } else {
                format!("{b}.add_text({expr});")
            };
            result.replace_range(start..close + 1, &replacement);
        }
        result
    }

    fn issue(&mut self, message: &str, snippet: &str) {
        self.issues.push(EmitIssue {
            line: 0,
            message: message.to_string(),
            snippet: snippet.to_string(),
        });
    }
}

/// True when `nodes[idx]` is a `{...}` block introduced on an `@` line:
/// the tokenizer leaves `[AtLine | promoted AtBlock, Text("\n"), CodeBlock]`
/// in that exact shape.
fn follows_at_construct(nodes: &[TemplateNode], idx: usize) -> bool {
    if idx < 2 {
        return false;
    }
    matches!(&nodes[idx - 1], TemplateNode::Text(t) if t == "\n")
        && matches!(
            nodes[idx - 2],
            TemplateNode::AtLine(_) | TemplateNode::AtBlock { opaque: true, .. }
        )
}

/// Translate one literal text run. Lines whose trimmed form starts with
/// `//` or `--` are dropped; kept lines are re-joined with explicit
/// newline fragments so the query text reproduces the template exactly.
fn emit_text(text: &str, b: &str) -> Vec<String> {
    let kept: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| {
            let t = line.trim();
            !(t.starts_with("//") || t.starts_with("--"))
        })
        .collect();

    let mut parts = Vec::new();
    for (i, line) in kept.iter().enumerate() {
        if !line.is_empty() {
            parts.push(add_text_lit(line, b));
        }
        if i + 1 < kept.len() {
            parts.push(add_text_lit("\n", b));
        }
    }
    parts
}

/// A parameter expression: simple host expressions bind directly; anything
/// else runs inside a closure whose `Some` result becomes the parameter.
fn emit_param(expr: &str, b: &str) -> String {
    let e = expr.trim();
    if is_simple_expr(e) {
        format!("{b}.add_param({e});")
    } else {
        format!(
            "if let Some(__gox_param) = (|| {{ {e}; None::<Value> }})() {{ {b}.add_param(__gox_param); }}"
        )
    }
}

fn is_simple_expr(src: &str) -> bool {
    !src.is_empty() && syn::parse_str::<syn::Expr>(src).is_ok()
}

fn add_text_lit(text: &str, b: &str) -> String {
    format!("{b}.add_text({text:?});")
}

fn flush_part_text(part: &str, start: usize, end: usize, b: &str, calls: &mut Vec<String>) {
    if end > start {
        calls.push(add_text_lit(&part[start..end], b));
    }
}
