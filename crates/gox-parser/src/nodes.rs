/// Node model for tokenized template bodies.
///
/// A template body compiles to an ordered sequence of these nodes; the
/// emitter consumes them left to right and never reorders or merges them.

/// One node of a tokenized template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// A run of literal SQL text.
    Text(String),
    /// `#{expr}` - the expression's value becomes a bound parameter.
    Param(String),
    /// `${expr}` - the expression's value is appended as text.
    TextExpr(String),
    /// `@{...}` SQL fragment, re-expanded by the emitter. `opaque` marks a
    /// smart-scope promoted span whose content is emitted as a single
    /// quoted chunk without re-scanning.
    AtBlock { content: String, opaque: bool },
    /// `@...` single-line shorthand: the line tail is SQL text.
    AtLine(String),
    /// `@@{...}` - the inner template compiles to a standalone query.
    DoubleAtQuery(String),
    /// Bare `{...}` host-code block, itself re-scanned for sigils.
    CodeBlock(String),
}

impl TemplateNode {
    pub fn text(s: impl Into<String>) -> Self {
        TemplateNode::Text(s.into())
    }

    /// True for the sigil variants that translate to builder calls (every
    /// variant except literal text).
    pub fn is_sigil(&self) -> bool {
        !matches!(self, TemplateNode::Text(_))
    }
}
