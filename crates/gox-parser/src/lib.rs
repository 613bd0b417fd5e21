/// gox-parser - the template-compilation core for gox source files
///
/// A gox source file is ordinary host code containing `Sql(<template>)`
/// call sites. This crate finds those sites, tokenizes each template body
/// into a node sequence (text, `#{}` params, `${}` text expressions,
/// `@{}`/`@@{}` blocks, `@` line shorthands, bare `{}` host-code blocks),
/// and emits the host statements that drive a `QueryBuilder` at run time.
///
/// The crate is purely in-memory and side-effect free: it never touches
/// the file system and retains no state across files. The driver owns
/// discovery, the incremental gate, and writing the generated files.
pub mod scan;
pub mod finder;
pub mod nodes;
pub mod tokenizer;
pub mod emitter;

pub use emitter::{rewrite_source, EmitIssue, Emitter, Rewrite, PARSE_ERROR_MARKER};
pub use finder::{find_call_sites, CallSite};
pub use nodes::TemplateNode;
pub use tokenizer::tokenize;

/// Marker substring that enables the smart-scope rule for a file.
pub const SMART_SCOPE_MARKER: &str = "gox:smart_scope";

/// Re-export the span type used for call-site ranges.
pub use rowan::TextRange;
