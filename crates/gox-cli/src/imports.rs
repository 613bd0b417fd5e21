//! Import injection for generated files.
//!
//! The emitter references runtime items by bare name; this pass derives
//! the `use` items those names need and merges them into the file header,
//! skipping anything the source already imports.

/// (identifier marker in generated code, use item it requires)
const IMPORTS: [(&str, &str); 2] = [
    ("QueryBuilder::new(", "use gox_runtime::QueryBuilder;"),
    ("None::<Value>", "use gox_runtime::Value;"),
];

/// Add the `use` items the generated code needs.
pub fn inject_imports(code: &str) -> String {
    let needed: Vec<&str> = IMPORTS
        .iter()
        .filter(|(marker, use_line)| {
            code.contains(marker)
                && !code.contains(use_line)
                && !code.contains("use gox_runtime::{")
                && !code.contains("use gox_runtime::*")
        })
        .map(|(_, use_line)| *use_line)
        .collect();

    if needed.is_empty() {
        return code.to_string();
    }

    let at = insertion_offset(code);
    let mut result = String::with_capacity(code.len() + 64);
    result.push_str(&code[..at]);
    for line in &needed {
        result.push_str(line);
        result.push('\n');
    }
    result.push_str(&code[at..]);
    result
}

/// Byte offset just past the file header: inner attributes, leading
/// comments, blank lines, and existing `use` items (including multi-line
/// ones).
fn insertion_offset(code: &str) -> usize {
    let mut offset = 0;
    let mut in_use = false;

    for line in code.split_inclusive('\n') {
        let t = line.trim();

        if in_use {
            offset += line.len();
            if t.ends_with(';') {
                in_use = false;
            }
            continue;
        }

        if t.is_empty() || t.starts_with("//") || t.starts_with("#![") {
            offset += line.len();
            continue;
        }

        if t.starts_with("use ") {
            offset += line.len();
            if !t.ends_with(';') {
                in_use = true;
            }
            continue;
        }

        break;
    }

    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injects_builder_import_after_header() {
        let code = "// header\n\nfn q() { let mut b = QueryBuilder::new(); }\n";
        let out = inject_imports(code);
        assert_eq!(
            out,
            "// header\n\nuse gox_runtime::QueryBuilder;\nfn q() { let mut b = QueryBuilder::new(); }\n"
        );
    }

    #[test]
    fn test_injects_after_existing_uses() {
        let code = "use std::fmt;\n\nfn q() { QueryBuilder::new(); }\n";
        let out = inject_imports(code);
        assert!(out.starts_with("use std::fmt;\n\nuse gox_runtime::QueryBuilder;\n"));
    }

    #[test]
    fn test_skips_already_imported() {
        let code = "use gox_runtime::QueryBuilder;\nfn q() { QueryBuilder::new(); }\n";
        assert_eq!(inject_imports(code), code);
    }

    #[test]
    fn test_respects_grouped_import() {
        let code = "use gox_runtime::{Query, QueryBuilder};\nfn q() { QueryBuilder::new(); }\n";
        assert_eq!(inject_imports(code), code);
    }

    #[test]
    fn test_nothing_needed_is_identity() {
        let code = "fn main() {}\n";
        assert_eq!(inject_imports(code), code);
    }

    #[test]
    fn test_value_import_for_param_wrappers() {
        let code = "fn q() { QueryBuilder::new(); let x = None::<Value>; }\n";
        let out = inject_imports(code);
        assert!(out.contains("use gox_runtime::QueryBuilder;"));
        assert!(out.contains("use gox_runtime::Value;"));
    }

    #[test]
    fn test_multi_line_use_block() {
        let code = "use std::{\n    fmt,\n    io,\n};\nfn q() { QueryBuilder::new(); }\n";
        let out = inject_imports(code);
        assert!(out.contains("};\nuse gox_runtime::QueryBuilder;\nfn q()"));
    }
}
