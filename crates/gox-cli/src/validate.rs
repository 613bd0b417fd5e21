//! Host-syntax validation of generated files.
//!
//! The rewritten file must parse as host source before it is written out.
//! Parse failures are reported with context lines around each error
//! location, capped so a badly broken file stays readable.

use std::path::Path;

use crate::errors::{extract_snippet, CliError};

pub const MAX_REPORTED_ERRORS: usize = 10;
pub const CONTEXT_LINES: usize = 3;

/// Parse `code` as host source; on failure build a capped, contextual
/// error report.
pub fn validate_host_syntax(code: &str, file: &Path) -> Result<(), CliError> {
    match syn::parse_file(code) {
        Ok(_) => Ok(()),
        Err(err) => Err(CliError::HostSyntax {
            file: file.to_path_buf(),
            report: build_report(code, err),
        }),
    }
}

fn build_report(code: &str, err: syn::Error) -> String {
    let errors: Vec<syn::Error> = err.into_iter().collect();
    let total = errors.len();
    let mut out = String::new();

    for (i, e) in errors.iter().take(MAX_REPORTED_ERRORS).enumerate() {
        let start = e.span().start();
        out.push_str(&format!(
            "error {}: {} (line {}, column {})\n",
            i + 1,
            e,
            start.line,
            start.column + 1
        ));
        out.push_str(&extract_snippet(code, start.line, CONTEXT_LINES));
        out.push('\n');
    }

    if total > MAX_REPORTED_ERRORS {
        out.push_str(&format!(
            "... and {} more errors\n",
            total - MAX_REPORTED_ERRORS
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_source_passes() {
        let code = "fn main() { let x = 1; }\n";
        assert!(validate_host_syntax(code, Path::new("x.rs")).is_ok());
    }

    #[test]
    fn test_invalid_source_reports_location() {
        let code = "fn main() {\n    let x = ;\n}\n";
        let err = validate_host_syntax(code, Path::new("x.rs")).unwrap_err();
        let report = match err {
            CliError::HostSyntax { report, .. } => report,
            other => panic!("expected HostSyntax, got {other:?}"),
        };
        assert!(report.contains("error 1:"));
        assert!(report.contains("let x = ;"));
        assert!(report.contains("line 2"));
    }
}
