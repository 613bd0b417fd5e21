//! Per-file compile pipeline: rewrite call sites, strip build-ignore
//! directives, inject imports, validate, and write the generated file.

use anyhow::{Context, Result};
use gox_parser::rewrite_source;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::CliError;
use crate::imports::inject_imports;
use crate::validate::validate_host_syntax;

/// Suffix of gox source files.
pub const GOX_SUFFIX: &str = ".gox.rs";
/// Suffix of generated files.
pub const GEN_SUFFIX: &str = "_gen.rs";
/// Lines starting with this directive are stripped from generated output.
pub const BUILD_IGNORE_DIRECTIVE: &str = "//gox:ignore";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The generated file was (re)written.
    Written(PathBuf),
    /// Incremental mode skipped the file; the output is newer than the
    /// source.
    UpToDate(PathBuf),
}

pub struct GoxCompiler {
    debug: bool,
}

impl GoxCompiler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Compile one source file to its `_gen.rs` sibling.
    pub fn compile_file(&self, path: &Path, incremental: bool) -> Result<CompileOutcome> {
        let dest = output_path(path)
            .ok_or_else(|| anyhow::anyhow!("not a gox source file: {:?}", path))?;

        if incremental && is_up_to_date(path, &dest)? {
            return Ok(CompileOutcome::UpToDate(dest));
        }

        let src = fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {:?}", path))?;

        let generated = self.compile_source(&src, path)?;

        write_atomic(&dest, &generated)
            .with_context(|| format!("Failed to write generated file: {:?}", dest))?;

        Ok(CompileOutcome::Written(dest))
    }

    /// Run the in-memory pipeline over one file body.
    pub fn compile_source(&self, src: &str, file: &Path) -> Result<String, CliError> {
        let rewrite = rewrite_source(src);
        tracing::debug!(
            file = %file.display(),
            call_sites = rewrite.call_sites,
            "rewrote template call sites"
        );

        if let Some(issue) = rewrite.issues.first() {
            if self.debug {
                for issue in &rewrite.issues {
                    tracing::warn!(line = issue.line, snippet = %issue.snippet, "{}", issue.message);
                }
                dump_buffer(&rewrite.content);
            }
            return Err(CliError::TemplateParse {
                file: file.to_path_buf(),
                line: issue.line,
                message: format!("{} near `{}`", issue.message, issue.snippet),
            });
        }

        let code = strip_build_ignore(&rewrite.content);
        let code = inject_imports(&code);

        if let Err(err) = validate_host_syntax(&code, file) {
            if self.debug {
                dump_buffer(&code);
            }
            return Err(err);
        }

        Ok(code)
    }
}

/// Map `X.gox.rs` to its generated sibling `X_gen.rs`.
pub fn output_path(input: &Path) -> Option<PathBuf> {
    let name = input.file_name()?.to_str()?;
    let stem = name.strip_suffix(GOX_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(input.with_file_name(format!("{stem}{GEN_SUFFIX}")))
}

fn is_up_to_date(src: &Path, dest: &Path) -> Result<bool> {
    let src_mtime = fs::metadata(src)
        .with_context(|| format!("Failed to stat source file: {:?}", src))?
        .modified()?;

    match fs::metadata(dest) {
        Ok(meta) => Ok(meta.modified()? >= src_mtime),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to stat generated file: {:?}", dest))
        }
    }
}

/// Write via a temp file in the destination directory, then rename.
fn write_atomic(dest: &Path, content: &str) -> Result<()> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    io::Write::write_all(&mut tmp, content.as_bytes())?;
    tmp.persist(dest)?;
    Ok(())
}

fn strip_build_ignore(code: &str) -> String {
    code.split_inclusive('\n')
        .filter(|line| !line.trim_start().starts_with(BUILD_IGNORE_DIRECTIVE))
        .collect()
}

fn dump_buffer(code: &str) {
    eprintln!("=== preprocessed buffer ===");
    for (i, line) in code.lines().enumerate() {
        eprintln!("{:4}: {}", i + 1, line);
    }
    eprintln!("=== end preprocessed buffer ===");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_mapping() {
        assert_eq!(
            output_path(Path::new("src/queries.gox.rs")),
            Some(PathBuf::from("src/queries_gen.rs"))
        );
        assert_eq!(output_path(Path::new("src/queries.rs")), None);
        assert_eq!(output_path(Path::new("src/.gox.rs")), None);
    }

    #[test]
    fn test_strip_build_ignore() {
        let code = "//gox:ignore\nfn main() {}\n";
        assert_eq!(strip_build_ignore(code), "fn main() {}\n");
    }

    #[test]
    fn test_strip_build_ignore_keeps_other_comments() {
        let code = "// normal comment\nfn main() {}\n";
        assert_eq!(strip_build_ignore(code), code);
    }

    #[test]
    fn test_compile_source_simple_template() {
        let compiler = GoxCompiler::new(false);
        let src = "fn q(id: i64) -> gox_runtime::Query {\n    Sql(`SELECT * FROM t WHERE id = #{id}`)\n}\n";
        let out = compiler
            .compile_source(src, Path::new("q.gox.rs"))
            .unwrap();

        assert!(!out.contains("Sql("));
        assert!(out.contains("use gox_runtime::QueryBuilder;"));
        assert!(out.contains(".add_param(id);"));
        assert!(syn::parse_file(&out).is_ok());
    }

    #[test]
    fn test_compile_source_rejects_invalid_host_code() {
        let compiler = GoxCompiler::new(false);
        let src = "fn broken( {\n    Sql(`SELECT 1`)\n}\n";
        let err = compiler
            .compile_source(src, Path::new("q.gox.rs"))
            .unwrap_err();
        assert!(matches!(err, CliError::HostSyntax { .. }));
    }

    #[test]
    fn test_compile_source_reports_template_issue_with_line() {
        let compiler = GoxCompiler::new(false);
        let src = "fn a() {}\nfn q() -> gox_runtime::Query {\n    Sql(`v { ${} }`)\n}\n";
        let err = compiler
            .compile_source(src, Path::new("q.gox.rs"))
            .unwrap_err();
        match err {
            CliError::TemplateParse { line, .. } => assert_eq!(line, 3),
            other => panic!("expected TemplateParse, got {other:?}"),
        }
    }
}
