use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Could not find gox project root.\nExpected to find 'gox.yml' or a 'src/' directory.")]
    ProjectRootNotFound,

    #[error("Failed to load configuration file: {}\n{source}", path.display())]
    ConfigLoadError {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("Template error in {}:{line}\n  {message}", file.display())]
    TemplateParse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Generated code for {} is not valid host source:\n{report}", file.display())]
    HostSyntax { file: PathBuf, report: String },
}

/// Line and column (both 1-based) of a byte offset.
pub fn offset_to_line_col(text: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (idx, ch) in text.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Numbered snippet of `context_lines` lines around a 1-based line, with
/// the target line marked.
pub fn extract_snippet(text: &str, line: usize, context_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let start_line = line.saturating_sub(context_lines).max(1);
    let end_line = (line + context_lines).min(lines.len());

    let snippet_lines: Vec<String> = (start_line..=end_line)
        .map(|line_num| {
            let marker = if line_num == line { ">" } else { " " };
            format!("{} {:4} | {}", marker, line_num, lines[line_num - 1])
        })
        .collect();

    snippet_lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_line_col() {
        let text = "ab\ncd\nef";
        assert_eq!(offset_to_line_col(text, 0), (1, 1));
        assert_eq!(offset_to_line_col(text, 4), (2, 2));
        assert_eq!(offset_to_line_col(text, 6), (3, 1));
    }

    #[test]
    fn test_extract_snippet_marks_target() {
        let text = "one\ntwo\nthree\nfour\nfive";
        let snippet = extract_snippet(text, 3, 1);
        assert!(snippet.contains("     2 | two"));
        assert!(snippet.contains(">    3 | three"));
        assert!(snippet.contains("     4 | four"));
        assert!(!snippet.contains("one"));
        assert!(!snippet.contains("five"));
    }

    #[test]
    fn test_extract_snippet_clamps_to_file() {
        let text = "only";
        let snippet = extract_snippet(text, 1, 3);
        assert_eq!(snippet, ">    1 | only");
    }
}
