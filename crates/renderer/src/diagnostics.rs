//! Structured diagnostics parsed out of raw GL compile/link info logs.
//!
//! Drivers disagree about log formats, so the parser applies a small set of
//! vendor pattern families per line and falls back to a generic line-0
//! diagnostic for anything that still smells like an error. Lines and
//! columns are 0-based in the parsed output; drivers report them 1-based.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A single compile or link message pinned to a source location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 0-based source line.
    pub line: u32,
    /// 0-based column; 0 when the driver did not report one.
    pub column: u32,
    pub message: String,
    pub severity: Severity,
    pub stage: ShaderStage,
}

impl Diagnostic {
    /// Generic diagnostic at line 0 for messages without a usable location.
    pub fn generic(message: impl Into<String>, severity: Severity, stage: ShaderStage) -> Self {
        Self {
            line: 0,
            column: 0,
            message: message.into(),
            severity,
            stage,
        }
    }
}

/// Parses a driver info log into diagnostics, one line at a time.
///
/// Pattern families, first match wins per line:
///
/// 1. `ERROR: 0:<line>: <msg>` (Mesa/Intel and most GLES stacks)
/// 2. `ERROR: <line>:<col>: <msg>` (AMD-style line/column pairs)
/// 3. `<n>(<line>) : error C1234: <msg>` (NVIDIA)
/// 4. Any leading integer is taken as a 1-based line number.
///
/// Lines matching none of the families but containing "error" or "warning"
/// degrade to a generic line-0 diagnostic instead of being dropped. Empty
/// input yields an empty list; the parser never fails.
pub fn parse_compile_log(log: &str, stage: ShaderStage) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for raw in log.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(diagnostic) = parse_line(line, stage) {
            diagnostics.push(diagnostic);
        }
    }
    diagnostics
}

/// Collapses a program link log into the single generic diagnostic the
/// caller reports; link errors are not attributable to a source line.
pub fn link_diagnostic(log: &str) -> Diagnostic {
    let message = log.trim();
    let message = if message.is_empty() {
        "program link failed".to_string()
    } else {
        message.to_string()
    };
    Diagnostic::generic(message, Severity::Error, ShaderStage::Fragment)
}

fn parse_line(line: &str, stage: ShaderStage) -> Option<Diagnostic> {
    if let Some(diagnostic) = parse_prefixed(line, stage) {
        return Some(diagnostic);
    }
    if let Some(diagnostic) = parse_nvidia(line, stage) {
        return Some(diagnostic);
    }
    if let Some(diagnostic) = parse_leading_number(line, stage) {
        return Some(diagnostic);
    }
    let lowered = line.to_ascii_lowercase();
    if lowered.contains("error") {
        return Some(Diagnostic::generic(line, Severity::Error, stage));
    }
    if lowered.contains("warning") {
        return Some(Diagnostic::generic(line, Severity::Warning, stage));
    }
    None
}

/// Families 1 and 2: a severity keyword, a colon, then either `0:<line>:` or
/// `<line>:<col>:`. When the first number is 0 the second is the line
/// (family 1); otherwise the pair is line:column (family 2).
fn parse_prefixed(line: &str, stage: ShaderStage) -> Option<Diagnostic> {
    let (severity, rest) = strip_severity_keyword(line)?;
    let rest = rest.trim_start_matches(':').trim_start();

    let (first, rest) = take_number(rest)?;
    let rest = rest.strip_prefix(':')?;
    let (second, rest) = take_number(rest)?;
    let message = rest.strip_prefix(':').unwrap_or(rest).trim();
    if message.is_empty() {
        return None;
    }

    let (source_line, column) = if first == 0 {
        (second, 0)
    } else {
        (first, second.saturating_sub(1))
    };
    Some(Diagnostic {
        line: source_line.saturating_sub(1),
        column,
        message: message.to_string(),
        severity,
        stage,
    })
}

/// Family 3: `<n>(<line>) : error|warning …: <msg>`.
fn parse_nvidia(line: &str, stage: ShaderStage) -> Option<Diagnostic> {
    let (_, rest) = take_number(line)?;
    let rest = rest.strip_prefix('(')?;
    let (source_line, rest) = take_number(rest)?;
    let rest = rest.strip_prefix(')')?;
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();

    let lowered = rest.to_ascii_lowercase();
    let severity = if lowered.starts_with("error") {
        Severity::Error
    } else if lowered.starts_with("warning") {
        Severity::Warning
    } else {
        return None;
    };

    // Skip the keyword plus any driver-specific code ("error C1008") up to
    // the message separator.
    let message = match rest.find(':') {
        Some(index) => rest[index + 1..].trim(),
        None => return None,
    };
    if message.is_empty() {
        return None;
    }
    Some(Diagnostic {
        line: source_line.saturating_sub(1),
        column: 0,
        message: message.to_string(),
        severity,
        stage,
    })
}

/// Family 4: any other line that leads with an integer.
fn parse_leading_number(line: &str, stage: ShaderStage) -> Option<Diagnostic> {
    let (source_line, rest) = take_number(line)?;
    let message = rest.trim_start_matches([':', ' ', '\t']).trim();
    if message.is_empty() {
        return None;
    }
    let severity = if message.to_ascii_lowercase().contains("warning") {
        Severity::Warning
    } else {
        Severity::Error
    };
    Some(Diagnostic {
        line: source_line.saturating_sub(1),
        column: 0,
        message: message.to_string(),
        severity,
        stage,
    })
}

fn strip_severity_keyword(line: &str) -> Option<(Severity, &str)> {
    for (keyword, severity) in [
        ("ERROR", Severity::Error),
        ("WARNING", Severity::Warning),
        ("INFO", Severity::Info),
    ] {
        match (line.get(..keyword.len()), line.get(keyword.len()..)) {
            (Some(prefix), Some(rest)) if prefix.eq_ignore_ascii_case(keyword) => {
                return Some((severity, rest));
            }
            _ => {}
        }
    }
    None
}

fn take_number(text: &str) -> Option<(u32, &str)> {
    let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let value = text[..digits].parse().ok()?;
    Some((value, &text[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesa_style_line_is_rebased_to_zero() {
        let parsed = parse_compile_log(
            "ERROR: 0:12: 'foo' : undeclared identifier",
            ShaderStage::Fragment,
        );
        assert_eq!(
            parsed,
            vec![Diagnostic {
                line: 11,
                column: 0,
                message: "'foo' : undeclared identifier".to_string(),
                severity: Severity::Error,
                stage: ShaderStage::Fragment,
            }]
        );
    }

    #[test]
    fn line_column_family_rebases_both() {
        let parsed = parse_compile_log("ERROR: 7:13: unexpected token", ShaderStage::Vertex);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].line, 6);
        assert_eq!(parsed[0].column, 12);
        assert_eq!(parsed[0].stage, ShaderStage::Vertex);
    }

    #[test]
    fn nvidia_family_parses_line_and_severity() {
        let parsed = parse_compile_log(
            "0(42) : error C1008: undefined variable \"bar\"",
            ShaderStage::Fragment,
        );
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].line, 41);
        assert_eq!(parsed[0].severity, Severity::Error);
        assert_eq!(parsed[0].message, "undefined variable \"bar\"");

        let warning = parse_compile_log("0(3) : warning: implicit cast", ShaderStage::Fragment);
        assert_eq!(warning[0].severity, Severity::Warning);
        assert_eq!(warning[0].line, 2);
    }

    #[test]
    fn leading_integer_fallback_extracts_line() {
        let parsed = parse_compile_log("15: syntax error near ';'", ShaderStage::Fragment);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].line, 14);
    }

    #[test]
    fn keyword_lines_become_generic_line_zero() {
        let parsed = parse_compile_log(
            "internal error: compiler bug\nwarning issued during parse",
            ShaderStage::Vertex,
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].line, 0);
        assert_eq!(parsed[0].severity, Severity::Error);
        assert_eq!(parsed[1].severity, Severity::Warning);
    }

    #[test]
    fn unremarkable_lines_are_dropped() {
        assert!(parse_compile_log("compilation finished", ShaderStage::Vertex).is_empty());
    }

    #[test]
    fn empty_log_yields_nothing() {
        assert!(parse_compile_log("", ShaderStage::Fragment).is_empty());
        assert!(parse_compile_log("\n\n  \n", ShaderStage::Fragment).is_empty());
    }

    #[test]
    fn multi_line_logs_parse_each_line_independently() {
        let log = "ERROR: 0:3: missing ';'\nERROR: 0:9: 'vec5' : no such type\n";
        let parsed = parse_compile_log(log, ShaderStage::Fragment);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].line, 2);
        assert_eq!(parsed[1].line, 8);
    }

    #[test]
    fn link_diagnostic_is_generic_and_never_empty() {
        let diagnostic = link_diagnostic("  \n");
        assert_eq!(diagnostic.line, 0);
        assert_eq!(diagnostic.message, "program link failed");

        let diagnostic = link_diagnostic("error: entry points do not match");
        assert_eq!(diagnostic.message, "error: entry points do not match");
    }
}
