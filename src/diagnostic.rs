use crate::lexer::Span;
use crate::parser::ParseError;
use crate::session::{EvalError, Reason};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    /// Explain why `line` failed: the cause, then the line with carets
    /// under the offending token when the cause has a position.
    pub fn render(&self, line: &str, err: &EvalError) -> String {
        let mut out = String::new();
        let reason = err.reason();
        out.push_str(&format!("{}: {}\n", self.bold_red("error"), self.bold(&reason.to_string())));

        let span = match reason {
            Reason::Parse(e) => e.span(),
            Reason::Vm(_) => None,
        };
        let Some(span) = span else {
            return out;
        };

        let pipe = self.cyan("|");
        out.push_str(&format!("  {} col {}\n", self.cyan("-->"), column(line, span.start)));
        out.push_str(&format!("  {pipe}\n"));
        out.push_str(&format!("  {pipe} {line}\n"));

        let indent = " ".repeat(line[..span.start.min(line.len())].chars().count());
        let width = caret_width(line, span);
        let carets = self.bold_red(&"^".repeat(width));
        let label = match reason {
            Reason::Parse(ParseError::UndefinedVariable { .. }) => "not defined",
            Reason::Parse(ParseError::UnclosedParen { .. }) => "expected ')'",
            Reason::Parse(ParseError::TrailingInput { .. }) => "unexpected",
            _ => "here",
        };
        out.push_str(&format!("  {pipe} {indent}{carets} {}\n", self.bold_red(label)));
        out
    }
}

/// 1-based character column of a byte offset.
fn column(line: &str, offset: usize) -> usize {
    line[..offset.min(line.len())].chars().count() + 1
}

fn caret_width(line: &str, span: Span) -> usize {
    let end = span.end.min(line.len());
    let start = span.start.min(end);
    line[start..end].chars().count().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn explain(line: &str) -> String {
        let err = Session::new().evaluate(line).unwrap_err();
        AnsiRenderer { use_color: false }.render(line, &err)
    }

    #[test]
    fn render_undefined_variable() {
        let out = explain("1 + rate");
        assert_eq!(
            out,
            "error: undefined variable: rate\n  --> col 5\n  |\n  | 1 + rate\n  |     ^^^^ not defined\n"
        );
    }

    #[test]
    fn render_unclosed_paren_points_at_end() {
        let out = explain("(1 + 2");
        assert!(out.contains("expected ')'"));
        assert!(out.contains("  |       ^ expected ')'"), "got:\n{out}");
    }

    #[test]
    fn render_trailing_input() {
        let out = explain("1 )");
        assert!(out.contains("col 3"));
        assert!(out.ends_with("  |   ^ unexpected\n"));
    }

    #[test]
    fn render_without_position() {
        let config = crate::config::Config { heap_base: 2, ..Default::default() };
        let mut s = Session::with_config(config);
        let err = s.evaluate("1 + 1").unwrap_err();
        let out = AnsiRenderer { use_color: false }.render("1 + 1", &err);
        assert!(out.starts_with("error: program of"));
        assert!(!out.contains('|'));
    }

    #[test]
    fn render_color() {
        let err = Session::new().evaluate("q").unwrap_err();
        let out = AnsiRenderer { use_color: true }.render("q", &err);
        assert!(out.contains("\x1b[1;31merror\x1b[0m"));
    }
}
