//! Source excerpts with a caret under the offending column.

/// Lines of surrounding context shown above and below the error line.
pub const CONTEXT_LINES: usize = 2;

/// Renders the lines around `line` with a caret pointing at `column`.
///
/// Both `line` and `column` are 1-based. Out-of-range positions are clamped so
/// the function never panics on a stale location.
///
/// ```text
///  3 |     bindings = <&kp A
///  4 |         &kp B
///    |         ^
/// ```
#[must_use]
pub fn render_context(source: &str, line: usize, column: usize) -> String {
    render_context_with(source, line, column, CONTEXT_LINES)
}

/// Same as [`render_context`] with an explicit amount of surrounding lines.
#[must_use]
pub fn render_context_with(source: &str, line: usize, column: usize, around: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let line = line.clamp(1, lines.len());
    let first = line.saturating_sub(around).max(1);
    let last = (line + around).min(lines.len());
    let width = last.to_string().len();

    let mut out = Vec::new();
    for number in first..=last {
        out.push(format!("{number:>width$} | {}", lines[number - 1]));
        if number == line {
            let pad = " ".repeat(column.saturating_sub(1));
            out.push(format!("{} | {pad}^", " ".repeat(width)));
        }
    }

    out.join("\n")
}
