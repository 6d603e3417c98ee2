//! Reference directives in submission text.
//!
//! A directive occupies a whole line:
//!
//! ```text
//! #r "package: Kiln.Json, 2.1.0"
//! #r "tools/app.kproj"
//! #r "Kiln.Text"          // trailing comments are allowed
//! ```
//!
//! Lines that only look similar (`#r` without a quoted value, other `#`
//! words) are left in the text for the compiler to report.

/// One `#r "value"` line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceDirective {
    /// 0-based line index in the submission.
    pub line: usize,
    /// The quoted value without its quotes.
    pub value: String,
}

impl ReferenceDirective {
    /// A directive that did not come from submission text.
    pub fn detached(value: impl Into<String>) -> Self {
        ReferenceDirective {
            line: 0,
            value: value.into(),
        }
    }

    /// The value after a case-insensitive `prefix:`, trimmed.
    pub fn strip_scheme(&self, scheme: &str) -> Option<&str> {
        let value = self.value.trim_start();
        let (head, rest) = value.split_once(':')?;
        head.trim()
            .eq_ignore_ascii_case(scheme)
            .then(|| rest.trim())
    }
}

/// Find every well-formed reference directive, in line order.
pub fn scan_directives(text: &str) -> Vec<ReferenceDirective> {
    text.lines()
        .enumerate()
        .filter_map(|(line, content)| {
            parse_line(content).map(|value| ReferenceDirective {
                line,
                value: value.to_string(),
            })
        })
        .collect()
}

fn parse_line(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("#r")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('"')?;
    let (value, tail) = rest.split_once('"')?;
    let tail = tail.trim();
    let tail = tail.strip_prefix(';').map_or(tail, str::trim_start);
    (tail.is_empty() || tail.starts_with("//")).then_some(value)
}

/// `text` with the given lines emptied, keeping line numbering intact.
pub fn blank_lines(text: &str, lines: &[usize]) -> String {
    if lines.is_empty() {
        return text.to_string();
    }
    text.split('\n')
        .enumerate()
        .map(|(index, content)| if lines.contains(&index) { "" } else { content })
        .collect::<Vec<_>>()
        .join("\n")
}
