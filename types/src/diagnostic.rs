//! Diagnostics emitted by GHCi during `:load`.

/// Severity of a diagnostic, classified from the leading token of its
/// message. GHCi prefixes warnings with `warning:`; anything else
/// (type errors, deferred holes) is treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// Classify a diagnostic message by its leading token.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        if message.starts_with("warning") {
            Self::Warning
        } else {
            Self::Error
        }
    }

    /// Kakoune face color for the gutter flag.
    #[must_use]
    pub fn gutter_color(self) -> &'static str {
        match self {
            Self::Warning => "yellow",
            Self::Error => "red",
        }
    }
}

/// A 1-based position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    filename: String,
    line: u32,
    col: u32,
}

impl Position {
    /// Construct a position. Line and column are 1-based.
    #[must_use]
    pub fn new(filename: String, line: u32, col: u32) -> Self {
        Self {
            filename,
            line,
            col,
        }
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// 1-based line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.col
    }
}

/// A single GHCi diagnostic tied to a buffer position.
///
/// Structural equality is the dedup key: two diagnostics with the same
/// position and message are the same diagnostic. Fields are private;
/// the only permitted mutation after construction is [`clamp_line`],
/// applied once when the diagnostic enters the index.
///
/// [`clamp_line`]: Diagnostic::clamp_line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    position: Position,
    message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(position: Position, message: String) -> Self {
        Self { position, message }
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        self.position.filename()
    }

    /// 1-based line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.position.line()
    }

    /// 1-based column.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.position.col()
    }

    /// The full message. May span multiple lines.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::classify(&self.message)
    }

    /// Clamp the line to the current buffer length. GHCi reports
    /// positions against the file on disk, which can exceed the buffer
    /// after unsaved deletions.
    pub fn clamp_line(&mut self, buf_line_count: u32) {
        if self.position.line > buf_line_count {
            self.position.line = buf_line_count;
        }
    }
}
