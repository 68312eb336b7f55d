//! Line assembly over text chunks.

/// Splits chunks of text into complete lines.
///
/// Accepts `\n`, `\r` and `\r\n` terminators, including a `\r\n` pair split
/// across two chunks. An unterminated tail is held until its terminator
/// arrives or [`LineAssembler::finish`] is called.
#[derive(Debug, Default)]
pub struct LineAssembler {
    partial: String,
    after_cr: bool,
}

impl LineAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the lines it completes. Empty lines are skipped.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let mut lines = Vec::new();

        for ch in chunk.chars() {
            if std::mem::take(&mut self.after_cr) && ch == '\n' {
                continue;
            }
            match ch {
                '\n' => self.complete(&mut lines),
                '\r' => {
                    self.complete(&mut lines);
                    self.after_cr = true;
                }
                _ => self.partial.push(ch),
            }
        }

        lines
    }

    /// Return the held tail, if any, as a final line.
    pub fn finish(&mut self) -> Option<String> {
        self.after_cr = false;
        if self.partial.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.partial))
        }
    }

    /// Forget any held tail.
    pub fn reset(&mut self) {
        self.partial.clear();
        self.after_cr = false;
    }

    fn complete(&mut self, lines: &mut Vec<String>) {
        if !self.partial.is_empty() {
            lines.push(std::mem::take(&mut self.partial));
        }
    }
}
