//! Output sinks for top-level render calls.

/// Receives rendered output one line at a time.
pub trait OutputSink {
    fn send(&mut self, line: &str);
}

impl<F: FnMut(&str)> OutputSink for F {
    fn send(&mut self, line: &str) {
        self(line)
    }
}

/// Collects lines in memory; [`LineBuffer::join`] gives the rendered text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    lines: Vec<String>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines joined with `\n`.
    pub fn join(&self) -> String {
        self.lines.join("\n")
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl OutputSink for LineBuffer {
    fn send(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_joins_with_newlines() {
        let mut buffer = LineBuffer::new();
        buffer.send("a");
        buffer.send("b");
        assert_eq!(buffer.join(), "a\nb");
        assert_eq!(buffer.lines().len(), 2);
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |line: &str| seen.push(line.len());
            let sink: &mut dyn OutputSink = &mut sink;
            sink.send("abc");
        }
        assert_eq!(seen, vec![3]);
    }
}
