//! Block writer
//! Joins formatted words into lines and numbers them

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// A formatted word; `None` means the tracker suppressed it
pub type Word = Option<String>;

/// Literal word
pub fn word(text: impl Into<String>) -> Word {
    Some(text.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceMode {
    #[serde(alias = "true")]
    On,
    #[serde(alias = "false")]
    Off,
    #[serde(alias = "toolChange")]
    ToolChangeOnly,
}

#[derive(Debug)]
pub struct GCodeOutput {
    pub lines: Vec<String>,
    pub sequence_number: u32,
    pub step: u32,
    pub mode: SequenceMode,
    pub separator: &'static str,
}

impl GCodeOutput {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            sequence_number: 10,
            step: 1,
            mode: SequenceMode::Off,
            separator: " ",
        }
    }

    pub fn with_sequence(mut self, mode: SequenceMode, start: u32, step: u32) -> Self {
        self.mode = mode;
        self.sequence_number = start;
        self.step = step;
        self
    }

    pub fn with_separator(mut self, separate_with_space: bool) -> Self {
        self.separator = if separate_with_space { " " } else { "" };
        self
    }

    /// Write a block; nothing is written when every word is empty.
    pub fn write_block(&mut self, words: &[Word]) {
        let words: Vec<&str> = words
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return;
        }

        let text = words.join(self.separator);
        if self.mode == SequenceMode::On {
            self.lines
                .push(format!("N{}{}{}", self.sequence_number, self.separator, text));
            self.sequence_number = self.sequence_number.saturating_add(self.step);
        } else {
            self.lines.push(text);
        }
    }

    /// Write a tool change block; numbered unless numbering is off.
    pub fn write_tool_block(&mut self, words: &[Word]) {
        let mut scope = ToolBlockScope::enter(self);
        scope.write_block(words);
    }

    pub fn write_comment(&mut self, text: &str) {
        self.lines.push(format_comment(text));
    }

    pub fn write_line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

impl Default for GCodeOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GCodeOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// `(text)` with any parentheses in the text dropped
pub fn format_comment(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
    format!("({})", cleaned)
}

/// Switches numbering on for tool change blocks; the previous mode is
/// restored when the scope is dropped.
pub struct ToolBlockScope<'a> {
    output: &'a mut GCodeOutput,
    saved: SequenceMode,
}

impl<'a> ToolBlockScope<'a> {
    pub fn enter(output: &'a mut GCodeOutput) -> Self {
        let saved = output.mode;
        output.mode = match saved {
            SequenceMode::On | SequenceMode::ToolChangeOnly => SequenceMode::On,
            SequenceMode::Off => SequenceMode::Off,
        };
        Self { output, saved }
    }
}

impl Deref for ToolBlockScope<'_> {
    type Target = GCodeOutput;

    fn deref(&self) -> &GCodeOutput {
        self.output
    }
}

impl DerefMut for ToolBlockScope<'_> {
    fn deref_mut(&mut self) -> &mut GCodeOutput {
        self.output
    }
}

impl Drop for ToolBlockScope<'_> {
    fn drop(&mut self) {
        self.output.mode = self.saved;
    }
}
