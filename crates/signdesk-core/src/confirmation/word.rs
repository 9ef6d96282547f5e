use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether new confirmed letters are accepted into the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    /// Accepting confirmed letters.
    #[default]
    Active,
    /// Word complete; display only until a space, backspace or clear.
    Frozen,
}

impl Formation {
    pub fn is_active(self) -> bool {
        matches!(self, Formation::Active)
    }
}

/// Ordered sequence of confirmed characters (letters or the space).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Word {
    chars: Vec<char>,
}

impl Word {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: char) {
        self.chars.push(c);
    }

    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl From<&str> for Word {
    fn from(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
        }
    }
}
