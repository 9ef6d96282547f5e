//! Fixed index → letter table used by the classifier.

use std::collections::BTreeMap;

/// Maps classifier label indices to letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    letters: Vec<char>,
}

impl LabelMap {
    /// The 26-entry Latin alphabet table: `0 → 'A'` … `25 → 'Z'`.
    pub fn latin() -> Self {
        Self {
            letters: ('A'..='Z').collect(),
        }
    }

    pub fn letter(&self, label_index: usize) -> Option<char> {
        self.letters.get(label_index).copied()
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Ordered view suitable for serialization (`{"0": "A", ...}`).
    pub fn entries(&self) -> BTreeMap<usize, char> {
        self.letters.iter().copied().enumerate().collect()
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::latin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_table() {
        let labels = LabelMap::latin();
        assert_eq!(labels.len(), 26);
        assert_eq!(labels.letter(0), Some('A'));
        assert_eq!(labels.letter(25), Some('Z'));
        assert_eq!(labels.letter(26), None);
        assert_eq!(labels.entries().get(&2), Some(&'C'));
    }
}
