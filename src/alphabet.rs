use anyhow::{anyhow, Result};
use rustfst::Label;
use std::collections::HashMap;

/// Output strings for the symbols of the decoding alphabet.
#[derive(Debug, Clone, Default)]
pub struct Alphabet {
    /// String for each symbol ID
    chars: Vec<String>,
    /// Reverse mapping of `chars`
    index: HashMap<String, Label>,
    /// ID of the word boundary symbol (a single space), if any
    space_id: Option<Label>,
}

impl Alphabet {
    pub fn new<S: Into<String>>(chars: impl IntoIterator<Item = S>) -> Self {
        let chars: Vec<String> = chars.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(chars.len());
        let mut space_id = None;
        for (id, c) in chars.iter().enumerate() {
            let id = id as Label;
            if c == " " {
                space_id = Some(id);
            }
            index.insert(c.clone(), id);
        }
        Self {
            chars,
            index,
            space_id,
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn space_id(&self) -> Option<Label> {
        self.space_id
    }

    pub fn chars(&self) -> &[String] {
        &self.chars
    }

    /// String for a symbol ID.
    pub fn get(&self, id: Label) -> Option<&str> {
        self.chars.get(id as usize).map(String::as_str)
    }

    /// Symbol ID for a string.
    pub fn label(&self, c: &str) -> Option<Label> {
        self.index.get(c).copied()
    }

    /// Concatenate the strings for a sequence of symbol IDs.
    pub fn labels_to_string<'a, I>(&self, labels: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a Label>,
    {
        let mut text = String::new();
        for &label in labels {
            let c = self
                .get(label)
                .ok_or_else(|| anyhow!("Symbol {} not in alphabet of size {}", label, self.len()))?;
            text.push_str(c);
        }
        Ok(text)
    }

    /// Map each code point of `text` to its symbol ID, or `None` if
    /// any of them is not in the alphabet.
    pub fn string_to_labels(&self, text: &str) -> Option<Vec<Label>> {
        let mut buf = [0u8; 4];
        text.chars()
            .map(|c| self.label(c.encode_utf8(&mut buf)))
            .collect()
    }
}
