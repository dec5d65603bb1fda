use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Language {
    Turkish,
    Italian,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Turkish, Language::Italian];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Turkish => "Turkish",
            Language::Italian => "Italian",
        }
    }

    /// Two real words shown to the model as examples of valid keys.
    pub fn example_words(&self) -> (&'static str, &'static str) {
        match self {
            Language::Turkish => ("Bisiklete", "binen"),
            Language::Italian => ("Io", "faccio"),
        }
    }

    /// Matches the language name case-insensitively. Surrounding whitespace is
    /// not stripped, so `" turkish"` is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = capitalize(value);
        Self::ALL
            .into_iter()
            .find(|language| language.as_str() == normalized)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
