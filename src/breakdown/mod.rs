//! Turns an untrusted model reply into an ordered sentence breakdown.
//!
//! The pipeline is [`extract`] followed by [`normalize`]. Both stages fail
//! fast with a [`BreakdownError`] and never return partial output.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::providers::GatewayError;

mod extract;
mod normalize;

pub use extract::extract;
pub use normalize::{normalize, NormalizeOptions};

pub const SENTENCE_FIELD: &str = "sentence";
pub const MATRIX_FIELD: &str = "relationship_matrix";

#[derive(Debug, Error)]
pub enum BreakdownError {
    #[error("Please provide a valid sentence and language (Turkish or Italian)")]
    Validation,
    #[error(transparent)]
    Upstream(#[from] GatewayError),
    #[error("model did not answer within {0:?}")]
    UpstreamTimeout(Duration),
    #[error("No JSON found in OpenAI response")]
    NoJsonFound,
    #[error("{message}")]
    JsonDecode {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unexpected breakdown shape: {detail}")]
    UnexpectedShape { detail: String },
    #[error("word '{word}' has no position")]
    MissingPosition { word: String },
    #[error("word '{word}' has a non-numeric position")]
    InvalidPosition { word: String },
    #[error("invalid relationship matrix: {reason}")]
    InvalidMatrix { reason: String },
    #[error("{0}")]
    Unexpected(String),
}

impl From<serde_json::Error> for BreakdownError {
    fn from(err: serde_json::Error) -> Self {
        BreakdownError::JsonDecode {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// One analysed word. `analysis` holds the model's fields exactly as received,
/// including `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct WordEntry {
    pub word: String,
    pub position: f64,
    pub analysis: Map<String, Value>,
}

impl Serialize for WordEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // A `word` field inside the record wins over the key, but stays first.
        let overridden = self.analysis.get("word");
        let len = self.analysis.len() + usize::from(overridden.is_none());
        let mut map = serializer.serialize_map(Some(len))?;
        match overridden {
            Some(value) => map.serialize_entry("word", value)?,
            None => map.serialize_entry("word", &self.word)?,
        }
        for (key, value) in &self.analysis {
            if key != "word" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// The canonical response: words as a position-ordered array, every other
/// top-level field of the model's object kept in received order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedBreakdown {
    pub words: Vec<WordEntry>,
    fields: Map<String, Value>,
}

impl OrderedBreakdown {
    pub(crate) fn new(words: Vec<WordEntry>, mut fields: Map<String, Value>) -> Self {
        // The slot only records where `sentence` goes; `words` fills it.
        fields.insert(SENTENCE_FIELD.to_string(), Value::Null);
        Self { words, fields }
    }

    pub fn relationship_matrix(&self) -> Option<&Value> {
        self.fields.get(MATRIX_FIELD)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        if name == SENTENCE_FIELD {
            return None;
        }
        self.fields.get(name)
    }

    /// Re-keys the words by text, the shape the model is asked to produce.
    pub fn to_sentence_mapping(&self) -> Map<String, Value> {
        self.words
            .iter()
            .map(|entry| (entry.word.clone(), Value::Object(entry.analysis.clone())))
            .collect()
    }
}

impl Serialize for OrderedBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            if key == SENTENCE_FIELD {
                map.serialize_entry(key, &self.words)?;
            } else {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
