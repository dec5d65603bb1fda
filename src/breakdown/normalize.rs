use serde_json::{Map, Value};

use super::{BreakdownError, OrderedBreakdown, WordEntry, MATRIX_FIELD, SENTENCE_FIELD};

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Require `relationship_matrix`, when present, to be a square 0/1 matrix
    /// sized to the word count. Off unless configured.
    pub validate_relationship_matrix: bool,
}

pub fn normalize(
    payload: &str,
    options: NormalizeOptions,
) -> Result<OrderedBreakdown, BreakdownError> {
    let document: Value = serde_json::from_str(payload)?;
    let mut fields = match document {
        Value::Object(fields) => fields,
        other => {
            return Err(BreakdownError::UnexpectedShape {
                detail: format!("expected a JSON object, got {}", kind_of(&other)),
            });
        }
    };

    let sentence = match fields.get_mut(SENTENCE_FIELD).map(Value::take) {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(BreakdownError::UnexpectedShape {
                detail: format!(
                    "'{}' must be an object keyed by word, got {}",
                    SENTENCE_FIELD,
                    kind_of(&other)
                ),
            });
        }
    };

    let mut words = sentence
        .into_iter()
        .map(|(word, record)| word_entry(word, record))
        .collect::<Result<Vec<_>, _>>()?;
    // `sort_by` is stable, so equal positions keep the model's key order.
    words.sort_by(|left, right| left.position.total_cmp(&right.position));

    if options.validate_relationship_matrix {
        if let Some(matrix) = fields.get(MATRIX_FIELD) {
            validate_matrix(matrix, words.len())?;
        }
    }

    Ok(OrderedBreakdown::new(words, fields))
}

fn word_entry(word: String, record: Value) -> Result<WordEntry, BreakdownError> {
    let Value::Object(analysis) = record else {
        return Err(BreakdownError::MissingPosition { word });
    };
    let position = match analysis.get("position") {
        None => return Err(BreakdownError::MissingPosition { word }),
        Some(Value::Number(number)) => number.as_f64(),
        Some(_) => None,
    };
    let Some(position) = position else {
        return Err(BreakdownError::InvalidPosition { word });
    };
    Ok(WordEntry {
        word,
        position,
        analysis,
    })
}

fn validate_matrix(matrix: &Value, size: usize) -> Result<(), BreakdownError> {
    let invalid = |reason: String| BreakdownError::InvalidMatrix { reason };
    let rows = matrix
        .as_array()
        .ok_or_else(|| invalid(format!("expected an array of rows, got {}", kind_of(matrix))))?;
    if rows.len() != size {
        return Err(invalid(format!("expected {} rows, got {}", size, rows.len())));
    }
    for (index, row) in rows.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| invalid(format!("row {} is not an array", index)))?;
        if cells.len() != size {
            return Err(invalid(format!(
                "row {} has {} entries, expected {}",
                index,
                cells.len(),
                size
            )));
        }
        if let Some(cell) = cells.iter().find(|cell| !matches!(cell.as_u64(), Some(0 | 1))) {
            return Err(invalid(format!("row {} contains {}, expected 0 or 1", index, cell)));
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
