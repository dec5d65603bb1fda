use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::languages::Language;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides detailed grammatical breakdowns of sentences.";

const BREAKDOWN_TEMPLATE: &str = include_str!("templates/breakdown.tera");

pub fn build_prompt(sentence: &str, language: Language) -> Result<String> {
    let (first_example, second_example) = language.example_words();
    let mut context = TeraContext::new();
    context.insert("language", language.as_str());
    context.insert("sentence", sentence);
    context.insert("first_example", first_example);
    context.insert("second_example", second_example);

    Tera::one_off(BREAKDOWN_TEMPLATE, &context, false)
        .with_context(|| "failed to render breakdown prompt")
}
