//! Text Analyzer Tool
//!
//! Word, character, line and sentence statistics plus a rough reading
//! level and the most frequent words.

use std::collections::HashMap;

use async_trait::async_trait;

use agent_core::{
    tool::{parse_arguments, ParameterSchema},
    AgentError, Result, Tool, ToolSpec,
};

/// Tool for text statistics and analysis
pub struct TextAnalyzerTool;

#[async_trait]
impl Tool for TextAnalyzerTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "text_analyzer".into(),
            description: "Analyze text content: character, word, line and sentence counts, \
                          average word length, reading level and most frequent words."
                .into(),
            parameters: vec![ParameterSchema {
                name: "text".into(),
                param_type: "string".into(),
                description: "The text to analyze".into(),
                required: true,
            }],
        }
    }

    async fn execute(&self, arguments_text: &str) -> Result<String> {
        let args = parse_arguments(arguments_text, "text");
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::ToolExecution("missing 'text' argument".into()))?;

        if text.trim().is_empty() {
            return Err(AgentError::ToolExecution(
                "no text provided for analysis".into(),
            ));
        }

        tracing::debug!(chars = text.len(), "analyzing text");
        Ok(analyze(text))
    }
}

const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Build the analysis report
pub fn analyze(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len();
    let char_count = text.chars().count();
    let char_count_no_spaces = text.chars().filter(|c| *c != ' ').count();
    let line_count = text.lines().count().max(1);

    let sentence_count = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);

    let avg_word_length = if word_count == 0 {
        0.0
    } else {
        let total: usize = words
            .iter()
            .map(|w| w.trim_matches(PUNCTUATION).chars().count())
            .sum();
        total as f64 / word_count as f64
    };

    let reading_level = if avg_word_length < 5.0 {
        "simple"
    } else if avg_word_length < 7.0 {
        "moderate"
    } else {
        "complex"
    };

    let mut report = format!(
        "Text analysis:\n\
         - characters: {char_count} ({char_count_no_spaces} excluding spaces)\n\
         - words: {word_count}\n\
         - lines: {line_count}\n\
         - sentences: {sentence_count}\n\
         - average word length: {avg_word_length:.1} characters\n\
         - reading level: {reading_level}"
    );

    let top = top_words(&words, 3);
    if !top.is_empty() {
        let rendered: Vec<String> = top
            .iter()
            .map(|(word, count)| format!("{word} ({count})"))
            .collect();
        report.push_str(&format!("\nMost frequent words: {}", rendered.join(", ")));
    }

    report
}

/// Most frequent words, ignoring very short ones. Ties break
/// alphabetically so the output is deterministic.
fn top_words<'a>(words: &[&'a str], limit: usize) -> Vec<(String, usize)> {
    let mut frequency: HashMap<String, usize> = HashMap::new();
    for word in words {
        let clean = word.trim_matches(PUNCTUATION).to_lowercase();
        if clean.chars().count() > 2 {
            *frequency.entry(clean).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
