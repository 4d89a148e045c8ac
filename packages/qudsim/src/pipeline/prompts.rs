//! LLM prompts for segmentation, abstraction, QUD generation and answering.

/// System prompt for atomic-topic segmentation.
pub const SEGMENT_PROMPT: &str = "You will be given text with numbered sentences and your task is to redraw the paragraph boundaries such that each chunk is about one atomic topic. Each segment cannot be about multiple topics or about a complex topic. You may not change the text or change the order of the sentences. For each segment, provide the list of sentence numbers that belong to that segment.";

/// System prompt for decontextualizing segments (abstract level).
pub const ABSTRACT_PROMPT: &str = "You will be given several numbered paragraphs. Decontextualize each paragraph such that the paragraph's general plot is captured. Names, places, extraneous details and descriptive language should all be abstracted away. Return exactly one paragraph per input paragraph, in the same order.";

/// System prompt for QUD generation.
pub const QUD_PROMPT: &str = "You will be given a paragraph. We are interested in forming unique, high-level, abstract QUDs with minimal details such that when they are answered, we understand the main themes of the paragraph. Details specific to the content should be omitted. QUDs should look like: What were the individual's greatest accomplishments? What legacy did the individual leave behind? First answer the minimum number of QUD(s) required. Then list the QUDs. Do not use conjunctions in the QUDs.";

/// System prompt for answering QUDs against a numbered passage.
pub const ANSWER_PROMPT: &str = "You are an expert reading comprehension agent. You will be given a passage with numbered sentences and a series of questions. For each question, your task is to extract all sentences that directly help answer it. You must return the question and a list of sentence numbers and sentences that answer it. The question may not always be answerable. In that case, return an empty list. Do NOT overgenerate. Do not modify the original text.";

/// Separator between segments and between questions in prompts.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Segmentation input: the numbered text with paragraph breaks flattened.
pub fn format_segment_prompt(numbered_text: &str) -> String {
    numbered_text.split(BLOCK_SEPARATOR).collect::<Vec<_>>().join(" ")
}

/// Abstraction input: `[0] first segment\n\n[1] second segment...`
pub fn format_abstract_prompt(segment_texts: &[String]) -> String {
    segment_texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i, text))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Cross-answer input: the passage followed by the questions.
pub fn format_answer_prompt(numbered_text: &str, questions: &[&str]) -> String {
    format!(
        "Passage: {}\nQuestions:\n{}",
        numbered_text,
        questions.join(BLOCK_SEPARATOR)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_not_empty() {
        assert!(!SEGMENT_PROMPT.is_empty());
        assert!(!ABSTRACT_PROMPT.is_empty());
        assert!(!QUD_PROMPT.is_empty());
        assert!(!ANSWER_PROMPT.is_empty());
    }

    #[test]
    fn test_format_abstract_prompt_is_zero_indexed() {
        let prompt = format_abstract_prompt(&["Alpha.".to_string(), "Beta.".to_string()]);
        assert_eq!(prompt, "[0] Alpha.\n\n[1] Beta.");
    }

    #[test]
    fn test_format_answer_prompt() {
        let prompt = format_answer_prompt("[1] A.", &["Who?", "Why?"]);
        assert_eq!(prompt, "Passage: [1] A.\nQuestions:\nWho?\n\nWhy?");
    }

    #[test]
    fn test_format_segment_prompt_flattens_paragraphs() {
        assert_eq!(format_segment_prompt("[1] A.\n\n[2] B."), "[1] A. [2] B.");
    }
}
