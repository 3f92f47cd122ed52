//! Grounded prompt construction.

const PERSONA_PREAMBLE: &str = "You are a helpful and informative bot that answers questions \
using text from the reference passage included below. Be sure to respond in a complete sentence, \
being comprehensive, including all relevant background information. However, you are talking to \
a non-technical audience, so be sure to break down complicated concepts and strike a friendly \
and conversational tone.";

/// Strip quote characters and flatten the passage onto one line so it cannot
/// break out of the quoted `PASSAGE:` slot.
pub fn sanitize_passage(passage: &str) -> String {
    passage
        .chars()
        .filter_map(|c| match c {
            '\'' | '"' | '\r' => None,
            '\n' => Some(' '),
            other => Some(other),
        })
        .collect()
}

pub fn build_prompt(query: &str, passage: &str) -> String {
    format!(
        "{PERSONA_PREAMBLE}\nQUESTION: '{query}'\nPASSAGE: '{}'\n\nANSWER:\n",
        sanitize_passage(passage)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage_segment(prompt: &str) -> &str {
        let start = prompt.find("PASSAGE: '").expect("passage marker") + "PASSAGE: '".len();
        let end = prompt.rfind("'\n\nANSWER:").expect("answer cue");
        &prompt[start..end]
    }

    #[test]
    fn sanitized_passage_has_no_quotes_or_newlines() {
        let prompt = build_prompt(
            "What did she say?",
            "She said \"hello\".\nIt's 'fine'.\r\nDone.",
        );
        let segment = passage_segment(&prompt);
        assert!(!segment.contains('"'));
        assert!(!segment.contains('\''));
        assert!(!segment.contains('\n'));
        assert!(!segment.contains('\r'));
        assert_eq!(segment, "She said hello. Its fine. Done.");
    }

    #[test]
    fn prompt_contains_persona_question_and_answer_cue() {
        let prompt = build_prompt("What color is the sky?", "The sky is blue.");
        assert!(prompt.starts_with("You are a helpful and informative bot"));
        assert!(prompt.contains("non-technical audience"));
        assert!(prompt.contains("QUESTION: 'What color is the sky?'"));
        assert!(prompt.contains("PASSAGE: 'The sky is blue.'"));
        assert!(prompt.trim_end().ends_with("ANSWER:"));
    }

    #[test]
    fn query_is_inserted_verbatim() {
        let prompt = build_prompt("Why's it \"blue\"?", "x");
        assert!(prompt.contains("QUESTION: 'Why's it \"blue\"?'"));
    }
}
