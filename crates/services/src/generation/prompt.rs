use std::fmt::Write as _;

use super::source::GenerationRequest;

pub(crate) const SYSTEM_PROMPT: &str = "You write multiple-choice exam questions about drone \
operation and regulation. You answer with a single JSON object and nothing else.";

/// User prompt asking for `request.count()` questions in the quiz schema.
#[must_use]
pub fn build_prompt(request: &GenerationRequest, language: &str) -> String {
    let mut prompt = format!(
        "Generate {count} multiple-choice questions about basic concepts of drones, UAS and RPAS. \
Each question must have 4 answer options and exactly one correct answer. \
The questions should be challenging and cover different aspects such as definitions, \
components and regulations. \
The correct answer must be given as the index (0-3) of the correct option. \
Add a short explanation of why that answer is correct. \
Write the questions in {language}.\n\n\
Respond only with JSON of this shape:\n\
{{\"questions\":[{{\"text\":\"...\",\"options\":[\"...\",\"...\",\"...\",\"...\"],\"correctAnswer\":0,\"explanation\":\"...\"}}]}}",
        count = request.count(),
    );

    if !request.exclude().is_empty() {
        prompt.push_str("\n\nDo not repeat any of these questions:");
        for text in request.exclude() {
            let _ = write!(prompt, "\n- {text}");
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_count_and_language() {
        let prompt = build_prompt(&GenerationRequest::new(7), "Spanish");
        assert!(prompt.starts_with("Generate 7 multiple-choice questions"));
        assert!(prompt.contains("Write the questions in Spanish."));
        assert!(prompt.contains(r#""correctAnswer":0"#));
        assert!(!prompt.contains("Do not repeat"));
    }

    #[test]
    fn prompt_lists_exclusions() {
        let request = GenerationRequest::new(2)
            .with_exclusions(vec!["What is a UAS?".into(), "Who issues drone licences?".into()]);
        let prompt = build_prompt(&request, "English");
        assert!(prompt.ends_with("\n- What is a UAS?\n- Who issues drone licences?"));
    }
}
