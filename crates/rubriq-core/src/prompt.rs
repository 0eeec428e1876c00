use crate::answer::format_answer_value;
use crate::error::{ConfigError, Result};

/// Default judge prompt template.
pub const DEFAULT_JUDGE_PROMPT: &str = "\
Given a question and the ground truth answer, determine if the response is correct. \
Respond according to the judge response format.

question={question}
response={response}
ground truth answer={answer}
judge response format={judge_response_format}
";

const REQUIRED_SLOTS: [&str; 4] = ["question", "response", "answer", "judge_response_format"];

/// A judge prompt template with exactly four named slots.
///
/// Construction fails if any of `{question}`, `{response}`, `{answer}`,
/// `{judge_response_format}` is missing, or if an unknown slot appears.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgePrompt {
    template: String,
}

impl JudgePrompt {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let slots = extract_slots(&template);

        for slot in &slots {
            if !REQUIRED_SLOTS.contains(&slot.as_str()) {
                return Err(ConfigError::UnknownTemplateSlot(slot.clone()).into());
            }
        }
        for required in REQUIRED_SLOTS {
            if !slots.iter().any(|s| s == required) {
                return Err(ConfigError::MissingTemplateSlot(required.to_string()).into());
            }
        }

        Ok(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute the four slots and return the prompt sent to the judge.
    pub fn render(
        &self,
        question: &str,
        response: &str,
        answer: f64,
        format_instructions: &str,
    ) -> String {
        self.template
            .replace("{question}", question)
            .replace("{response}", response)
            .replace("{answer}", &format_answer_value(answer))
            .replace("{judge_response_format}", format_instructions)
    }
}

impl Default for JudgePrompt {
    fn default() -> Self {
        // The bundled template always carries all four slots.
        Self {
            template: DEFAULT_JUDGE_PROMPT.to_string(),
        }
    }
}

fn extract_slots(template: &str) -> Vec<String> {
    let mut slots = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                slots.push(after[..close].to_string());
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_is_valid() {
        let prompt = JudgePrompt::new(DEFAULT_JUDGE_PROMPT).unwrap();
        assert_eq!(prompt.template(), DEFAULT_JUDGE_PROMPT);
    }

    #[test]
    fn missing_slot_is_rejected() {
        let err = JudgePrompt::new("question={question} response={response} answer={answer}")
            .unwrap_err();
        assert!(err.to_string().contains("judge_response_format"));
    }

    #[test]
    fn unknown_slot_is_rejected() {
        let err = JudgePrompt::new(
            "q={question} r={response} a={answer} f={judge_response_format} x={extra}",
        )
        .unwrap_err();
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn render_substitutes_all_slots() {
        let prompt = JudgePrompt::default();
        let rendered = prompt.render(
            "Is the scene safe?",
            "prompt: crash site\ncompletion: I checked for hazards",
            1.0,
            "answer in [1.0, 0.0]",
        );
        assert!(rendered.contains("question=Is the scene safe?"));
        assert!(rendered.contains("completion: I checked for hazards"));
        assert!(rendered.contains("ground truth answer=1.0"));
        assert!(rendered.contains("judge response format=answer in [1.0, 0.0]"));
        assert!(!rendered.contains('{'));
    }

    #[test]
    fn render_formats_answer_with_decimal() {
        let prompt = JudgePrompt::default();
        let rendered = prompt.render("q", "r", 0.0, "fmt");
        assert!(rendered.contains("ground truth answer=0.0"));
    }
}
