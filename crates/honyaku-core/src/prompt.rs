use honyaku_inference::ChatTurn;
use honyaku_types::ModelDescriptor;

use crate::language::Direction;

/// Appended for instruction-tuned chat models that like to add commentary
pub const STRICT_OUTPUT_INSTRUCTION: &str = "Output only the translation. Do not add explanations, notes, greetings, or any other text.";

/// System instruction for `text`, or `None` when the model takes raw input
pub fn system_instruction(descriptor: &ModelDescriptor, text: &str) -> Option<String> {
    if !descriptor.requires_system_prompt && !descriptor.needs_strict_output_instruction {
        return None;
    }

    let instruction = Direction::detect(text).instruction();
    if descriptor.needs_strict_output_instruction {
        Some(format!("{} {}", instruction, STRICT_OUTPUT_INSTRUCTION))
    } else {
        Some(instruction.to_string())
    }
}

/// Chat turns for one translation: optional system turn, then the literal input
pub fn build_request(descriptor: &ModelDescriptor, text: &str) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(2);
    if let Some(instruction) = system_instruction(descriptor, text) {
        turns.push(ChatTurn::system(instruction));
    }
    turns.push(ChatTurn::user(text));
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use honyaku_inference::Role;

    fn descriptor(requires: bool, strict: bool) -> ModelDescriptor {
        ModelDescriptor {
            id: "m".to_string(),
            display_name: "M".to_string(),
            description: String::new(),
            requires_system_prompt: requires,
            needs_strict_output_instruction: strict,
        }
    }

    #[test]
    fn test_reference_model_gets_plain_instruction() {
        let turns = build_request(&descriptor(true, false), "こんにちは");
        assert_eq!(
            turns,
            vec![
                ChatTurn::system("Translate to English."),
                ChatTurn::user("こんにちは"),
            ]
        );
    }

    #[test]
    fn test_strict_instruction_is_appended() {
        let turns = build_request(&descriptor(true, true), "Hello");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::System);
        assert!(turns[0].content.starts_with("Translate to Japanese. "));
        assert!(turns[0].content.ends_with(STRICT_OUTPUT_INSTRUCTION));
    }

    #[test]
    fn test_no_system_turn_when_not_needed() {
        let turns = build_request(&descriptor(false, false), "Hello");
        assert_eq!(turns, vec![ChatTurn::user("Hello")]);
    }

    #[test]
    fn test_empty_input_is_degenerate_but_valid() {
        let turns = build_request(&descriptor(true, false), "");
        assert_eq!(turns[0].content, "Translate to Japanese.");
        assert_eq!(turns[1].content, "");
    }
}
