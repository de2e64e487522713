use honyaku_types::ModelDescriptor;

/// Built-in model list. The first entry is the reference model.
pub fn default_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor {
            id: "hf.co/LiquidAI/LFM2-350M-ENJP-MT-GGUF:Q8_0".to_string(),
            display_name: "LFM2-350M".to_string(),
            description: "Fast bidirectional Japanese/English translation model".to_string(),
            requires_system_prompt: true,
            needs_strict_output_instruction: false,
        },
        ModelDescriptor {
            id: "qwen2.5:1.5b-instruct".to_string(),
            display_name: "Qwen2.5-1.5B".to_string(),
            description: "General instruction model, slower but handles longer text".to_string(),
            requires_system_prompt: true,
            needs_strict_output_instruction: true,
        },
        ModelDescriptor {
            id: "gemma2:2b".to_string(),
            display_name: "Gemma2-2B".to_string(),
            description: "General instruction model".to_string(),
            requires_system_prompt: true,
            needs_strict_output_instruction: true,
        },
    ]
}
