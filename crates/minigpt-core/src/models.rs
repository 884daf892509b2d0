//! Static table of selectable models.

use serde::Serialize;

/// Display information for a selectable model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Model used when nothing has been selected yet
pub const DEFAULT_MODEL: &str = "grok-4-fast";

pub const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "grok-4-fast",
        name: "Grok 4 Fast",
        description: "Fast Grok model for quick responses",
    },
    ModelInfo {
        id: "deepseek",
        name: "DeepSeek",
        description: "Fast and cost-effective",
    },
    ModelInfo {
        id: "supermind-agent-v1",
        name: "Supermind Agent",
        description: "Multi-tool agent with web search",
    },
    ModelInfo {
        id: "gemini-2.5-pro",
        name: "Gemini 2.5 Pro",
        description: "Google's powerful Gemini model",
    },
    ModelInfo {
        id: "gemini-3-flash-preview",
        name: "Gemini 3 Flash",
        description: "Fast Gemini reasoning model",
    },
    ModelInfo {
        id: "gpt-5",
        name: "GPT-5",
        description: "OpenAI-compatible model",
    },
];

/// Look up a model by id, falling back to the first entry for unknown ids
pub fn model_info(model_id: &str) -> &'static ModelInfo {
    AVAILABLE_MODELS
        .iter()
        .find(|m| m.id == model_id)
        .unwrap_or(&AVAILABLE_MODELS[0])
}

/// The model after `model_id` in the table, wrapping around
pub fn next_model(model_id: &str) -> &'static ModelInfo {
    let index = AVAILABLE_MODELS
        .iter()
        .position(|m| m.id == model_id)
        .map(|i| (i + 1) % AVAILABLE_MODELS.len())
        .unwrap_or(0);
    &AVAILABLE_MODELS[index]
}
