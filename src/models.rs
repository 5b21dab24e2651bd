//! # Model Catalog
//!
//! Static table of the models the playground offers, plus the routing rule
//! that maps a model identifier onto a provider family. The rule is part of
//! the wire contract: ids starting with `gpt-` go to OpenAI, everything else
//! goes to Groq. The catalog is display metadata only; unknown ids still route.

use serde::Serialize;
use std::fmt;

/// Model used when a request does not name one.
pub const DEFAULT_MODEL_ID: &str = "llama-3.3-70b-versatile";

/// Model preselected for the right-hand panel in compare mode.
pub const DEFAULT_COMPARE_MODEL_ID: &str = "gpt-3.5-turbo";

/// Prefix that selects the OpenAI family.
const OPENAI_PREFIX: &str = "gpt-";

/// # Provider Family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Groq,
    OpenAI,
}

impl Provider {
    /// Route a model identifier to its provider family.
    pub fn for_model(model_id: &str) -> Self {
        if model_id.starts_with(OPENAI_PREFIX) {
            Provider::OpenAI
        } else {
            Provider::Groq
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn credential_env(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::OpenAI => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// # Model Descriptor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub provider: Provider,
    pub context_window: u32,
    pub description: &'static str,
}

static MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "llama-3.3-70b-versatile",
        display_name: "LLaMA 3.3 70B",
        provider: Provider::Groq,
        context_window: 128_000,
        description: "Groq - Fast and powerful open-source model",
    },
    ModelDescriptor {
        id: "llama-3.1-8b-instant",
        display_name: "LLaMA 3.1 8B Instant",
        provider: Provider::Groq,
        context_window: 128_000,
        description: "Groq - Ultra-fast lightweight model",
    },
    ModelDescriptor {
        id: "mixtral-8x7b-32768",
        display_name: "Mixtral 8x7B",
        provider: Provider::Groq,
        context_window: 32_768,
        description: "Groq - Mixture of experts model",
    },
    ModelDescriptor {
        id: "gemma2-9b-it",
        display_name: "Gemma 2 9B",
        provider: Provider::Groq,
        context_window: 8_192,
        description: "Groq - Google Gemma 2 model",
    },
    ModelDescriptor {
        id: "gpt-3.5-turbo",
        display_name: "GPT-3.5 Turbo",
        provider: Provider::OpenAI,
        context_window: 16_385,
        description: "OpenAI - Fast and cost-efficient",
    },
    ModelDescriptor {
        id: "gpt-4o-mini",
        display_name: "GPT-4o Mini",
        provider: Provider::OpenAI,
        context_window: 128_000,
        description: "OpenAI - Affordable GPT-4 quality",
    },
    ModelDescriptor {
        id: "gpt-4o",
        display_name: "GPT-4o",
        provider: Provider::OpenAI,
        context_window: 128_000,
        description: "OpenAI - Most capable model",
    },
];

/// Every model in the catalog, in display order.
pub fn all() -> &'static [ModelDescriptor] {
    MODELS
}

/// Look up a catalog entry by id.
pub fn find(id: &str) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|m| m.id == id)
}

/// The catalog entry for [`DEFAULT_MODEL_ID`].
pub fn default_model() -> &'static ModelDescriptor {
    &MODELS[0]
}
