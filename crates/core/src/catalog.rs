//! Static model catalog.
//!
//! The set of models a generation may target is fixed at build time;
//! the orchestrator validates requests against it and the API exposes
//! it read-only, optionally filtered by modality.

use serde::{Deserialize, Serialize};

/// What kind of content a model produces from a text prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modality {
    TextToText,
    TextToImage,
    TextToVideo,
    TextToAudio,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::TextToText => "text-to-text",
            Modality::TextToImage => "text-to-image",
            Modality::TextToVideo => "text-to-video",
            Modality::TextToAudio => "text-to-audio",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text-to-text" => Ok(Modality::TextToText),
            "text-to-image" => Ok(Modality::TextToImage),
            "text-to-video" => Ok(Modality::TextToVideo),
            "text-to-audio" => Ok(Modality::TextToAudio),
            other => Err(format!(
                "unknown modality '{other}'. Valid: text-to-text, text-to-image, \
                 text-to-video, text-to-audio"
            )),
        }
    }
}

/// One entry in the model catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub modality: Modality,
}

/// Every model this deployment can route generations to.
pub const MODELS: &[ModelSpec] = &[
    ModelSpec {
        id: "gpt-4o-mini",
        name: "GPT-4o Mini",
        modality: Modality::TextToText,
    },
    ModelSpec {
        id: "gpt-4o",
        name: "GPT-4o",
        modality: Modality::TextToText,
    },
    ModelSpec {
        id: "dall-e-3",
        name: "DALL-E 3",
        modality: Modality::TextToImage,
    },
    ModelSpec {
        id: "sora-1",
        name: "Sora",
        modality: Modality::TextToVideo,
    },
    ModelSpec {
        id: "tts-1",
        name: "TTS-1",
        modality: Modality::TextToAudio,
    },
];

/// Look up a model by id.
pub fn find_model(id: &str) -> Option<&'static ModelSpec> {
    MODELS.iter().find(|m| m.id == id)
}

/// List catalog entries, optionally restricted to one modality.
pub fn list_models(modality: Option<Modality>) -> Vec<&'static ModelSpec> {
    MODELS
        .iter()
        .filter(|m| modality.map_or(true, |wanted| m.modality == wanted))
        .collect()
}
