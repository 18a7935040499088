use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("Please enter a first ingredient.")]
    MissingFirstFood,
    #[error("Please enter a second ingredient.")]
    MissingSecondFood,
}

/// Two ingredient names to fuse. Both are non-blank; text is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFusionRequest")]
pub struct FusionRequest {
    food1: String,
    food2: String,
}

#[derive(Deserialize)]
struct RawFusionRequest {
    food1: String,
    food2: String,
}

impl TryFrom<RawFusionRequest> for FusionRequest {
    type Error = InvalidRequest;

    fn try_from(raw: RawFusionRequest) -> Result<Self, Self::Error> {
        Self::new(raw.food1, raw.food2)
    }
}

impl FusionRequest {
    pub fn new(food1: impl Into<String>, food2: impl Into<String>) -> Result<Self, InvalidRequest> {
        let food1 = food1.into();
        let food2 = food2.into();
        if food1.trim().is_empty() {
            return Err(InvalidRequest::MissingFirstFood);
        }
        if food2.trim().is_empty() {
            return Err(InvalidRequest::MissingSecondFood);
        }
        Ok(Self { food1, food2 })
    }

    pub fn food1(&self) -> &str {
        &self.food1
    }

    pub fn food2(&self) -> &str {
        &self.food2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Moderate,
    Experimental,
}

impl Difficulty {
    pub const ALL: [&'static str; 3] = ["Easy", "Moderate", "Experimental"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Moderate => "Moderate",
            Difficulty::Experimental => "Experimental",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionPhase {
    pub phase: String,
    pub steps: Vec<String>,
}

/// The fields produced by text generation, before an image is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecipe {
    pub dish_name: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<InstructionPhase>,
    pub flavor_profile: Vec<String>,
    pub difficulty: Difficulty,
    pub viral_score: i64,
    pub viral_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionRecipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,
    pub dish_name: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<InstructionPhase>,
    pub flavor_profile: Vec<String>,
    pub difficulty: Difficulty,
    pub viral_score: i64,
    pub viral_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl FusionRecipe {
    pub fn from_parts(generated: GeneratedRecipe, image_url: Option<String>) -> Self {
        Self {
            id: None,
            saved_at: None,
            dish_name: generated.dish_name,
            description: generated.description,
            ingredients: generated.ingredients,
            instructions: generated.instructions,
            flavor_profile: generated.flavor_profile,
            difficulty: generated.difficulty,
            viral_score: generated.viral_score,
            viral_reason: generated.viral_reason,
            image_url,
        }
    }

    /// Decodes the embedded `data:<mime>;base64,<payload>` image.
    pub fn image_bytes(&self) -> Option<(String, Vec<u8>)> {
        let url = self.image_url.as_deref()?;
        let rest = url.strip_prefix("data:")?;
        let (mime, payload) = rest.split_once(";base64,")?;
        let bytes = STANDARD.decode(payload).ok()?;
        Some((mime.to_string(), bytes))
    }
}

pub fn data_uri(mime_type: &str, base64_payload: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64_payload)
}
