//! Runtime configuration read from the environment (and `.env`).

use std::path::PathBuf;

use crate::api_connection::endpoints::{default_model, ModelCapability, GEMINI_BASE_URL};

pub const DEFAULT_API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const DEFAULT_STORE_PATH: &str = "food_fusion_saved.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionConfig {
    /// Name of the variable holding the key, not the key itself.
    pub api_key_env_var: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub store_path: PathBuf,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            api_key_env_var: DEFAULT_API_KEY_ENV_VAR.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            text_model: default_model(ModelCapability::Text).to_string(),
            image_model: default_model(ModelCapability::Image).to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl FusionConfig {
    /// Optional variables:
    /// - `API_KEY_ENV`: name of the key variable (default `GEMINI_API_KEY`)
    /// - `GEMINI_BASE_URL`, `GEMINI_TEXT_MODEL`, `GEMINI_IMAGE_MODEL`
    /// - `FOOD_FUSION_STORE`: cookbook file (default `food_fusion_saved.json`)
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_key_env_var: get("API_KEY_ENV").unwrap_or(defaults.api_key_env_var),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            text_model: get("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
            image_model: get("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            store_path: get("FOOD_FUSION_STORE")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
        }
    }
}
