//! Joins the mandatory recipe text and the optional illustration into one
//! [`FusionRecipe`], and rewrites every failure into a user-facing category.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api_connection::connection::{ApiConnectionError, GenerativeBackend};
use crate::api_connection::endpoints::{default_model, ModelCapability};
use crate::recipe::{FusionRecipe, FusionRequest};
use crate::recipe_image::generate_recipe_image;
use crate::recipe_text::{generate_recipe_text, RecipeTextError};

/// Messages carrying this text are internal and never shown verbatim.
pub const GENERIC_FAILURE_SENTINEL: &str = "Failed to generate";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FusionError {
    #[error("Configuration Error: Invalid API Key. Please check your settings.")]
    InvalidApiKey,
    #[error("The kitchen is too busy! (Rate Limit Reached). Please wait a minute and try again.")]
    RateLimited,
    #[error("The AI service is currently overloaded. Please try again shortly.")]
    Overloaded,
    #[error("Safety Filter: These ingredients flagged our safety guidelines. Please try different foods.")]
    SafetyFilter,
    #[error("Network Error: Please check your internet connection.")]
    Network,
    #[error("{0}")]
    Upstream(String),
    #[error("Whoops! We couldn't cook that up. Please try again.")]
    Generic,
}

/// Classifies free-form error text. Signals are checked in a fixed priority
/// order; the first group with a match wins.
pub fn classify_failure(message: &str) -> FusionError {
    let lowered = message.to_lowercase();
    let has_any = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));

    if has_any(&["403", "api key"]) {
        FusionError::InvalidApiKey
    } else if has_any(&["429", "quota", "exhausted"]) {
        FusionError::RateLimited
    } else if has_any(&["503", "overloaded"]) {
        FusionError::Overloaded
    } else if has_any(&["safety", "blocked"]) {
        FusionError::SafetyFilter
    } else if has_any(&["network", "fetch", "failed to fetch"]) {
        FusionError::Network
    } else if !message.trim().is_empty() && !message.contains(GENERIC_FAILURE_SENTINEL) {
        FusionError::Upstream(message.to_string())
    } else {
        FusionError::Generic
    }
}

fn classify_api_error(err: &ApiConnectionError) -> Option<FusionError> {
    match err {
        ApiConnectionError::MissingApiKey(_) => Some(FusionError::InvalidApiKey),
        ApiConnectionError::NetworkError(e) if e.status().is_none() => Some(FusionError::Network),
        _ => match err.status()?.as_u16() {
            401 | 403 => Some(FusionError::InvalidApiKey),
            429 => Some(FusionError::RateLimited),
            503 => Some(FusionError::Overloaded),
            _ => None,
        },
    }
}

impl From<&RecipeTextError> for FusionError {
    fn from(err: &RecipeTextError) -> Self {
        if let RecipeTextError::Api(api_err) = err {
            if let Some(category) = classify_api_error(api_err) {
                return category;
            }
        }
        classify_failure(&err.to_string())
    }
}

pub struct FusionKitchen {
    backend: Arc<dyn GenerativeBackend>,
    text_model: String,
    image_model: String,
    sequence: AtomicU64,
}

impl FusionKitchen {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self::with_models(
            backend,
            default_model(ModelCapability::Text),
            default_model(ModelCapability::Image),
        )
    }

    pub fn with_models(backend: Arc<dyn GenerativeBackend>, text_model: &str, image_model: &str) -> Self {
        Self {
            backend,
            text_model: text_model.to_string(),
            image_model: image_model.to_string(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Runs the text and image generations concurrently. Only the text
    /// generation can fail the whole request.
    pub async fn generate(&self, request: &FusionRequest) -> Result<FusionRecipe, FusionError> {
        info!(food1 = request.food1(), food2 = request.food2(), "generating fusion recipe");

        let (text, image_url) = tokio::join!(
            generate_recipe_text(self.backend.as_ref(), &self.text_model, request),
            generate_recipe_image(self.backend.as_ref(), &self.image_model, request),
        );

        match text {
            Ok(generated) => {
                info!(
                    dish_name = %generated.dish_name,
                    has_image = image_url.is_some(),
                    "fusion recipe ready"
                );
                Ok(FusionRecipe::from_parts(generated, image_url))
            }
            Err(e) => {
                error!(error = %e, "Gemini API error");
                Err(FusionError::from(&e))
            }
        }
    }

    /// Like [`generate`](Self::generate), but returns `None` when another
    /// generation was started on this kitchen before this one finished.
    pub async fn generate_latest(
        &self,
        request: &FusionRequest,
    ) -> Option<Result<FusionRecipe, FusionError>> {
        let ticket = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.generate(request).await;
        if self.sequence.load(Ordering::SeqCst) == ticket {
            Some(outcome)
        } else {
            debug!(ticket, "discarding superseded fusion result");
            None
        }
    }
}
