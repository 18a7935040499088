use tracing::{debug, error};

use crate::api_connection::connection::{ApiConnectionError, GenerativeBackend};
use crate::api_connection::endpoints::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, Schema,
    SchemaType,
};
use crate::recipe::{Difficulty, FusionRequest, GeneratedRecipe};

pub const RECIPE_TEMPERATURE: f32 = 0.8;

pub const SYSTEM_INSTRUCTION: &str = "You are a friendly, professional chef who creates innovative fusion recipes. Write in clear, accessible language suitable for home cooks.";

#[derive(Debug, thiserror::Error)]
pub enum RecipeTextError {
    #[error("No recipe could be generated. This might be due to safety filters for the requested ingredients.")]
    NoRecipeGenerated,
    #[error("The AI cooked up something, but the recipe format was a bit off. Please try again.")]
    MalformedRecipe(#[source] Option<serde_json::Error>),
    #[error(transparent)]
    Api(#[from] ApiConnectionError),
}

pub fn build_recipe_prompt(request: &FusionRequest) -> String {
    format!(
        "Create a unique, delicious fusion recipe by combining \"{}\" and \"{}\".

The recipe should be realistic and edible.
Focus on how the textures and flavors of these two items can work together.
Provide exact measurements for ingredients.
Write the instructions in simple, friendly, and easy-to-understand language.
The viral score should reflect how interesting or appetizing the combination is.",
        request.food1(),
        request.food2()
    )
}

pub fn get_fusion_recipe_schema() -> Schema {
    let phase_schema = Schema::object(
        vec![
            (
                "phase",
                Schema::string().describe("e.g., Preparation, Mixing, Cooking"),
            ),
            ("steps", Schema::array_of(Schema::string())),
        ],
        &[],
    );

    Schema::object(
        vec![
            (
                "dishName",
                Schema::string().describe("A creative, catchy name for the fusion dish."),
            ),
            (
                "description",
                Schema::string().describe("A short, mouth-watering description of the result."),
            ),
            (
                "ingredients",
                Schema::array_of(Schema::string()).describe(
                    "List of ingredients with exact quantities (cups, grams, spoons).",
                ),
            ),
            (
                "instructions",
                Schema::array_of(phase_schema)
                    .describe("Step-by-step cooking instructions grouped by phase."),
            ),
            (
                "flavorProfile",
                Schema::array_of(Schema::string())
                    .describe("Adjectives describing the taste (e.g., Sweet, Spicy, Umami)."),
            ),
            (
                "difficulty",
                Schema::string().one_of(&Difficulty::ALL),
            ),
            (
                "viralScore",
                Schema::of(SchemaType::Integer).describe(
                    "A score from 1 to 100 indicating how viral this recipe would be on social media.",
                ),
            ),
            (
                "viralReason",
                Schema::string().describe("A short sentence explaining why it got this score."),
            ),
        ],
        &[
            "dishName",
            "ingredients",
            "instructions",
            "flavorProfile",
            "difficulty",
            "viralScore",
            "viralReason",
        ],
    )
}

pub fn build_recipe_request(request: &FusionRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![Part::text(build_recipe_prompt(request))])],
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part::text(SYSTEM_INSTRUCTION)],
        }),
        generation_config: Some(GenerationConfig {
            temperature: Some(RECIPE_TEMPERATURE),
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(get_fusion_recipe_schema()),
            image_config: None,
        }),
    }
}

/// Removes a surrounding markdown code fence, if any.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.ends_with("```") {
        return trimmed;
    }
    if let Some(inner) = trimmed.strip_prefix("```json") {
        inner.trim_end_matches("```").trim()
    } else if let Some(inner) = trimmed.strip_prefix("```") {
        inner.trim_end_matches("```").trim()
    } else {
        trimmed
    }
}

pub fn parse_recipe_output(
    response: &GenerateContentResponse,
) -> Result<GeneratedRecipe, RecipeTextError> {
    let Some(raw) = response.text() else {
        let finish_reason = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref());
        debug!(
            block_reason = ?response.block_reason(),
            finish_reason = ?finish_reason,
            "generator returned no recipe text"
        );
        return Err(RecipeTextError::NoRecipeGenerated);
    };

    let content = strip_code_fences(&raw);
    if content.is_empty() {
        return Err(RecipeTextError::NoRecipeGenerated);
    }

    let recipe: GeneratedRecipe = serde_json::from_str(content).map_err(|e| {
        error!(error = %e, "JSON parse error in generated recipe");
        RecipeTextError::MalformedRecipe(Some(e))
    })?;

    if recipe.dish_name.trim().is_empty() {
        error!("generated recipe has an empty dish name");
        return Err(RecipeTextError::MalformedRecipe(None));
    }

    Ok(recipe)
}

pub async fn generate_recipe_text(
    backend: &dyn GenerativeBackend,
    model: &str,
    request: &FusionRequest,
) -> Result<GeneratedRecipe, RecipeTextError> {
    let response = backend
        .generate_content(model, &build_recipe_request(request))
        .await?;
    parse_recipe_output(&response)
}
