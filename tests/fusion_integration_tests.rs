use async_trait::async_trait;
use food_fusion::api_connection::{
    connection::{ApiConnectionError, GenerativeBackend, Provider},
    endpoints::{
        Candidate, Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part,
        PromptFeedback,
    },
};
use food_fusion::cookbook::{CookbookFile, SaveOutcome};
use food_fusion::fusion::{FusionError, FusionKitchen};
use food_fusion::recipe::{Difficulty, FusionRequest};
use food_fusion::recipe_text::generate_recipe_text;
use std::sync::Arc;
use std::time::Duration;

const TEST_API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

const AVOCADO_TOAST_JSON: &str = r#"{
    "dishName": "Avocado Toast Tartine Supreme",
    "description": "Creamy avocado on crackling sourdough.",
    "ingredients": ["1 ripe avocado", "2 slices sourdough", "1 tsp lemon juice"],
    "instructions": [
        {"phase": "Preparation", "steps": ["Toast the bread.", "Mash the avocado with lemon."]},
        {"phase": "Assembly", "steps": ["Spread and serve."]}
    ],
    "flavorProfile": ["Creamy", "Crunchy", "Bright"],
    "difficulty": "Easy",
    "viralScore": 64,
    "viralReason": "A brunch classic with a twist."
}"#;

type Reply = Result<GenerateContentResponse, ApiConnectionError>;

/// Answers text and image requests from fixed factories.
struct StubBackend {
    text: Box<dyn Fn(&GenerateContentRequest) -> Reply + Send + Sync>,
    image: Box<dyn Fn() -> Reply + Send + Sync>,
    slow_prompt_marker: Option<&'static str>,
}

impl StubBackend {
    fn new(
        text: impl Fn(&GenerateContentRequest) -> Reply + Send + Sync + 'static,
        image: impl Fn() -> Reply + Send + Sync + 'static,
    ) -> Self {
        Self {
            text: Box::new(text),
            image: Box::new(image),
            slow_prompt_marker: None,
        }
    }
}

fn prompt_of(request: &GenerateContentRequest) -> String {
    request
        .contents
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.clone())
        .collect()
}

#[async_trait]
impl GenerativeBackend for StubBackend {
    async fn generate_content(
        &self,
        _model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiConnectionError> {
        if let Some(marker) = self.slow_prompt_marker {
            if prompt_of(request).contains(marker) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
        let is_image = request
            .generation_config
            .as_ref()
            .is_some_and(|c| c.image_config.is_some());
        if is_image {
            (self.image)()
        } else {
            (self.text)(request)
        }
    }
}

fn text_response(text: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some("model".to_string()),
                parts: vec![Part::text(text)],
            }),
            finish_reason: Some("STOP".to_string()),
        }],
        ..Default::default()
    }
}

fn image_response() -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some("model".to_string()),
                parts: vec![Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: "image/png".to_string(),
                        data: "iVBORw0KGgo=".to_string(),
                    }),
                }],
            }),
            finish_reason: Some("STOP".to_string()),
        }],
        ..Default::default()
    }
}

fn api_error(status: u16, body: &str) -> ApiConnectionError {
    ApiConnectionError::ApiError {
        status: reqwest::StatusCode::from_u16(status).unwrap(),
        error_body: body.to_string(),
    }
}

fn kitchen(backend: StubBackend) -> FusionKitchen {
    FusionKitchen::new(Arc::new(backend))
}

fn avocado_toast() -> FusionRequest {
    FusionRequest::new("Avocado", "Toast").unwrap()
}

#[tokio::test]
async fn test_avocado_toast_without_image() {
    let kitchen = kitchen(StubBackend::new(
        |_| Ok(text_response(AVOCADO_TOAST_JSON)),
        || Ok(GenerateContentResponse::default()),
    ));

    let recipe = kitchen.generate(&avocado_toast()).await.unwrap();
    assert_eq!(recipe.dish_name, "Avocado Toast Tartine Supreme");
    assert_eq!(recipe.difficulty, Difficulty::Easy);
    assert_eq!(recipe.ingredients.len(), 3);
    assert_eq!(recipe.instructions.len(), 2);
    assert!(recipe.image_url.is_none());
    assert!(recipe.id.is_none());
    assert!(recipe.saved_at.is_none());
}

#[tokio::test]
async fn test_image_is_merged_when_present() {
    let kitchen = kitchen(StubBackend::new(
        |_| Ok(text_response(AVOCADO_TOAST_JSON)),
        || Ok(image_response()),
    ));

    let recipe = kitchen.generate(&avocado_toast()).await.unwrap();
    assert_eq!(recipe.image_url.as_deref(), Some("data:image/png;base64,iVBORw0KGgo="));
    let (mime, bytes) = recipe.image_bytes().unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(&bytes[1..4], b"PNG");
}

#[tokio::test]
async fn test_image_failure_does_not_fail_recipe() {
    let kitchen = kitchen(StubBackend::new(
        |_| Ok(text_response(AVOCADO_TOAST_JSON)),
        || Err(api_error(500, "image model exploded")),
    ));

    let recipe = kitchen.generate(&avocado_toast()).await.unwrap();
    assert_eq!(recipe.dish_name, "Avocado Toast Tartine Supreme");
    assert!(recipe.image_url.is_none());
}

#[tokio::test]
async fn test_text_failure_discards_image() {
    let kitchen = kitchen(StubBackend::new(
        |_| Err(api_error(429, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#)),
        || Ok(image_response()),
    ));

    let err = kitchen.generate(&avocado_toast()).await.unwrap_err();
    assert_eq!(err, FusionError::RateLimited);
    assert_eq!(
        err.to_string(),
        "The kitchen is too busy! (Rate Limit Reached). Please wait a minute and try again."
    );
}

#[tokio::test]
async fn test_no_output_is_safety_filter() {
    let kitchen = kitchen(StubBackend::new(
        |_| {
            Ok(GenerateContentResponse {
                prompt_feedback: Some(PromptFeedback {
                    block_reason: Some("SAFETY".to_string()),
                }),
                ..Default::default()
            })
        },
        || Ok(GenerateContentResponse::default()),
    ));

    let err = kitchen.generate(&avocado_toast()).await.unwrap_err();
    assert_eq!(err, FusionError::SafetyFilter);
}

#[tokio::test]
async fn test_non_json_is_malformed_and_distinct() {
    let kitchen = kitchen(StubBackend::new(
        |_| Ok(text_response("Sure! Here's a lovely recipe: mash it all.")),
        || Ok(GenerateContentResponse::default()),
    ));

    let err = kitchen.generate(&avocado_toast()).await.unwrap_err();
    assert!(matches!(err, FusionError::Upstream(_)));
    assert!(err.to_string().contains("recipe format was a bit off"));
    assert_ne!(err, FusionError::SafetyFilter);
}

#[tokio::test]
async fn test_upstream_message_surfaces_verbatim() {
    let kitchen = kitchen(StubBackend::new(
        |_| Err(api_error(400, "Unsupported model parameter")),
        || Ok(GenerateContentResponse::default()),
    ));

    let err = kitchen.generate(&avocado_toast()).await.unwrap_err();
    assert_eq!(
        err,
        FusionError::Upstream("API error 400 Bad Request: Unsupported model parameter".to_string())
    );
}

#[tokio::test]
async fn test_prompt_forwards_foods_verbatim() {
    let backend = StubBackend::new(
        |request| {
            let prompt = prompt_of(request);
            assert!(prompt.contains("\"Pickled  Herring\" and \"Chocolate!\""));
            Ok(text_response(AVOCADO_TOAST_JSON))
        },
        || Ok(GenerateContentResponse::default()),
    );
    let request = FusionRequest::new("Pickled  Herring", "Chocolate!").unwrap();
    let recipe = generate_recipe_text(&backend, "gemini-2.5-flash", &request).await.unwrap();
    assert_eq!(recipe.viral_score, 64);
}

#[tokio::test]
async fn test_superseded_generation_is_discarded() {
    let mut backend = StubBackend::new(
        |_| Ok(text_response(AVOCADO_TOAST_JSON)),
        || Ok(GenerateContentResponse::default()),
    );
    backend.slow_prompt_marker = Some("Snail");
    let kitchen = kitchen(backend);

    let slow = FusionRequest::new("Snail", "Porridge").unwrap();
    let fast = avocado_toast();

    let (first, second) = tokio::join!(kitchen.generate_latest(&slow), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        kitchen.generate_latest(&fast).await
    });

    assert!(first.is_none());
    let recipe = second.expect("latest result kept").unwrap();
    assert_eq!(recipe.dish_name, "Avocado Toast Tartine Supreme");
}

#[tokio::test]
async fn test_generated_recipe_toggles_in_cookbook() -> anyhow::Result<()> {
    let kitchen = kitchen(StubBackend::new(
        |_| Ok(text_response(AVOCADO_TOAST_JSON)),
        || Ok(image_response()),
    ));
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("saved.json");

    let first = kitchen.generate(&avocado_toast()).await?;
    let second = kitchen.generate(&avocado_toast()).await?;

    let mut cookbook = CookbookFile::open(&path).await?;
    assert!(matches!(cookbook.toggle_save(&first).await?, SaveOutcome::Saved { .. }));
    assert!(cookbook.cookbook().is_saved(&second));
    assert_eq!(
        cookbook.toggle_save(&second).await?,
        SaveOutcome::Removed { count: 1 }
    );

    let reopened = CookbookFile::open(&path).await?;
    assert!(reopened.cookbook().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_api_key_error() {
    let provider = Provider::gemini("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ");
    let request = food_fusion::recipe_text::build_recipe_request(&avocado_toast());
    let result = provider.call_generate_content("gemini-2.5-flash", &request).await;
    assert!(matches!(result, Err(ApiConnectionError::MissingApiKey(_))));
    if let Err(ApiConnectionError::MissingApiKey(key_name)) = result {
        assert_eq!(key_name, "THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ");
    }

    let kitchen = FusionKitchen::new(Arc::new(Provider::gemini("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ")));
    let err = kitchen.generate(&avocado_toast()).await.unwrap_err();
    assert_eq!(err, FusionError::InvalidApiKey);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    const KEY_VAR: &str = "FOOD_FUSION_TEST_UNREACHABLE_KEY";
    std::env::set_var(KEY_VAR, "dummy-key-for-connection-test");

    let provider = Provider::gemini_with_base_url(KEY_VAR, "http://127.0.0.1:1");
    let kitchen = FusionKitchen::new(Arc::new(provider));
    let err = kitchen.generate(&avocado_toast()).await.unwrap_err();
    assert_eq!(err, FusionError::Network);
    assert_eq!(err.to_string(), "Network Error: Please check your internet connection.");

    std::env::remove_var(KEY_VAR);
}

#[tokio::test]
#[ignore]
async fn test_live_fusion_recipe() {
    dotenv::dotenv().ok();
    if std::env::var(TEST_API_KEY_ENV_VAR).is_err() {
        println!("Skipping test_live_fusion_recipe: {} not set.", TEST_API_KEY_ENV_VAR);
        return;
    }

    let kitchen = FusionKitchen::new(Arc::new(Provider::gemini(TEST_API_KEY_ENV_VAR)));
    let result = kitchen.generate(&avocado_toast()).await;
    assert!(result.is_ok(), "generation failed: {:?}", result.err());
    let recipe = result.unwrap();
    assert!(!recipe.dish_name.is_empty());
    assert!(!recipe.ingredients.is_empty());
}
