use tracing::{debug, warn};

use crate::api_connection::connection::GenerativeBackend;
use crate::api_connection::endpoints::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig, Part,
};
use crate::recipe::{data_uri, FusionRequest};

pub const IMAGE_ASPECT_RATIO: &str = "16:9";

pub fn build_image_prompt(request: &FusionRequest) -> String {
    format!(
        "A professional, appetizing food photography close-up of a fusion dish combining {} and {}. High resolution, culinary magazine style, delicious, 4k.",
        request.food1(),
        request.food2()
    )
}

pub fn build_image_request(request: &FusionRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: None,
            parts: vec![Part::text(build_image_prompt(request))],
        }],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
            }),
            ..Default::default()
        }),
    }
}

/// First inline image of the response as a data URI.
pub fn extract_image_url(response: &GenerateContentResponse) -> Option<String> {
    response
        .first_inline_data()
        .map(|inline| data_uri(&inline.mime_type, &inline.data))
}

/// Best effort: every failure is logged and turned into `None`.
pub async fn generate_recipe_image(
    backend: &dyn GenerativeBackend,
    model: &str,
    request: &FusionRequest,
) -> Option<String> {
    match backend
        .generate_content(model, &build_image_request(request))
        .await
    {
        Ok(response) => {
            let image_url = extract_image_url(&response);
            if image_url.is_none() {
                debug!("image response carried no inline data");
            }
            image_url
        }
        Err(e) => {
            warn!(error = %e, "Image generation failed");
            None
        }
    }
}
