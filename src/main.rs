use anyhow::{bail, Context, Result};
use food_fusion::api_connection::connection::Provider;
use food_fusion::cli::{format_saved_at, parse_args, render_recipe, Command};
use food_fusion::config::FusionConfig;
use food_fusion::cookbook::{CookbookFile, SaveOutcome};
use food_fusion::fusion::FusionKitchen;
use food_fusion::recipe::{FusionRecipe, FusionRequest};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "FOOD_FUSION_LOG";

async fn write_image(recipe: &FusionRecipe, path: &Path) -> Result<()> {
    let Some((mime, bytes)) = recipe.image_bytes() else {
        println!("No illustration for this recipe.");
        return Ok(());
    };
    fs::write(path, &bytes)
        .await
        .with_context(|| format!("Failed to write image '{}'", path.display()))?;
    println!("Saved {} illustration to {}", mime, path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = FusionConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli_args = parse_args();
    let store_path = cli_args.store.unwrap_or(config.store_path.clone());
    let mut cookbook = CookbookFile::open(&store_path).await?;
    info!(path = %store_path.display(), saved = cookbook.cookbook().len(), "cookbook loaded");

    match cli_args.command {
        Command::Generate {
            food1,
            food2,
            save,
            image_out,
        } => {
            let request = FusionRequest::new(food1, food2)?;
            let provider = Provider::gemini_with_base_url(&config.api_key_env_var, &config.base_url);
            let kitchen =
                FusionKitchen::with_models(Arc::new(provider), &config.text_model, &config.image_model);

            let recipe = kitchen.generate(&request).await?;

            let saved = cookbook.cookbook().is_saved(&recipe);
            println!("{}", render_recipe(&recipe));
            if saved {
                println!("(already in your cookbook)");
            }

            if let Some(path) = image_out {
                write_image(&recipe, &path).await?;
            }

            if save {
                match cookbook.toggle_save(&recipe).await? {
                    SaveOutcome::Saved { id } => println!("Saved to cookbook as {}", id),
                    SaveOutcome::Removed { .. } => println!("Removed \"{}\" from cookbook", recipe.dish_name),
                }
            }
        }
        Command::Saved => {
            let recipes = cookbook.cookbook().recipes();
            if recipes.is_empty() {
                println!("Your cookbook is empty.");
            }
            for recipe in recipes {
                println!(
                    "{}  {}  {}",
                    recipe.id.as_deref().unwrap_or("-"),
                    format_saved_at(recipe.saved_at),
                    recipe.dish_name
                );
            }
        }
        Command::Show { id, image_out } => {
            let Some(recipe) = cookbook.cookbook().find(&id) else {
                bail!("No saved recipe with id {}", id);
            };
            println!("{}", render_recipe(recipe));
            if let Some(path) = image_out {
                write_image(recipe, &path).await?;
            }
        }
        Command::Delete { id } => {
            if !cookbook.delete(&id).await? {
                bail!("No saved recipe with id {}", id);
            }
            println!("Deleted {}", id);
        }
    }

    Ok(())
}
