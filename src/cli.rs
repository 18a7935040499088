use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

use crate::recipe::FusionRecipe;

#[derive(Parser, Debug)]
#[command(author, version, about = "Invent fusion recipes from two ingredients", long_about = None)]
pub struct Cli {
    /// Path to the saved-recipes file (overrides FOOD_FUSION_STORE)
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Invent a recipe combining two foods
    Generate {
        food1: String,
        food2: String,
        /// Save the result (or unsave a recipe with the same dish name)
        #[arg(long)]
        save: bool,
        /// Write the generated illustration to this file
        #[arg(long)]
        image_out: Option<PathBuf>,
    },
    /// List saved recipes, newest first
    Saved,
    /// Print a saved recipe
    Show {
        id: String,
        #[arg(long)]
        image_out: Option<PathBuf>,
    },
    /// Delete a saved recipe
    Delete { id: String },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn format_saved_at(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Plain-text recipe card.
pub struct RecipeCard<'a>(pub &'a FusionRecipe);

impl fmt::Display for RecipeCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recipe = self.0;
        writeln!(f, "{}", recipe.dish_name)?;
        writeln!(f, "{}", "=".repeat(recipe.dish_name.chars().count()))?;
        if !recipe.description.is_empty() {
            writeln!(f, "{}\n", recipe.description)?;
        }
        writeln!(
            f,
            "Difficulty: {}   Viral score: {}/100",
            recipe.difficulty.as_str(),
            recipe.viral_score
        )?;
        writeln!(f, "  {}", recipe.viral_reason)?;
        if !recipe.flavor_profile.is_empty() {
            writeln!(f, "Flavor: {}", recipe.flavor_profile.join(", "))?;
        }

        writeln!(f, "\nIngredients:")?;
        for ingredient in &recipe.ingredients {
            writeln!(f, "  - {}", ingredient)?;
        }

        writeln!(f, "\nInstructions:")?;
        for phase in &recipe.instructions {
            writeln!(f, "  {}", phase.phase)?;
            for (n, step) in phase.steps.iter().enumerate() {
                writeln!(f, "    {}. {}", n + 1, step)?;
            }
        }

        if recipe.image_url.is_some() {
            writeln!(f, "\n[illustration available]")?;
        }
        Ok(())
    }
}

pub fn render_recipe(recipe: &FusionRecipe) -> String {
    RecipeCard(recipe).to_string()
}
