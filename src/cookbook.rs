use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error};
use uuid::Uuid;

use crate::recipe::FusionRecipe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: String },
    Removed { count: usize },
}

/// Saved recipes, newest first. Duplicate saves are detected by dish name.
#[derive(Debug, Clone, Default)]
pub struct Cookbook {
    recipes: Vec<FusionRecipe>,
}

impl Cookbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_recipes(recipes: Vec<FusionRecipe>) -> Self {
        Self { recipes }
    }

    pub fn recipes(&self) -> &[FusionRecipe] {
        &self.recipes
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn is_saved(&self, recipe: &FusionRecipe) -> bool {
        self.recipes.iter().any(|r| r.dish_name == recipe.dish_name)
    }

    pub fn find(&self, id: &str) -> Option<&FusionRecipe> {
        self.recipes.iter().find(|r| r.id.as_deref() == Some(id))
    }

    /// Saves a copy of `recipe` with a fresh id and timestamp, or removes
    /// every saved entry sharing its dish name.
    pub fn toggle_save(&mut self, recipe: &FusionRecipe) -> SaveOutcome {
        if self.is_saved(recipe) {
            let before = self.recipes.len();
            self.recipes.retain(|r| r.dish_name != recipe.dish_name);
            return SaveOutcome::Removed {
                count: before - self.recipes.len(),
            };
        }

        let id = Uuid::new_v4().to_string();
        let mut saved = recipe.clone();
        saved.id = Some(id.clone());
        saved.saved_at = Some(Utc::now().timestamp_millis());
        self.recipes.insert(0, saved);
        SaveOutcome::Saved { id }
    }

    /// Removes exactly the entry with this id.
    pub fn delete(&mut self, id: &str) -> bool {
        match self.recipes.iter().position(|r| r.id.as_deref() == Some(id)) {
            Some(index) => {
                self.recipes.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.recipes).context("Failed to serialize saved recipes")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let recipes = serde_json::from_str(json).context("Failed to parse saved recipes")?;
        Ok(Self { recipes })
    }
}

/// A cookbook bound to the JSON file that stores it.
#[derive(Debug)]
pub struct CookbookFile {
    path: PathBuf,
    cookbook: Cookbook,
}

impl CookbookFile {
    /// Loads the store. A missing file starts an empty cookbook; an
    /// unreadable one is logged and also starts empty.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cookbook = match fs::try_exists(&path).await {
            Ok(true) => {
                let bytes = fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read cookbook '{}'", path.display()))?;
                let parsed = String::from_utf8(bytes)
                    .context("Saved recipes are not valid UTF-8")
                    .and_then(|content| Cookbook::from_json(&content));
                match parsed {
                    Ok(cookbook) => cookbook,
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "Failed to parse saved recipes");
                        Cookbook::new()
                    }
                }
            }
            Ok(false) => {
                debug!(path = %path.display(), "no cookbook yet, starting empty");
                Cookbook::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to access cookbook '{}'", path.display()))
            }
        };
        Ok(Self { path, cookbook })
    }

    pub fn cookbook(&self) -> &Cookbook {
        &self.cookbook
    }

    /// Rewrites the whole store.
    pub async fn persist(&self) -> Result<()> {
        let json = self.cookbook.to_json()?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write cookbook '{}'", self.path.display()))
    }

    pub async fn toggle_save(&mut self, recipe: &FusionRecipe) -> Result<SaveOutcome> {
        let outcome = self.cookbook.toggle_save(recipe);
        self.persist().await?;
        Ok(outcome)
    }

    pub async fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self.cookbook.delete(id);
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }
}
