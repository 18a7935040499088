pub mod api_connection;
pub mod cli;
pub mod config;
pub mod cookbook;
pub mod fusion;
pub mod recipe;
pub mod recipe_image;
pub mod recipe_text;
