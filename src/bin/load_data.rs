//! Reference data loader.
//!
//! Usage: `foodgram-load <ingredients.json> [tags.json]`
//!
//! Reads `[{"name", "measurement_unit"}]` ingredients and optionally
//! `[{"name", "color", "slug"}]` tags into the configured database.
//! Entries that already exist are skipped.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::{
    config::Config,
    db::{
        self,
        repositories::{SqlxIngredientRepository, SqlxTagRepository},
    },
    models::{CreateIngredientInput, CreateTagInput},
    services::{IngredientService, TagService, TagServiceError},
};

#[derive(Debug, Default)]
struct LoadReport {
    created: usize,
    skipped: usize,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

async fn load_ingredients(service: &IngredientService, path: &Path) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for input in read_json::<CreateIngredientInput>(path)? {
        let (_, created) = service
            .create_or_get(input.clone())
            .await
            .with_context(|| format!("Failed to load ingredient '{}'", input.name))?;
        if created {
            report.created += 1;
        } else {
            report.skipped += 1;
        }
    }
    Ok(report)
}

async fn load_tags(service: &TagService, path: &Path) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for input in read_json::<CreateTagInput>(path)? {
        let slug = input.slug.clone();
        if service.get_by_slug(slug.trim()).await?.is_some() {
            report.skipped += 1;
            continue;
        }
        match service.create(input).await {
            Ok(_) => report.created += 1,
            Err(TagServiceError::Conflict(reason)) => {
                tracing::debug!("Skipping tag '{}': {}", slug, reason);
                report.skipped += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to load tag '{}'", slug)),
        }
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info,foodgram_load=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (ingredients_path, tags_path) = match args.as_slice() {
        [ingredients] => (ingredients.as_str(), None),
        [ingredients, tags] => (ingredients.as_str(), Some(tags.as_str())),
        _ => bail!("usage: foodgram-load <ingredients.json> [tags.json]"),
    };

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let ingredients = IngredientService::new(SqlxIngredientRepository::boxed(pool.clone()));
    let report = load_ingredients(&ingredients, Path::new(ingredients_path)).await?;
    tracing::info!(
        "Ingredients: {} created, {} already present",
        report.created,
        report.skipped
    );

    if let Some(tags_path) = tags_path {
        let tags = TagService::new(SqlxTagRepository::boxed(pool.clone()));
        let report = load_tags(&tags, Path::new(tags_path)).await?;
        tracing::info!("Tags: {} created, {} already present", report.created, report.skipped);
    }

    Ok(())
}
