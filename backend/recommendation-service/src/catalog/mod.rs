// ============================================
// Game Catalog
// ============================================
//
// Immutable item store joined from two CSV sources:
//   steam.csv                  appid → name, developer, genres, tags, ratings
//   steam_description_data.csv steam_appid → detailed/about/short descriptions
//
// Loaded once at startup and shared by Arc with every scorer.

use crate::error::{AppError, Result};
use crate::models::{Item, ItemId, ItemSummary, Query};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Separator for list-valued columns (categories, genres, steamspy_tags)
const LIST_SEPARATOR: char = ';';

#[derive(Debug, Deserialize)]
struct GameRecord {
    appid: u64,
    name: String,
    #[serde(default)]
    developer: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    genres: String,
    #[serde(default)]
    steamspy_tags: String,
    #[serde(default)]
    positive_ratings: u64,
}

#[derive(Debug, Deserialize)]
struct DescriptionRecord {
    steam_appid: u64,
    #[serde(default)]
    detailed_description: String,
    #[serde(default)]
    about_the_game: String,
    #[serde(default)]
    short_description: String,
}

/// Read-only game catalog in load order
#[derive(Debug, Default)]
pub struct Catalog {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Build from already-loaded items, keeping the first occurrence of each id
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut catalog = Self::default();
        for item in items {
            if catalog.index.contains_key(&item.id) {
                warn!(app_id = %item.id, "Duplicate app id in catalog, keeping first row");
                continue;
            }
            catalog.index.insert(item.id, catalog.items.len());
            catalog.items.push(item);
        }
        catalog
    }

    /// Load and join the two CSV sources by app id
    pub fn load(games_path: impl AsRef<Path>, descriptions_path: impl AsRef<Path>) -> Result<Self> {
        let games_path = games_path.as_ref();
        let descriptions_path = descriptions_path.as_ref();

        let mut descriptions: HashMap<u64, DescriptionRecord> = HashMap::new();
        let mut reader = csv::Reader::from_path(descriptions_path).map_err(|e| {
            AppError::CatalogLoadError(format!(
                "failed to open {}: {}",
                descriptions_path.display(),
                e
            ))
        })?;
        for record in reader.deserialize::<DescriptionRecord>() {
            let record = record?;
            descriptions.insert(record.steam_appid, record);
        }

        let mut items = Vec::new();
        let mut missing_descriptions = 0usize;
        let mut reader = csv::Reader::from_path(games_path).map_err(|e| {
            AppError::CatalogLoadError(format!("failed to open {}: {}", games_path.display(), e))
        })?;
        for record in reader.deserialize::<GameRecord>() {
            let game = record?;
            let Some(text) = descriptions.remove(&game.appid) else {
                missing_descriptions += 1;
                continue;
            };

            items.push(Item {
                id: ItemId(game.appid),
                name: game.name,
                description: text.detailed_description,
                short_description: text.short_description,
                about: text.about_the_game,
                developer: game.developer,
                publisher: game.publisher,
                categories: split_list(&game.categories),
                genres: split_list(&game.genres),
                tags: split_list(&game.steamspy_tags),
                popularity: game.positive_ratings,
            });
        }

        if missing_descriptions > 0 {
            warn!(
                skipped = missing_descriptions,
                "Games without a description row were skipped"
            );
        }

        let catalog = Self::from_items(items);
        info!(
            games = catalog.len(),
            games_path = %games_path.display(),
            descriptions_path = %descriptions_path.display(),
            "Game catalog loaded"
        );

        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in catalog order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn exists(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get_item(&self, id: ItemId) -> Result<&Item> {
        self.index
            .get(&id)
            .map(|&pos| &self.items[pos])
            .ok_or(AppError::NotFound(id))
    }

    /// Catalog position of an item, used as the deterministic tie-breaker
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Fail with `NotFound` on the first id missing from the catalog
    pub fn ensure_known(&self, query: &Query) -> Result<()> {
        match query.ids().iter().find(|id| !self.exists(**id)) {
            Some(id) => Err(AppError::NotFound(*id)),
            None => Ok(()),
        }
    }

    pub fn summaries(&self, ids: &[ItemId]) -> Result<Vec<ItemSummary>> {
        ids.iter()
            .map(|id| self.get_item(*id).map(Item::summary))
            .collect()
    }

    /// Case-insensitive substring search, names first then descriptions
    pub fn search(&self, q: &str, limit: usize) -> Vec<&Item> {
        let needle = q.to_lowercase();
        let mut retrieved: Vec<&Item> = self
            .items
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .take(limit)
            .collect();

        if retrieved.len() < limit {
            let by_name: Vec<ItemId> = retrieved.iter().map(|item| item.id).collect();
            let remaining = limit - retrieved.len();
            retrieved.extend(
                self.items
                    .iter()
                    .filter(|item| !by_name.contains(&item.id))
                    .filter(|item| item.description.to_lowercase().contains(&needle))
                    .take(remaining),
            );
        }

        retrieved
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
