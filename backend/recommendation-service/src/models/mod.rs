use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Steam app id of a catalog item
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id)
    }
}

/// Ordered output of one scoring strategy, best match first
pub type RankedList = Vec<ItemId>;

/// Catalog item with every attribute the scorers read
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub about: String,
    pub developer: String,
    pub publisher: String,
    pub categories: Vec<String>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    /// Positive review count, used as aggregate popularity
    pub popularity: u64,
}

impl Item {
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            app_id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Item shape returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    #[serde(rename = "appID")]
    pub app_id: ItemId,
    pub name: String,
    pub description: String,
}

/// Items a user expressed interest in
///
/// Duplicates are kept as given; scorers that sum per-item contributions
/// count them twice, and self-exclusion covers every distinct id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    ids: Vec<ItemId>,
}

impl Query {
    pub fn new(ids: Vec<ItemId>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    /// Distinct ids, for self-exclusion
    pub fn id_set(&self) -> HashSet<ItemId> {
        self.ids.iter().copied().collect()
    }
}

impl From<Vec<u64>> for Query {
    fn from(ids: Vec<u64>) -> Self {
        Self::new(ids.into_iter().map(ItemId).collect())
    }
}

/// Named scoring strategy servable to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineName {
    /// Rank fusion of genre, content and vector
    Combined,
    /// BM25 over descriptions
    Content,
    /// Cosine over bag-of-words counts
    Vector,
    /// Popularity within the dominant genre
    Genre,
    /// Learned co-occurrence embeddings
    Neural,
    /// Uniform random baseline
    Random,
}

impl EngineName {
    pub const ALL: [EngineName; 6] = [
        EngineName::Combined,
        EngineName::Content,
        EngineName::Vector,
        EngineName::Genre,
        EngineName::Neural,
        EngineName::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineName::Combined => "combined",
            EngineName::Content => "content",
            EngineName::Vector => "vector",
            EngineName::Genre => "genre",
            EngineName::Neural => "neural",
            EngineName::Random => "random",
        }
    }
}

impl fmt::Display for EngineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineName::ALL
            .iter()
            .copied()
            .find(|engine| engine.as_str() == s.trim())
            .ok_or_else(|| format!("unknown engine `{}`", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Recommend,
    Click,
    Rate,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Recommend => "recommend",
            Action::Click => "click",
            Action::Rate => "rate",
        }
    }
}

/// Durable record of a serve or feedback action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub engine: EngineName,
    pub queries: Vec<ItemId>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub recorded_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn recommend(engine: EngineName, queries: Vec<ItemId>) -> Self {
        Self {
            engine,
            queries,
            action: Action::Recommend,
            item: None,
            score: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn feedback(
        engine: EngineName,
        queries: Vec<ItemId>,
        item: ItemId,
        action: Action,
        score: Option<i32>,
    ) -> Self {
        Self {
            engine,
            queries,
            action,
            item: Some(item),
            score,
            recorded_at: Utc::now(),
        }
    }
}
