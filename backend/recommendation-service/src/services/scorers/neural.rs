// ============================================
// Neural Scorer (continuous bag of games)
// ============================================
//
// Inference-only port of a pre-trained CBOG network:
//   s      = Σ embeddings[index(q)]   (unknown ids → row 0)
//   scores = W · s + b
//
// Weights are read once at startup from a JSON bundle exported by the
// training pipeline.

use super::{validate_request, Scorer};
use crate::catalog::Catalog;
use crate::error::{AppError, Result};
use crate::models::{EngineName, ItemId, Query, RankedList};
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Vocabulary slot shared by unknown ids and padding
pub const UNKNOWN_INDEX: usize = 0;

/// On-disk model bundle
#[derive(Debug, Clone, Deserialize)]
pub struct NeuralModelArtifact {
    pub num_games: usize,
    pub embedding_size: usize,
    pub steam_app_id_to_index: HashMap<u64, usize>,
    /// `[num_games × embedding_size]`
    pub embeddings: Vec<Vec<f32>>,
    /// `[num_games × embedding_size]`
    pub linear_weight: Vec<Vec<f32>>,
    /// `[num_games]`
    pub linear_bias: Vec<f32>,
}

/// Loaded, shape-checked network
#[derive(Debug, Clone)]
pub struct NeuralModel {
    embeddings: Array2<f32>,
    linear_weight: Array2<f32>,
    linear_bias: Array1<f32>,
    id_to_index: HashMap<ItemId, usize>,
    index_to_id: HashMap<usize, ItemId>,
}

fn to_matrix(name: &str, rows: Vec<Vec<f32>>, shape: (usize, usize)) -> Result<Array2<f32>> {
    if rows.len() != shape.0 {
        return Err(AppError::ModelLoadError(format!(
            "{} has {} rows, expected {}",
            name,
            rows.len(),
            shape.0
        )));
    }
    if let Some(row) = rows.iter().position(|r| r.len() != shape.1) {
        return Err(AppError::ModelLoadError(format!(
            "{} row {} has {} columns, expected {}",
            name,
            row,
            rows[row].len(),
            shape.1
        )));
    }

    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec(shape, flat)
        .map_err(|e| AppError::ModelLoadError(format!("{}: {}", name, e)))
}

impl NeuralModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ModelLoadError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let artifact: NeuralModelArtifact = serde_json::from_str(&raw).map_err(|e| {
            AppError::ModelLoadError(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let model = Self::from_artifact(artifact)?;
        info!(
            path = %path.display(),
            vocabulary = model.vocabulary_size(),
            embedding_size = model.embedding_size(),
            mapped_games = model.id_to_index.len(),
            "Neural model loaded"
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: NeuralModelArtifact) -> Result<Self> {
        let shape = (artifact.num_games, artifact.embedding_size);
        if artifact.num_games == 0 {
            return Err(AppError::ModelLoadError(
                "num_games must be at least 1".to_string(),
            ));
        }

        let embeddings = to_matrix("embeddings", artifact.embeddings, shape)?;
        let linear_weight = to_matrix("linear_weight", artifact.linear_weight, shape)?;
        if artifact.linear_bias.len() != artifact.num_games {
            return Err(AppError::ModelLoadError(format!(
                "linear_bias has {} entries, expected {}",
                artifact.linear_bias.len(),
                artifact.num_games
            )));
        }

        let mut id_to_index = HashMap::with_capacity(artifact.steam_app_id_to_index.len());
        let mut index_to_id = HashMap::with_capacity(artifact.steam_app_id_to_index.len());
        for (app_id, index) in artifact.steam_app_id_to_index {
            if index == UNKNOWN_INDEX || index >= artifact.num_games {
                return Err(AppError::ModelLoadError(format!(
                    "app {} maps to index {} outside 1..{}",
                    app_id, index, artifact.num_games
                )));
            }
            id_to_index.insert(ItemId(app_id), index);
            index_to_id.insert(index, ItemId(app_id));
        }

        Ok(Self {
            embeddings,
            linear_weight,
            linear_bias: Array1::from(artifact.linear_bias),
            id_to_index,
            index_to_id,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.embeddings.nrows()
    }

    pub fn embedding_size(&self) -> usize {
        self.embeddings.ncols()
    }

    pub fn index_of(&self, id: ItemId) -> usize {
        self.id_to_index.get(&id).copied().unwrap_or(UNKNOWN_INDEX)
    }

    /// Output logits for every vocabulary slot
    pub fn forward(&self, ids: &[ItemId]) -> Array1<f32> {
        let mut context = Array1::<f32>::zeros(self.embedding_size());
        for id in ids {
            context += &self.embeddings.row(self.index_of(*id));
        }
        self.linear_weight.dot(&context) + &self.linear_bias
    }
}

/// Ranks catalog items by the network's predicted affinity
pub struct NeuralScorer {
    catalog: Arc<Catalog>,
    model: Arc<NeuralModel>,
}

impl NeuralScorer {
    pub fn new(catalog: Arc<Catalog>, model: Arc<NeuralModel>) -> Self {
        Self { catalog, model }
    }
}

impl Scorer for NeuralScorer {
    fn engine(&self) -> EngineName {
        EngineName::Neural
    }

    fn score_or_rank(&self, query: &Query, limit: usize) -> Result<RankedList> {
        validate_request(&self.catalog, query, limit)?;

        let scores = self.model.forward(query.ids());
        let exclude: HashSet<ItemId> = query.id_set();

        let mut indices: Vec<usize> = (0..scores.len()).collect();
        // stable: equal logits keep vocabulary order
        indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        Ok(indices
            .into_iter()
            .filter_map(|index| self.model.index_to_id.get(&index).copied())
            .filter(|id| !exclude.contains(id) && self.catalog.exists(*id))
            .take(limit)
            .collect())
    }
}
