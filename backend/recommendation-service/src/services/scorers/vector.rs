// ============================================
// Vector Similarity Scorer
// ============================================
//
// Bag-of-words count vectors over each item's feature text, ranked by cosine
// similarity to the sum of the query vectors.

use super::tokenizer::count_tokens;
use super::{top_positions, validate_request, Scorer};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{EngineName, Item, Query, RankedList};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// Sparse count vector, entries sorted by term index
#[derive(Debug, Clone, Default)]
struct SparseVector {
    entries: Vec<(usize, f64)>,
    norm: f64,
}

impl SparseVector {
    fn from_counts(counts: BTreeMap<usize, f64>) -> Self {
        let norm = counts.values().map(|c| c * c).sum::<f64>().sqrt();
        Self {
            entries: counts.into_iter().collect(),
            norm,
        }
    }
}

pub struct VectorScorer {
    catalog: Arc<Catalog>,
    /// One vector per catalog position
    vectors: Vec<SparseVector>,
}

impl VectorScorer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let vectors: Vec<SparseVector> = catalog
            .items()
            .iter()
            .map(|item| {
                let mut counts = BTreeMap::new();
                for token in count_tokens(&feature_text(item)) {
                    let next = vocabulary.len();
                    let term = *vocabulary.entry(token).or_insert(next);
                    *counts.entry(term).or_insert(0.0) += 1.0;
                }
                SparseVector::from_counts(counts)
            })
            .collect();

        info!(
            items = vectors.len(),
            vocabulary = vocabulary.len(),
            "Count vectors built"
        );

        Self { catalog, vectors }
    }

    fn query_vector(&self, query: &Query) -> SparseVector {
        let mut sum = BTreeMap::new();
        for id in query.ids() {
            let Some(pos) = self.catalog.position(*id) else {
                continue;
            };
            for &(term, count) in &self.vectors[pos].entries {
                *sum.entry(term).or_insert(0.0) += count;
            }
        }
        SparseVector::from_counts(sum)
    }
}

fn feature_text(item: &Item) -> String {
    let mut parts = vec![
        item.name.as_str(),
        item.developer.as_str(),
        item.publisher.as_str(),
    ];
    parts.extend(item.categories.iter().map(String::as_str));
    parts.extend(item.genres.iter().map(String::as_str));
    parts.extend(item.tags.iter().map(String::as_str));
    parts.push(item.description.as_str());
    parts.push(item.about.as_str());
    parts.push(item.short_description.as_str());
    parts.join(" ")
}

fn cosine(item: &SparseVector, query: &SparseVector, query_terms: &HashMap<usize, f64>) -> f64 {
    if item.norm == 0.0 || query.norm == 0.0 {
        return 0.0;
    }
    let dot: f64 = item
        .entries
        .iter()
        .filter_map(|(term, count)| query_terms.get(term).map(|q| q * count))
        .sum();
    dot / (item.norm * query.norm)
}

impl Scorer for VectorScorer {
    fn engine(&self) -> EngineName {
        EngineName::Vector
    }

    fn score_or_rank(&self, query: &Query, limit: usize) -> Result<RankedList> {
        validate_request(&self.catalog, query, limit)?;

        let query_vector = self.query_vector(query);
        let query_terms: HashMap<usize, f64> = query_vector.entries.iter().copied().collect();
        let scores: Vec<f64> = self
            .vectors
            .iter()
            .map(|vector| cosine(vector, &query_vector, &query_terms))
            .collect();

        Ok(top_positions(&self.catalog, &scores, &query.id_set(), limit))
    }
}
