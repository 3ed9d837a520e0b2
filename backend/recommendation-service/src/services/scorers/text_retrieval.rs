// ============================================
// Text Retrieval Scorer (BM25 Okapi)
// ============================================
//
// Every catalog description is a document. A query item's own description is
// the query document; its score vector over the whole corpus is memoized by
// item id for the lifetime of the process (the corpus never changes).
//
// score(D, Q) = Σ_t∈Q idf(t) · tf(t,D)·(k1+1) / (tf(t,D) + k1·(1 − b + b·|D|/avgdl))
// idf(t)      = ln(N − n(t) + 0.5) − ln(n(t) + 0.5), floored at ε·mean(idf)

use super::tokenizer::bm25_tokens;
use super::{top_positions, validate_request, Scorer};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{EngineName, ItemId, Query, RankedList};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Inverted index over tokenized descriptions
struct Bm25Index {
    /// term → (document position, term frequency)
    postings: HashMap<String, Vec<(usize, u32)>>,
    idf: HashMap<String, f64>,
    doc_lens: Vec<usize>,
    avgdl: f64,
}

impl Bm25Index {
    fn build(corpus: Vec<Vec<String>>, params: &Bm25Params) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(corpus.len());

        for (pos, tokens) in corpus.into_iter().enumerate() {
            doc_lens.push(tokens.len());
            let mut frequencies: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *frequencies.entry(token).or_insert(0) += 1;
            }
            for (term, tf) in frequencies {
                postings.entry(term).or_default().push((pos, tf));
            }
        }

        let doc_count = doc_lens.len() as f64;
        let avgdl = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / doc_count
        };

        // Summed in sorted term order so the floor is identical across builds
        let mut terms: Vec<&String> = postings.keys().collect();
        terms.sort_unstable();

        let mut idf = HashMap::with_capacity(postings.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for term in terms {
            let n = postings[term].len() as f64;
            let value = (doc_count - n + 0.5).ln() - (n + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }

        if !idf.is_empty() {
            let floor = params.epsilon * (idf_sum / idf.len() as f64);
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            postings,
            idf,
            doc_lens,
            avgdl,
        }
    }

    fn scores(&self, query_tokens: &[String], params: &Bm25Params) -> Vec<f64> {
        let mut scores = vec![0.0; self.doc_lens.len()];
        if self.avgdl == 0.0 {
            return scores;
        }

        // Query terms in first-seen order
        let mut multiplicity: Vec<(&str, f64)> = Vec::new();
        for token in query_tokens {
            match multiplicity.iter_mut().find(|(term, _)| *term == token.as_str()) {
                Some((_, count)) => *count += 1.0,
                None => multiplicity.push((token.as_str(), 1.0)),
            }
        }

        for (term, count) in multiplicity {
            let (Some(docs), Some(idf)) = (self.postings.get(term), self.idf.get(term)) else {
                continue;
            };
            for &(pos, tf) in docs {
                let tf = tf as f64;
                let norm = 1.0 - params.b + params.b * self.doc_lens[pos] as f64 / self.avgdl;
                scores[pos] += count * idf * (tf * (params.k1 + 1.0)) / (tf + params.k1 * norm);
            }
        }

        scores
    }
}

/// BM25 relevance of catalog descriptions to the query items' descriptions
pub struct TextRetrievalScorer {
    catalog: Arc<Catalog>,
    index: Bm25Index,
    params: Bm25Params,
    /// item id → BM25 scores of every document against that item's description
    cache: DashMap<ItemId, Arc<Vec<f64>>>,
}

impl TextRetrievalScorer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_params(catalog, Bm25Params::default())
    }

    pub fn with_params(catalog: Arc<Catalog>, params: Bm25Params) -> Self {
        let corpus: Vec<Vec<String>> = catalog
            .items()
            .iter()
            .map(|item| bm25_tokens(&item.description))
            .collect();
        let index = Bm25Index::build(corpus, &params);

        info!(
            documents = index.doc_lens.len(),
            terms = index.postings.len(),
            avgdl = index.avgdl,
            "BM25 index built"
        );

        Self {
            catalog,
            index,
            params,
            cache: DashMap::new(),
        }
    }

    /// Scores of every document against one item, read through the cache
    fn item_scores(&self, id: ItemId) -> Result<Arc<Vec<f64>>> {
        if let Some(cached) = self.cache.get(&id) {
            return Ok(Arc::clone(cached.value()));
        }

        // Computed outside the map lock; concurrent misses may both compute,
        // the value is a pure function of the immutable corpus.
        let item = self.catalog.get_item(id)?;
        let scores = Arc::new(
            self.index
                .scores(&bm25_tokens(&item.description), &self.params),
        );
        self.cache.insert(id, Arc::clone(&scores));
        debug!(app_id = %id, cached = self.cache.len(), "BM25 scores memoized");

        Ok(scores)
    }

    pub fn cached_items(&self) -> usize {
        self.cache.len()
    }
}

impl Scorer for TextRetrievalScorer {
    fn engine(&self) -> EngineName {
        EngineName::Content
    }

    fn score_or_rank(&self, query: &Query, limit: usize) -> Result<RankedList> {
        validate_request(&self.catalog, query, limit)?;

        let mut total = vec![0.0; self.catalog.len()];
        for id in query.ids() {
            let scores = self.item_scores(*id)?;
            for (acc, score) in total.iter_mut().zip(scores.iter()) {
                *acc += score;
            }
        }

        Ok(top_positions(&self.catalog, &total, &query.id_set(), limit))
    }
}
