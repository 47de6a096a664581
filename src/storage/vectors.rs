//! In-memory exact nearest-neighbour index over concept embeddings
//!
//! The index is a flat row-major matrix of unit vectors plus a parallel list
//! of concept keys. Search is an exhaustive dot product, which on unit
//! vectors is cosine similarity. An index is immutable once built; the
//! registry publishes a fresh one after every insert.

use crate::embeddings::dot;
use crate::error::{MasteryError, Result};

/// Flat inner-product index
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimensions: usize,
    keys: Vec<String>,
    data: Vec<f32>,
}

impl VectorIndex {
    /// An index with no entries
    pub fn empty(dimensions: usize) -> Self {
        Self {
            dimensions,
            keys: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build an index from (key, embedding) rows
    ///
    /// Every embedding must have exactly `dimensions` components.
    pub fn build<I>(dimensions: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut index = Self::empty(dimensions);
        for (key, embedding) in rows {
            if embedding.len() != dimensions {
                return Err(MasteryError::Storage(format!(
                    "Embedding dimension mismatch for '{}': expected {}, got {}",
                    key,
                    dimensions,
                    embedding.len()
                )));
            }
            index.keys.push(key);
            index.data.extend_from_slice(&embedding);
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Concept keys by row position
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimensions;
        &self.data[start..start + self.dimensions]
    }

    fn check_query(&self, query: &[f32]) -> Result<()> {
        if query.len() != self.dimensions {
            return Err(MasteryError::Validation(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                query.len()
            )));
        }
        Ok(())
    }

    /// Single closest concept and its similarity
    ///
    /// Returns `None` on an empty index. Ties keep the earliest row.
    pub fn nearest(&self, query: &[f32]) -> Result<Option<(&str, f32)>> {
        self.check_query(query)?;

        let mut best: Option<(usize, f32)> = None;
        for position in 0..self.len() {
            let similarity = dot(self.row(position), query);
            match best {
                Some((_, best_sim)) if similarity <= best_sim => {}
                _ => best = Some((position, similarity)),
            }
        }

        Ok(best.map(|(position, similarity)| (self.keys[position].as_str(), similarity)))
    }

    /// Top `limit` concepts by descending similarity
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(&str, f32)>> {
        self.check_query(query)?;

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|position| (position, dot(self.row(position), query)))
            .collect();
        // Stable sort keeps earlier rows first on ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(position, similarity)| (self.keys[position].as_str(), similarity))
            .collect())
    }
}
