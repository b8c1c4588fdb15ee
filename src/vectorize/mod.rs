//! TF-IDF vectorizer over space names and tags.
//!
//! Each space contributes one document (name + tags). Vocabulary order is the
//! order in which terms are first seen walking the documents in input order,
//! so the same input always yields the same vector layout.

use hashbrown::HashMap;
use tracing::debug;

use crate::model::{SpaceId, SpaceNode};

/// Output of one vectorizer run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vectorized {
    /// Terms in column order.
    pub vocabulary: Vec<String>,
    /// One vector per input space, in input order, each `vocabulary.len()` long.
    pub vectors: Vec<(SpaceId, Vec<f64>)>,
}

impl Vectorized {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Split text into lowercase alphanumeric terms.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Stateless TF-IDF vectorizer.
///
/// `tf = count / terms_in_doc`, `idf = ln((1 + N) / (1 + df)) + 1`. The
/// smoothing keeps terms present in every document from zeroing out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vectorizer;

impl Vectorizer {
    pub fn new() -> Self {
        Self
    }

    pub fn fit_transform(&self, spaces: &[SpaceNode]) -> Vectorized {
        if spaces.is_empty() {
            return Vectorized::default();
        }

        let mut vocabulary: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        // Per document: (term index, count) in first-seen order, plus total terms.
        let mut documents: Vec<(Vec<(usize, u32)>, u32)> = Vec::with_capacity(spaces.len());

        for space in spaces {
            let mut counts: Vec<(usize, u32)> = Vec::new();
            let mut slot: HashMap<usize, usize> = HashMap::new();
            let mut total = 0u32;
            for term in tokenize(&space.document()) {
                let term_idx = match index.get(&term) {
                    Some(&i) => i,
                    None => {
                        let i = vocabulary.len();
                        index.insert(term.clone(), i);
                        vocabulary.push(term);
                        i
                    }
                };
                match slot.get(&term_idx) {
                    Some(&s) => counts[s].1 += 1,
                    None => {
                        slot.insert(term_idx, counts.len());
                        counts.push((term_idx, 1));
                    }
                }
                total += 1;
            }
            documents.push((counts, total));
        }

        let mut df = vec![0u32; vocabulary.len()];
        for (counts, _) in &documents {
            for &(term_idx, _) in counts {
                df[term_idx] += 1;
            }
        }

        let n = spaces.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let vectors = spaces
            .iter()
            .zip(&documents)
            .map(|(space, (counts, total))| {
                let mut v = vec![0.0; vocabulary.len()];
                if *total > 0 {
                    for &(term_idx, count) in counts {
                        v[term_idx] = (count as f64 / *total as f64) * idf[term_idx];
                    }
                }
                (space.id.clone(), v)
            })
            .collect();

        debug!(documents = spaces.len(), terms = vocabulary.len(), "tf-idf vocabulary built");

        Vectorized { vocabulary, vectors }
    }
}
