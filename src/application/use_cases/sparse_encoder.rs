use std::collections::HashMap;

use crate::domain::SparseVector;

const DEFAULT_K1: f32 = 1.2;
const DEFAULT_B: f32 = 0.75;

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// BM25-style sparse vector generator. The vocabulary grows on demand during
/// `train`; per Open Question #3 it is frozen afterward so `generate` is
/// deterministic across repeated queries — unseen tokens are simply dropped
/// rather than allocating new vocabulary slots.
pub struct SparseEncoder {
    k1: f32,
    b: f32,
    vocabulary: HashMap<String, u32>,
    idf: HashMap<String, f32>,
    avg_doc_len: f32,
    trained: bool,
}

impl Default for SparseEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_K1, DEFAULT_B)
    }
}

impl SparseEncoder {
    pub fn new(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            vocabulary: HashMap::new(),
            idf: HashMap::new(),
            avg_doc_len: 0.0,
            trained: false,
        }
    }

    fn vocabulary_index(&mut self, token: &str) -> Option<u32> {
        if let Some(&idx) = self.vocabulary.get(token) {
            return Some(idx);
        }
        if self.trained {
            return None;
        }
        let idx = self.vocabulary.len() as u32;
        self.vocabulary.insert(token.to_string(), idx);
        Some(idx)
    }

    /// Computes document-frequency-based IDF over the training corpus and
    /// freezes the vocabulary. `idf(t) = ln((N - df + 0.5) / (df + 0.5) + 1)`.
    pub fn train(&mut self, docs: &[String]) {
        let n = docs.len() as f32;
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0usize;

        for doc in docs {
            let tokens = tokenize(doc);
            total_len += tokens.len();
            let mut seen = std::collections::HashSet::new();
            for token in &tokens {
                self.vocabulary_index(token);
                if seen.insert(token.clone()) {
                    *doc_freq.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }

        self.avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / n
        };

        for (token, df) in doc_freq {
            let idf = ((n - df as f32 + 0.5) / (df as f32 + 0.5) + 1.0).ln();
            self.idf.insert(token, idf);
        }

        self.trained = true;
    }

    /// Generates a sparse BM25 vector for `text`. `doc_len_override` lets
    /// callers pass the true document length at query time; defaults to the
    /// trained average.
    pub fn generate(&mut self, text: &str, doc_len_override: Option<usize>) -> SparseVector {
        let tokens = tokenize(text);
        let doc_len = doc_len_override.unwrap_or(tokens.len()).max(1) as f32;
        let avg_len = if self.avg_doc_len > 0.0 {
            self.avg_doc_len
        } else {
            doc_len
        };

        let mut term_freq: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *term_freq.entry(token.clone()).or_insert(0) += 1;
        }

        let mut indices = Vec::new();
        let mut values = Vec::new();

        for (token, tf) in term_freq {
            let Some(idx) = self.vocabulary_index(&token) else {
                continue;
            };
            let idf = *self.idf.get(&token).unwrap_or(&1.0);
            let tf = tf as f32;
            let numerator = tf * (self.k1 + 1.0);
            let denominator = tf + self.k1 * (1.0 - self.b + self.b * (doc_len / avg_len));
            let score = idf * (numerator / denominator);
            if score > 0.0 {
                indices.push(idx);
                values.push(score);
            }
        }

        SparseVector::new(indices, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_without_training_builds_vocabulary() {
        let mut encoder = SparseEncoder::default();
        let vector = encoder.generate("hello world hello", None);
        assert_eq!(vector.len(), 2);
    }

    #[test]
    fn test_vocabulary_frozen_after_train() {
        let mut encoder = SparseEncoder::default();
        encoder.train(&["known term".to_string()]);
        let vector = encoder.generate("known unseen", None);
        // "unseen" never enters the vocabulary post-freeze.
        assert_eq!(vector.len(), 1);
    }

    #[test]
    fn test_scores_are_positive() {
        let mut encoder = SparseEncoder::default();
        encoder.train(&["alpha beta".to_string(), "alpha gamma".to_string()]);
        let vector = encoder.generate("alpha beta", None);
        assert!(vector.values.iter().all(|&v| v >= 0.0));
    }
}
