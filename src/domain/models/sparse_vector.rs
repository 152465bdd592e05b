use serde::{Deserialize, Serialize};

/// A sparse BM25 vector: parallel index/value arrays over a frozen
/// vocabulary, suitable for a vector store's named sparse field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Self {
        Self { indices, values }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_len() {
        let v = SparseVector::new(vec![1, 4, 9], vec![0.5, 0.25, 0.1]);
        assert_eq!(v.len(), 3);
        assert!(!v.is_empty());
    }

    #[test]
    fn test_empty_sparse_vector() {
        let v = SparseVector::default();
        assert!(v.is_empty());
    }
}
