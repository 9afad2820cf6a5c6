//! A minimal sparse matrix keyed by `(row, col)`, used for both the
//! stoichiometry matrix (`i32` net coefficients) and the Jacobian (`f64`
//! partial derivatives). Neither matrix is large enough in practice to
//! justify a compressed-storage format; a hash map of explicit entries is
//! the simplest thing that satisfies the "sparse, queryable by (i, j)"
//! contract, and it is rebuilt wholesale on every `generate_*` call rather
//! than updated incrementally.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SparseMatrix<V> {
    rows: usize,
    cols: usize,
    entries: HashMap<(usize, usize), V>,
}

impl<V: Copy + Default> SparseMatrix<V> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: HashMap::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn set(&mut self, row: usize, col: usize, value: V) {
        debug_assert!(row < self.rows && col < self.cols);
        self.entries.insert((row, col), value);
    }

    pub fn get(&self, row: usize, col: usize) -> V {
        self.entries.get(&(row, col)).copied().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_entries_default_to_zero() {
        let m: SparseMatrix<f64> = SparseMatrix::new(3, 3);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut m: SparseMatrix<i32> = SparseMatrix::new(2, 2);
        m.set(0, 1, -3);
        assert_eq!(m.get(0, 1), -3);
        assert_eq!(m.get(1, 0), 0);
        assert_eq!(m.nnz(), 1);
    }
}
