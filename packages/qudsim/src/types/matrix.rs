//! Segment x segment matrices.
//!
//! Backed by `ndarray`, serialized as nested lists (`[[row], [row], ...]`)
//! so the report stays a plain tree.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued segment score matrix, entries in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix(Array2<f64>);

impl ScoreMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self(Array2::zeros((rows, cols)))
    }

    pub fn from_array(array: Array2<f64>) -> Self {
        Self(array)
    }

    /// Build from row vectors. `None` if rows differ in length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        rows_to_array(rows).map(Self)
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.0
    }

    pub fn into_array(self) -> Array2<f64> {
        self.0
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.0.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.0.get((row, col)).copied()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.0.outer_iter().map(|row| row.to_vec()).collect()
    }
}

/// Binary alignment graph derived from a score matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentMatrix(Array2<u8>);

impl AlignmentMatrix {
    pub fn from_array(array: Array2<u8>) -> Self {
        Self(array)
    }

    pub fn from_rows(rows: Vec<Vec<u8>>) -> Option<Self> {
        rows_to_array(rows).map(Self)
    }

    pub fn as_array(&self) -> &Array2<u8> {
        &self.0
    }

    pub fn shape(&self) -> (usize, usize) {
        self.0.dim()
    }

    pub fn is_aligned(&self, row: usize, col: usize) -> bool {
        self.0.get((row, col)).is_some_and(|cell| *cell > 0)
    }

    /// `(source_segment, target_segment)` of every aligned cell, row-major.
    pub fn aligned_cells(&self) -> Vec<(usize, usize)> {
        self.0
            .indexed_iter()
            .filter(|(_, cell)| **cell > 0)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn count_aligned(&self) -> usize {
        self.0.iter().filter(|cell| **cell > 0).count()
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.0.outer_iter().map(|row| row.to_vec()).collect()
    }
}

fn rows_to_array<T: Clone>(rows: Vec<Vec<T>>) -> Option<Array2<T>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != ncols) {
        return None;
    }
    let flat: Vec<T> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat).ok()
}

impl Serialize for ScoreMatrix {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScoreMatrix {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
        Self::from_rows(rows).ok_or_else(|| serde::de::Error::custom("matrix rows differ in length"))
    }
}

impl Serialize for AlignmentMatrix {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AlignmentMatrix {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<u8>>::deserialize(deserializer)?;
        Self::from_rows(rows).ok_or_else(|| serde::de::Error::custom("matrix rows differ in length"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(ScoreMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.3]]).is_none());
    }

    #[test]
    fn test_serializes_as_nested_lists() {
        let matrix = ScoreMatrix::from_rows(vec![vec![1.0, 0.0], vec![0.25, 0.5]]).unwrap();
        let json = serde_json::to_string(&matrix).unwrap();
        assert_eq!(json, "[[1.0,0.0],[0.25,0.5]]");

        let back: ScoreMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, matrix);
    }

    #[test]
    fn test_aligned_cells_row_major() {
        let matrix = AlignmentMatrix::from_rows(vec![vec![0, 1], vec![1, 1]]).unwrap();
        assert_eq!(matrix.aligned_cells(), vec![(0, 1), (1, 0), (1, 1)]);
        assert_eq!(matrix.count_aligned(), 3);
        assert!(!matrix.is_aligned(0, 0));
        assert!(!matrix.is_aligned(5, 5));
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = ScoreMatrix::from_rows(vec![]).unwrap();
        assert_eq!(matrix.shape(), (0, 0));
    }
}
