use std::ops::{Add, Index, IndexMut, Mul, Sub};

use bevy::math::Vec3;

/// Dense row-major matrix used for basis changes along river segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size, size);
        for i in 0..size {
            matrix[(i, i)] = 1.0;
        }
        matrix
    }

    pub fn from_row_slice(rows: usize, cols: usize, values: &[f32]) -> Self {
        assert_eq!(
            values.len(),
            rows * cols,
            "matrix of {rows}x{cols} needs {} values",
            rows * cols
        );
        Self {
            rows,
            cols,
            data: values.to_vec(),
        }
    }

    /// Builds a 3xN matrix whose columns are the given vectors.
    pub fn from_columns(columns: &[Vec3]) -> Self {
        let mut matrix = Self::zeros(3, columns.len());
        for (col, vector) in columns.iter().enumerate() {
            matrix.set_column(col, *vector);
        }
        matrix
    }

    pub fn column_vector(vector: Vec3) -> Self {
        Self::from_columns(&[vector])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn column(&self, col: usize) -> Vec3 {
        assert_eq!(self.rows, 3, "column extraction needs three rows");
        Vec3::new(self[(0, col)], self[(1, col)], self[(2, col)])
    }

    pub fn row(&self, row: usize) -> Vec3 {
        assert_eq!(self.cols, 3, "row extraction needs three columns");
        Vec3::new(self[(row, 0)], self[(row, 1)], self[(row, 2)])
    }

    pub fn set_column(&mut self, col: usize, vector: Vec3) {
        assert_eq!(self.rows, 3, "column assignment needs three rows");
        self[(0, col)] = vector.x;
        self[(1, col)] = vector.y;
        self[(2, col)] = vector.z;
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out[(c, r)] = self[(r, c)];
            }
        }
        out
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Reads a 3x1 matrix back into a vector.
    pub fn to_vec3(&self) -> Vec3 {
        assert!(
            self.rows == 3 && self.cols == 1,
            "expected a 3x1 matrix, got {}x{}",
            self.rows,
            self.cols
        );
        self.column(0)
    }

    pub fn mul_vec3(&self, vector: Vec3) -> Vec3 {
        (self * &Self::column_vector(vector)).to_vec3()
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) outside {}x{} matrix",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    fn zip_with(&self, other: &Matrix, op: impl Fn(f32, f32) -> f32) -> Matrix {
        assert!(
            self.rows == other.rows && self.cols == other.cols,
            "element-wise op on {}x{} and {}x{}",
            self.rows,
            self.cols,
            other.rows,
            other.cols
        );
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| op(*a, *b))
                .collect(),
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        &self.data[self.offset(row, col)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        let offset = self.offset(row, col);
        &mut self.data[offset]
    }
}

impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        assert_eq!(
            self.cols, rhs.rows,
            "cannot multiply {}x{} by {}x{}",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        for r in 0..self.rows {
            for c in 0..rhs.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self[(r, k)] * rhs[(k, c)];
                }
                out[(r, c)] = sum;
            }
        }
        out
    }
}

impl Add<&Matrix> for &Matrix {
    type Output = Matrix;

    fn add(self, rhs: &Matrix) -> Matrix {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub<&Matrix> for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: &Matrix) -> Matrix {
        self.zip_with(rhs, |a, b| a - b)
    }
}

/// Orthonormal frame whose first axis runs along a chord.
///
/// Rows of the stored matrix are the frame axes, so multiplying by it maps
/// standard coordinates into the frame and its transpose maps back.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeOfBasis {
    matrix: Matrix,
}

impl ChangeOfBasis {
    pub fn along(start: Vec3, end: Vec3) -> Self {
        let axis0 = (end - start).normalize_or_zero();
        let axis1 = if axis0.x != 0.0 {
            Vec3::new((-axis0.y - axis0.z) / axis0.x, 1.0, 1.0).normalize_or_zero()
        } else {
            Vec3::X
        };
        let axis2 = axis0.cross(axis1);
        Self {
            matrix: Matrix::from_columns(&[axis0, axis1, axis2]).transpose(),
        }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn axes(&self) -> [Vec3; 3] {
        [self.matrix.row(0), self.matrix.row(1), self.matrix.row(2)]
    }

    pub fn to_custom(&self, origin: Vec3, vector: Vec3) -> Vec3 {
        self.matrix.mul_vec3(vector - origin)
    }

    pub fn to_standard(&self, origin: Vec3, vector: Vec3) -> Vec3 {
        self.matrix.transpose().mul_vec3(vector) + origin
    }
}

/// Point `distance` units from `start` along the chord towards `end`.
pub fn interpolate(start: Vec3, end: Vec3, distance: f32) -> Vec3 {
    ChangeOfBasis::along(start, end).to_standard(start, Vec3::new(distance, 0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn identity_product_is_neutral() {
        let m = Matrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let product = &Matrix::identity(3) * &m;
        assert_eq!(product, m);
        assert_eq!(m.transpose().transpose(), m);
        assert_eq!(m.transpose()[(1, 2)], 6.0);
    }

    #[test]
    fn add_and_sub_are_element_wise() {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = Matrix::identity(2).scale(2.0);
        assert_eq!(&a + &b, Matrix::from_row_slice(2, 2, &[3.0, 2.0, 3.0, 6.0]));
        assert_eq!(&(&a + &b) - &b, a);
    }

    #[test]
    #[should_panic(expected = "cannot multiply")]
    fn mismatched_product_panics() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        let _ = &a * &b;
    }

    #[test]
    fn change_of_basis_is_orthonormal() {
        let cases = [
            (Vec3::ZERO, Vec3::new(3.0, 1.0, -2.0)),
            (Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 4.0)),
            (Vec3::new(-2.0, 5.0, 0.5), Vec3::new(-7.0, 5.0, 0.5)),
        ];
        for (start, end) in cases {
            let axes = ChangeOfBasis::along(start, end).axes();
            for (i, a) in axes.iter().enumerate() {
                assert!((a.length() - 1.0).abs() < 1e-5, "axis {i} not unit");
                for b in axes.iter().skip(i + 1) {
                    assert!(a.dot(*b).abs() < 1e-5, "axes not orthogonal");
                }
            }
            assert!(close(axes[0], (end - start).normalize()));
        }
    }

    #[test]
    fn custom_and_standard_coordinates_round_trip() {
        let basis = ChangeOfBasis::along(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 0.0, -1.0));
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let point = Vec3::new(-3.0, 7.5, 0.25);
        let local = basis.to_custom(origin, point);
        assert!(close(basis.to_standard(origin, local), point));
    }

    #[test]
    fn interpolate_walks_along_chord() {
        let start = Vec3::new(0.0, 0.0, 0.0);
        let end = Vec3::new(0.0, 0.0, 2.0);
        assert!(close(interpolate(start, end, 1.0), Vec3::new(0.0, 0.0, 1.0)));
        let diagonal = interpolate(Vec3::ONE, Vec3::new(4.0, 5.0, 1.0), 2.5);
        assert!(close(diagonal, Vec3::new(2.5, 3.0, 1.0)));
    }
}
