// src/algebra/mod.rs

//! Dense complex matrices sized for spin calculations.
//!
//! Matrices are small (2x2 for spin-1/2, 3x3 for spin-1, plus the d×1 and
//! 1×d shapes used for kets and bras), so everything is a row-major
//! `Vec<Complex<f64>>` with no attempt at blocking or SIMD.
//!
//! Operand shapes are fixed by the spin multiplicity chosen at configuration
//! time, so a shape mismatch is a programming error and panics.

use num_complex::Complex;
use num_traits::{One, Zero};
use std::fmt;
use std::ops::{Add, Mul};

/// A dense `rows × cols` complex matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Complex<f64>>,
}

impl ComplexMatrix {
    /// Builds a matrix from row-major entries.
    ///
    /// # Panics
    /// If `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Complex<f64>>) -> Self {
        assert_eq!(data.len(), rows * cols, "ComplexMatrix::from_vec: {} entries for a {}x{} matrix", data.len(), rows, cols);
        Self { rows, cols, data }
    }

    /// Builds a matrix from nested rows.
    ///
    /// # Panics
    /// If the rows have different lengths.
    pub fn from_rows<const C: usize>(rows: &[[Complex<f64>; C]]) -> Self {
        let data = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Self::from_vec(rows.len(), C, data)
    }

    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![Complex::zero(); rows * cols] }
    }

    /// The `d × d` identity.
    pub fn identity(d: usize) -> Self {
        let mut m = Self::zeros(d, d);
        for i in 0..d {
            m.data[i * d + i] = Complex::one();
        }
        m
    }

    /// A `d × 1` column vector (ket).
    pub fn column(entries: &[Complex<f64>]) -> Self {
        Self::from_vec(entries.len(), 1, entries.to_vec())
    }

    /// A `1 × d` row vector.
    pub fn row(entries: &[Complex<f64>]) -> Self {
        Self::from_vec(1, entries.len(), entries.to_vec())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Entry at `(row, col)`.
    ///
    /// # Panics
    /// If the position is out of range.
    pub fn get(&self, row: usize, col: usize) -> Complex<f64> {
        assert!(row < self.rows && col < self.cols, "ComplexMatrix::get: ({}, {}) outside {}x{}", row, col, self.rows, self.cols);
        self.data[row * self.cols + col]
    }

    /// Row-major view of the entries.
    pub fn as_slice(&self) -> &[Complex<f64>] {
        &self.data
    }

    /// Entry-wise sum.
    pub fn add(&self, other: &ComplexMatrix) -> ComplexMatrix {
        self.assert_same_shape(other, "add");
        let data = self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect();
        Self::from_vec(self.rows, self.cols, data)
    }

    /// Multiplies every entry by `s`.
    pub fn scalar_multiply(&self, s: Complex<f64>) -> ComplexMatrix {
        let data = self.data.iter().map(|a| a * s).collect();
        Self::from_vec(self.rows, self.cols, data)
    }

    /// Matrix product `self · other`. Also covers matrix × column vector.
    ///
    /// # Panics
    /// If `self.cols() != other.rows()`.
    pub fn multiply(&self, other: &ComplexMatrix) -> ComplexMatrix {
        assert_eq!(
            self.cols, other.rows,
            "ComplexMatrix::multiply: {}x{} times {}x{}",
            self.rows, self.cols, other.rows, other.cols
        );
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a.is_zero() {
                    continue;
                }
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.data[k * other.cols + j];
                }
            }
        }
        out
    }

    /// Applies the matrix to a vector of amplitudes.
    pub fn apply(&self, vector: &[Complex<f64>]) -> Vec<Complex<f64>> {
        self.multiply(&Self::column(vector)).data
    }

    /// Hermitian adjoint `A†`.
    pub fn conjugate_transpose(&self) -> ComplexMatrix {
        let mut out = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.data[j * self.rows + i] = self.data[i * self.cols + j].conj();
            }
        }
        out
    }

    /// Kronecker (tensor) product `self ⊗ other`.
    ///
    /// For a `d × 1` ket and a `1 × d` bra this is the `d × d` outer
    /// product `|a⟩⟨b|`.
    pub fn kron(&self, other: &ComplexMatrix) -> ComplexMatrix {
        let rows = self.rows * other.rows;
        let cols = self.cols * other.cols;
        let mut out = Self::zeros(rows, cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                let a = self.data[i * self.cols + j];
                for k in 0..other.rows {
                    for l in 0..other.cols {
                        let r = i * other.rows + k;
                        let c = j * other.cols + l;
                        out.data[r * cols + c] = a * other.data[k * other.cols + l];
                    }
                }
            }
        }
        out
    }

    /// Sum of the diagonal.
    ///
    /// # Panics
    /// If the matrix is not square.
    pub fn trace(&self) -> Complex<f64> {
        assert!(self.is_square(), "ComplexMatrix::trace: {}x{} is not square", self.rows, self.cols);
        (0..self.rows).map(|i| self.data[i * self.cols + i]).sum()
    }

    /// `A · A`.
    pub fn square(&self) -> ComplexMatrix {
        self.multiply(self)
    }

    /// `exp(-i·angle·H)` for a Hermitian generator whose eigenvalues all lie
    /// in `{1, 0, -1}`, through the closed form
    /// `I − i·sin(angle)·H + (cos(angle) − 1)·H²`.
    ///
    /// Covers `n·σ` for spin-1/2 (where `H² = I` and the expression reduces
    /// to `cos·I − i·sin·H`) and `n·S` for spin-1. The eigenvalue condition is
    /// not checked.
    pub fn spin_exponential(generator: &ComplexMatrix, angle: f64) -> ComplexMatrix {
        assert!(generator.is_square(), "ComplexMatrix::spin_exponential: generator must be square");
        let (sin_a, cos_a) = angle.sin_cos();
        Self::identity(generator.rows)
            .add(&(generator * Complex::new(0.0, -sin_a)))
            .add(&(&generator.square() * Complex::new(cos_a - 1.0, 0.0)))
    }

    /// Largest entry-wise modulus of `self - other`.
    pub fn max_deviation(&self, other: &ComplexMatrix) -> f64 {
        self.assert_same_shape(other, "max_deviation");
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    /// Entry-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &ComplexMatrix, tolerance: f64) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.max_deviation(other) <= tolerance
    }

    fn assert_same_shape(&self, other: &ComplexMatrix, op: &str) {
        assert!(
            self.rows == other.rows && self.cols == other.cols,
            "ComplexMatrix::{}: {}x{} vs {}x{}",
            op, self.rows, self.cols, other.rows, other.cols
        );
    }
}

impl Add for &ComplexMatrix {
    type Output = ComplexMatrix;

    fn add(self, rhs: &ComplexMatrix) -> ComplexMatrix {
        ComplexMatrix::add(self, rhs)
    }
}

impl Mul for &ComplexMatrix {
    type Output = ComplexMatrix;

    fn mul(self, rhs: &ComplexMatrix) -> ComplexMatrix {
        self.multiply(rhs)
    }
}

impl Mul<Complex<f64>> for &ComplexMatrix {
    type Output = ComplexMatrix;

    fn mul(self, rhs: Complex<f64>) -> ComplexMatrix {
        self.scalar_multiply(rhs)
    }
}

impl fmt::Display for ComplexMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            write!(f, "[")?;
            for j in 0..self.cols {
                write!(f, "{}{:.4}", if j > 0 { ", " } else { "" }, self.data[i * self.cols + j])?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
