//! MatrixEngine: an L×L integer matrix squared on every draw.
//!
//! Each 32-bit output squares the matrix, adds a rotating cursor to every
//! cell, then folds the cell bytes into four output bytes. Bits are served
//! from each output word with the sign bit complemented first.

use crate::ambient::AmbientEntropy;
use crate::bit_source::BitSource;
use crate::error::{Error, Result};

/// Pseudo-random engine over a square `i32` matrix with wrapping arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixEngine {
    side: usize,
    /// Row index is `y`, column `x`; cell `(x, y)` lives at `x + y * side`.
    cells: Vec<i32>,
    scratch: Vec<i32>,
    cursor: i32,
    word: u32,
    pending: u32,
}

impl MatrixEngine {
    /// Fill the cells from a 64-bit seed.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `side < 2`.
    pub fn new(side: usize, seed: i64) -> Result<Self> {
        check_side(side)?;
        let mut seed = seed;
        let cells = (0..side * side)
            .map(|_| {
                let cell = seed as i32;
                seed = seed.wrapping_add(1234);
                seed = seed.wrapping_mul(seed);
                seed /= 3;
                cell
            })
            .collect();
        Ok(Self::with_cells(side, cells))
    }

    /// Start from explicit cell values, row-major.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `side < 2` or `cells.len() != side * side`.
    pub fn from_cells(side: usize, cells: &[i32]) -> Result<Self> {
        check_side(side)?;
        if cells.len() != side * side {
            return Err(Error::invalid_argument(format!(
                "a {side}x{side} matrix needs {} cells, got {}",
                side * side,
                cells.len()
            )));
        }
        Ok(Self::with_cells(side, cells.to_vec()))
    }

    /// Seed from the ambient high-resolution clock.
    pub fn from_clock<A: AmbientEntropy>(side: usize, ambient: &A) -> Result<Self> {
        Self::new(side, ambient.nanos())
    }

    fn with_cells(side: usize, cells: Vec<i32>) -> Self {
        Self {
            side,
            scratch: cells.clone(),
            cells,
            cursor: 0,
            word: 0,
            pending: 0,
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    fn square(&mut self) {
        let n = self.side;
        for x in 0..n {
            for y in 0..n {
                self.scratch[x + y * n] = (0..n).fold(0i32, |sum, i| {
                    sum.wrapping_add(self.cells[x + n * i].wrapping_mul(self.cells[i + n * y]))
                });
            }
        }
        self.cells.copy_from_slice(&self.scratch);
    }

    /// Add the cursor to every cell of both buffers, then advance it.
    fn increment(&mut self) {
        for (cell, spare) in self.cells.iter_mut().zip(self.scratch.iter_mut()) {
            *cell = cell.wrapping_add(self.cursor);
            *spare = spare.wrapping_add(self.cursor);
        }
        self.cursor += 1;
        if self.cursor as usize == self.cells.len() {
            self.cursor = 0;
        }
    }

    /// Fold four consecutive cells at every offset into four output bytes.
    fn fold(&self) -> i32 {
        let mut out = [0u8, 1, 2, 3];
        for window in self.cells.windows(4) {
            let lanes = [
                window[0].to_be_bytes(),
                window[1].to_be_bytes(),
                window[2].to_be_bytes(),
                window[3].to_be_bytes(),
            ];
            for (r, byte) in out.iter_mut().enumerate() {
                for k in 0..4 {
                    *byte = byte.wrapping_add(lanes[(r + k) % 4][k]);
                }
            }
        }
        i32::from_be_bytes(out)
    }
}

fn check_side(side: usize) -> Result<()> {
    if side < 2 {
        return Err(Error::invalid_argument(format!(
            "matrix side must be at least 2, got {side}"
        )));
    }
    Ok(())
}

impl BitSource for MatrixEngine {
    fn next_bit(&mut self) -> bool {
        if self.pending == 0 {
            self.word = self.next_int() as u32 ^ 0x8000_0000;
            self.pending = 32;
        }
        self.pending -= 1;
        (self.word >> self.pending) & 1 == 1
    }

    fn is_pseudo(&self) -> bool {
        true
    }

    /// One square-increment-fold step. Does not touch buffered bits.
    fn next_int(&mut self) -> i32 {
        self.square();
        self.increment();
        self.fold()
    }
}
