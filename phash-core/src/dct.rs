//! Separable two-dimensional DCT-II.

use std::fmt;
use std::sync::Arc;

use rustdct::{DctPlanner, TransformType2And3};

/// Planned 2-D type-II DCT for square `side`×`side` buffers.
///
/// Coefficients are unnormalized. Only their ordering relative to the median
/// matters downstream, so a uniform scale factor is irrelevant.
#[derive(Clone)]
pub struct Dct2d {
    side: usize,
    dct: Arc<dyn TransformType2And3<f32>>,
}

impl Dct2d {
    pub fn new(side: usize) -> Self {
        let mut planner = DctPlanner::new();
        let dct = planner.plan_dct2(side);
        Self { side, dct }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Transform a row-major `side`×`side` buffer in place.
    ///
    /// # Panics
    ///
    /// Panics if `buffer.len() != side * side`.
    pub fn process(&self, buffer: &mut [f32]) {
        let n = self.side;
        assert_eq!(buffer.len(), n * n, "DCT buffer must be side*side");

        let mut scratch = vec![0.0f32; self.dct.get_scratch_len()];
        let mut transposed = vec![0.0f32; n * n];

        for row in buffer.chunks_exact_mut(n) {
            self.dct.process_dct2_with_scratch(row, &mut scratch);
        }
        transpose(buffer, &mut transposed, n);

        for col in transposed.chunks_exact_mut(n) {
            self.dct.process_dct2_with_scratch(col, &mut scratch);
        }
        transpose(&transposed, buffer, n);
    }
}

impl fmt::Debug for Dct2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dct2d").field("side", &self.side).finish()
    }
}

fn transpose(src: &[f32], dst: &mut [f32], n: usize) {
    for row in 0..n {
        for col in 0..n {
            dst[col * n + row] = src[row * n + col];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct O(n^4) evaluation of the unnormalized DCT-II.
    fn naive_dct_2d(input: &[f32], n: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; n * n];
        for v in 0..n {
            for u in 0..n {
                let mut sum = 0.0f64;
                for y in 0..n {
                    for x in 0..n {
                        let cx = (std::f64::consts::PI * (2 * x + 1) as f64 * u as f64
                            / (2 * n) as f64)
                            .cos();
                        let cy = (std::f64::consts::PI * (2 * y + 1) as f64 * v as f64
                            / (2 * n) as f64)
                            .cos();
                        sum += input[y * n + x] as f64 * cx * cy;
                    }
                }
                out[v * n + u] = sum as f32;
            }
        }
        out
    }

    #[test]
    fn test_constant_input_has_only_dc() {
        let n = 8;
        let dct = Dct2d::new(n);
        let mut buffer = vec![3.0f32; n * n];
        dct.process(&mut buffer);

        assert!((buffer[0] - 3.0 * (n * n) as f32).abs() < 1e-3);
        for &c in &buffer[1..] {
            assert!(c.abs() < 1e-3, "AC coefficient should vanish, got {c}");
        }
    }

    #[test]
    fn test_matches_naive_dct() {
        let n = 8;
        let input: Vec<f32> = (0..n * n).map(|i| ((i * 37) % 11) as f32).collect();
        let expected = naive_dct_2d(&input, n);

        let mut buffer = input.clone();
        Dct2d::new(n).process(&mut buffer);

        for (got, want) in buffer.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-2, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_horizontal_ramp_energy_in_first_row() {
        let n = 16;
        let input: Vec<f32> = (0..n * n).map(|i| (i % n) as f32).collect();
        let mut buffer = input;
        Dct2d::new(n).process(&mut buffer);

        // A pure horizontal ramp has no vertical frequency content.
        for v in 1..n {
            for u in 0..n {
                assert!(buffer[v * n + u].abs() < 1e-2);
            }
        }
        assert!(buffer[1].abs() > 1.0);
    }
}
