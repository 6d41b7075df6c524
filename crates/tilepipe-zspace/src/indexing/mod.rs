//! Indexing Utilities

use crate::ShapeError;

/// Linear element offset of `indices` under `strides`.
///
/// Only the common prefix of both slices is used.
pub fn ravel_index(indices: &[usize], strides: &[usize]) -> usize {
    indices.iter().zip(strides).map(|(i, s)| i * s).sum()
}

/// Decompose a row-major linear position into one index per dimension of `shape`.
pub fn unravel_index<const N: usize>(
    linear: usize,
    shape: &[usize; N],
) -> Result<[usize; N], ShapeError> {
    let total: usize = shape.iter().product();
    if linear >= total {
        return Err(ShapeError::OutOfBounds {
            dim: 0,
            index: linear,
            extent: total,
        });
    }

    let mut remaining = linear;
    let mut indices = [0; N];
    for dim in (0..N).rev() {
        indices[dim] = remaining % shape[dim];
        remaining /= shape[dim];
    }

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ravel_matches_strides() {
        assert_eq!(ravel_index(&[1, 2, 3], &[64, 16, 1]), 99);
    }

    #[test]
    fn unravel_round_trips() {
        let shape = [2, 3, 4];
        for linear in 0..24 {
            let indices = unravel_index(linear, &shape).unwrap();
            assert_eq!(ravel_index(&indices, &[12, 4, 1]), linear);
        }
    }

    #[test]
    fn unravel_rejects_overflow() {
        assert!(unravel_index(24, &[2, 3, 4]).is_err());
    }
}
