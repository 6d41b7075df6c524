//! # Stride Layout Builders

use crate::{Strides, strides};

/// Construct row-major contiguous strides for a shape.
///
/// This will return new ``strides`` such that:
/// - ``strides.len() == shape.len()``
/// - ``strides[rank - 1] == 1``
/// - ``for i in 0..rank - 1 { strides[i] == strides[i + 1] * shape[i + 1] }``
///
/// If ``rank == 0``, this will return empty strides.
pub fn row_major_contiguous_strides<S>(shape: S) -> Strides
where
    S: AsRef<[usize]>,
{
    let shape = shape.as_ref();
    let rank = shape.len();
    let mut strides = strides![1; rank];
    if rank > 1 {
        for i in (0..rank - 1).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
    }
    strides
}

/// Construct column-major strides for the two innermost dimensions of a shape.
///
/// The matrix formed by the last two dimensions is stored column by column, outer
/// dimensions stay row-major over whole matrices:
/// - ``strides[rank - 2] == 1``
/// - ``strides[rank - 1] == shape[rank - 2]``
///
/// Shapes of rank below 2 are returned as row-major.
pub fn col_major_contiguous_strides<S>(shape: S) -> Strides
where
    S: AsRef<[usize]>,
{
    let shape = shape.as_ref();
    let rank = shape.len();
    if rank < 2 {
        return row_major_contiguous_strides(shape);
    }

    let mut strides = strides![1; rank];
    strides[rank - 1] = shape[rank - 2];
    let matrix = shape[rank - 2] * shape[rank - 1];
    if rank > 2 {
        strides[rank - 3] = matrix;
        for i in (0..rank - 3).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
    }
    strides
}
