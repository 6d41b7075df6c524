use serde::{Deserialize, Serialize};

use crate::{
    MAX_RANK, Shape, ShapeError, Strides, striding::row_major_contiguous_strides,
};

/// An ordered tuple of (extent, stride) pairs.
///
/// The rank is fixed at construction and never exceeds [MAX_RANK].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeStride {
    shape: Shape,
    strides: Strides,
}

impl ShapeStride {
    /// Pair a shape with its strides.
    pub fn new(shape: impl Into<Shape>, strides: impl Into<Strides>) -> Result<Self, ShapeError> {
        let shape = shape.into();
        let strides = strides.into();

        if shape.rank() != strides.rank() {
            return Err(ShapeError::RankMismatch {
                left: shape.rank(),
                right: strides.rank(),
            });
        }
        if shape.rank() > MAX_RANK {
            return Err(ShapeError::RankTooLarge {
                rank: shape.rank(),
                max: MAX_RANK,
            });
        }

        Ok(Self { shape, strides })
    }

    /// Row-major contiguous descriptor for the given shape.
    pub fn contiguous(shape: impl Into<Shape>) -> Result<Self, ShapeError> {
        let shape = shape.into();
        let strides = row_major_contiguous_strides(&*shape);
        Self::new(shape, strides)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Prepend unit dimensions until the descriptor reaches `rank`.
    ///
    /// The stride of an added dimension never matters since its only index is zero.
    pub fn padded_to(&self, rank: usize) -> Self {
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        while shape.rank() < rank {
            let outer = shape.first().copied().unwrap_or(1) * strides.first().copied().unwrap_or(1);
            shape = shape.padded_to(shape.rank() + 1);
            strides.insert(0, outer);
        }
        Self { shape, strides }
    }

    /// Strided element offset of a multi-dimensional index.
    pub fn offset(&self, indices: &[usize]) -> Result<usize, ShapeError> {
        if indices.len() != self.rank() {
            return Err(ShapeError::RankMismatch {
                left: self.rank(),
                right: indices.len(),
            });
        }

        let mut offset = 0;
        for (dim, ((index, extent), stride)) in indices
            .iter()
            .zip(self.shape.iter())
            .zip(self.strides.iter())
            .enumerate()
        {
            if index >= extent {
                return Err(ShapeError::OutOfBounds {
                    dim,
                    index: *index,
                    extent: *extent,
                });
            }
            offset += index * stride;
        }

        Ok(offset)
    }

    /// Largest element offset addressed by the descriptor, `None` when it addresses nothing.
    pub fn max_offset(&self) -> Option<usize> {
        if self.shape.contains(&0) {
            return None;
        }

        Some(
            self.shape
                .iter()
                .zip(self.strides.iter())
                .map(|(extent, stride)| (extent - 1) * stride)
                .sum(),
        )
    }

    /// Whether the descriptor is row-major contiguous.
    pub fn is_contiguous(&self) -> bool {
        self.strides == row_major_contiguous_strides(&*self.shape)
    }
}
