use core::ops::{Deref, DerefMut};

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{INLINE_DIMS, ShapeError};

/// Element strides, one per dimension, expressed in elements (not bytes).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash, Default)]
pub struct Strides {
    dims: SmallVec<[usize; INLINE_DIMS]>,
}

impl Strides {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    pub fn new_raw(dims: SmallVec<[usize; INLINE_DIMS]>) -> Self {
        Self { dims }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Insert a stride at position `index`.
    pub fn insert(&mut self, index: usize, stride: usize) {
        self.dims.insert(index, stride);
    }

    /// Appends a stride to the back.
    pub fn push(&mut self, stride: usize) {
        self.dims.push(stride)
    }

    /// Reorder the strides according to the permutation of `axes`.
    pub fn permute(&mut self, axes: &[usize]) -> Result<(), ShapeError> {
        if axes.len() != self.rank() {
            return Err(ShapeError::RankMismatch {
                left: self.rank(),
                right: axes.len(),
            });
        }
        debug_assert!(axes.iter().all(|i| i < &self.rank()));

        self.dims = axes.iter().map(|&i| self.dims[i]).collect();
        Ok(())
    }

    /// Reorder the strides according to the permutation of `axes`.
    pub fn permuted(mut self, axes: &[usize]) -> Result<Self, ShapeError> {
        self.permute(axes)?;
        Ok(self)
    }
}

impl Deref for Strides {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.dims
    }
}

impl DerefMut for Strides {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dims
    }
}

#[macro_export]
macro_rules! strides {
    () => (
        $crate::Strides::new_raw($crate::SmallVec::new())
    );
    ($elem:expr; $n:expr) => ({
        $crate::Strides::new_raw($crate::smallvec!($elem; $n))
    });
    ($($x:expr),+$(,)?) => ({
        $crate::Strides::new_raw($crate::smallvec!($($x),*))
    });
}

impl<const N: usize> From<[usize; N]> for Strides {
    fn from(dims: [usize; N]) -> Self {
        Self::new(&dims)
    }
}

impl From<&[usize]> for Strides {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims)
    }
}

impl From<Vec<usize>> for Strides {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(&dims)
    }
}

impl From<&Strides> for Strides {
    fn from(value: &Strides) -> Self {
        value.clone()
    }
}

impl FromIterator<usize> for Strides {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Strides {
            dims: iter.into_iter().collect(),
        }
    }
}
