use core::ops::{Deref, DerefMut};

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::INLINE_DIMS;

/// Extents of a descriptor, one per dimension.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash, Default)]
pub struct Shape {
    dims: SmallVec<[usize; INLINE_DIMS]>,
}

impl Shape {
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

    /// Total number of elements described by the shape.
    ///
    /// A rank-0 shape describes a single element.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Prepend unit dimensions until the shape reaches `rank`.
    pub fn padded_to(&self, rank: usize) -> Self {
        let mut dims = self.dims.clone();
        while dims.len() < rank {
            dims.insert(0, 1);
        }
        Self { dims }
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.dims
    }
}

impl DerefMut for Shape {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dims
    }
}

#[macro_export]
macro_rules! shape {
    () => (
        $crate::Shape::new_raw($crate::SmallVec::new())
    );
    ($elem:expr; $n:expr) => ({
        $crate::Shape::new_raw($crate::smallvec!($elem; $n))
    });
    ($($x:expr),+$(,)?) => ({
        $crate::Shape::new_raw($crate::smallvec!($($x),*))
    });
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(&dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(&dims)
    }
}

impl From<&Shape> for Shape {
    fn from(value: &Shape) -> Self {
        value.clone()
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Shape {
            dims: iter.into_iter().collect(),
        }
    }
}
