use alloc::vec::Vec;
use core::{marker::PhantomData, ops::Range};

use tilepipe_common::Element;
use tilepipe_runtime::memory::{BufferId, DeviceBuffer};
use tilepipe_zspace::{MAX_RANK, ShapeDecl, ShapeStride, indexing::ravel_index};

use crate::TileError;

/// Logical arrangement of a global tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GlobalLayout {
    /// Row-major, the last dimension is contiguous.
    Nd,
    /// Column-major, the fourth dimension is contiguous.
    Dn,
    /// Blocked, with dimensions `(batch, col_blocks, row_blocks, block_rows, block_cols)`.
    Nz,
}

impl GlobalLayout {
    /// Dimension that must have a unit stride, counted on the rank 5 descriptor.
    const fn contiguous_dim(self) -> usize {
        match self {
            GlobalLayout::Nd | GlobalLayout::Nz => MAX_RANK - 1,
            GlobalLayout::Dn => MAX_RANK - 2,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            GlobalLayout::Nd => "ND",
            GlobalLayout::Dn => "DN",
            GlobalLayout::Nz => "NZ",
        }
    }
}

/// Declaration of a global tensor, checked against the actual shape when bound.
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct GlobalTensorSpec {
    decl: ShapeDecl,
    layout: GlobalLayout,
}

impl GlobalTensorSpec {
    /// Row-major declaration with every extent supplied at bind time.
    pub fn nd(rank: usize) -> Result<Self, TileError> {
        Ok(Self::new(ShapeDecl::dynamic(rank)?, GlobalLayout::Nd))
    }

    /// The declared shape.
    pub fn decl(&self) -> &ShapeDecl {
        &self.decl
    }

    /// The declared layout.
    pub fn layout(&self) -> GlobalLayout {
        self.layout
    }

    /// Bind the declaration to a device buffer.
    ///
    /// Fails when the shape disagrees with the declaration, the strides don't match the layout
    /// or the tensor addresses past the end of the buffer.
    pub fn bind<E: Element>(
        &self,
        buffer: &DeviceBuffer,
        shape: &[usize],
        strides: &[usize],
    ) -> Result<GlobalTensor<E>, TileError> {
        let shape = self.decl.resolve(shape)?;
        let desc = ShapeStride::new(shape, strides)?.padded_to(MAX_RANK);

        let dim = self.layout.contiguous_dim();
        let stride = desc.strides()[dim];
        if desc.shape()[dim] > 1 && stride != 1 {
            return Err(TileError::Stride {
                layout: self.layout.name(),
                dim,
                stride,
            });
        }

        let dims = desc.shape();
        let extent = match self.layout {
            GlobalLayout::Nd | GlobalLayout::Dn => (dims[0] * dims[1] * dims[2] * dims[3], dims[4]),
            GlobalLayout::Nz => (dims[0] * dims[2] * dims[3], dims[1] * dims[4]),
        };

        let tensor = GlobalTensor {
            buffer: buffer.id(),
            offset: 0,
            desc,
            layout: self.layout,
            origin: (0, 0),
            extent,
            _elem: PhantomData,
        };
        tensor.check_bounds(buffer)?;

        Ok(tensor)
    }
}

/// A typed strided view over a device buffer, seen as a matrix.
///
/// The view owns no memory. Its rows flatten every dimension but the columns, and a window
/// restricts it to a rectangular region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalTensor<E: Element> {
    buffer: BufferId,
    offset: usize,
    desc: ShapeStride,
    layout: GlobalLayout,
    origin: (usize, usize),
    extent: (usize, usize),
    _elem: PhantomData<E>,
}

impl<E: Element> GlobalTensor<E> {
    /// Contiguous row-major view of a buffer.
    pub fn contiguous(buffer: &DeviceBuffer, shape: &[usize]) -> Result<Self, TileError> {
        let desc = ShapeStride::contiguous(shape)?;
        GlobalTensorSpec::nd(shape.len())?.bind(buffer, shape, desc.strides())
    }

    /// Buffer the view addresses.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Logical layout.
    pub fn layout(&self) -> GlobalLayout {
        self.layout
    }

    /// Rank 5 descriptor of the whole tensor.
    pub fn desc(&self) -> &ShapeStride {
        &self.desc
    }

    /// Rows of the window.
    pub fn rows(&self) -> usize {
        self.extent.0
    }

    /// Columns of the window.
    pub fn cols(&self) -> usize {
        self.extent.1
    }

    /// `(rows, cols)` of the window.
    pub fn shape(&self) -> (usize, usize) {
        self.extent
    }

    /// Rows and columns of the whole tensor.
    pub fn full_shape(&self) -> (usize, usize) {
        let dims = self.desc.shape();
        match self.layout {
            GlobalLayout::Nd | GlobalLayout::Dn => (dims[0] * dims[1] * dims[2] * dims[3], dims[4]),
            GlobalLayout::Nz => (dims[0] * dims[2] * dims[3], dims[1] * dims[4]),
        }
    }

    /// Sub-view of `rows x cols` elements starting at `(row, col)` of the current window.
    pub fn window(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self, TileError> {
        if row + rows > self.extent.0 || col + cols > self.extent.1 {
            return Err(TileError::OutOfBounds {
                op: "window",
                row,
                col,
                size: (rows, cols),
                extent: self.extent,
            });
        }

        Ok(Self {
            origin: (self.origin.0 + row, self.origin.1 + col),
            extent: (rows, cols),
            ..self.clone()
        })
    }

    /// Point the view at another buffer, shifted by `offset` elements.
    ///
    /// Shape, strides and window are preserved.
    pub fn rebind(&mut self, buffer: &DeviceBuffer, offset: usize) -> Result<(), TileError> {
        let previous = (self.buffer, self.offset);
        self.buffer = buffer.id();
        self.offset = offset;

        if let Err(err) = self.check_bounds(buffer) {
            (self.buffer, self.offset) = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Buffer element index of `(row, col)` in the window.
    pub fn index(&self, row: usize, col: usize) -> usize {
        let (row, col) = (self.origin.0 + row, self.origin.1 + col);
        let dims = self.desc.shape();

        let indices = match self.layout {
            GlobalLayout::Nd | GlobalLayout::Dn => {
                let i3 = row % dims[3];
                let rest = row / dims[3];
                let i2 = rest % dims[2];
                let rest = rest / dims[2];
                [rest / dims[1], rest % dims[1], i2, i3, col]
            }
            GlobalLayout::Nz => {
                let i3 = row % dims[3];
                let rest = row / dims[3];
                [rest / dims[2], col / dims[4], rest % dims[2], i3, col % dims[4]]
            }
        };

        self.offset + ravel_index(&indices, self.desc.strides())
    }

    /// Bytes of the buffer the window touches, as sorted disjoint runs.
    ///
    /// Windows of one buffer that share no element share no byte, even when their rows
    /// interleave.
    pub fn byte_ranges(&self) -> Vec<Range<usize>> {
        let (rows, cols) = self.extent;
        let mut indices: Vec<usize> = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| self.index(row, col)))
            .collect();
        indices.sort_unstable();
        indices.dedup();

        let size = size_of::<E>();
        let mut runs: Vec<Range<usize>> = Vec::new();
        for index in indices {
            match runs.last_mut() {
                Some(run) if run.end == index * size => run.end += size,
                _ => runs.push(index * size..(index + 1) * size),
            }
        }
        runs
    }

    fn check_bounds(&self, buffer: &DeviceBuffer) -> Result<(), TileError> {
        let len = buffer.len::<E>();
        match self.desc.max_offset() {
            Some(max) if self.offset + max >= len => Err(TileError::BufferTooSmall {
                max_index: self.offset + max,
                len,
            }),
            _ => Ok(()),
        }
    }
}
