use tilepipe_common::Element;

/// Bytes of one fractal block row, the width the matrix unit reads at once.
pub const BLOCK_BYTES: usize = 32;

/// Rows of one fractal block.
pub const BLOCK_ROWS: usize = 16;

/// Order of the blocks of a fractal layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlockOrder {
    /// Blocks of a block row are adjacent.
    RowMajor,
    /// Blocks of a block column are adjacent.
    ColMajor,
}

/// Order of the elements inside a fractal block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum InnerOrder {
    /// Elements of a row are adjacent.
    RowMajor,
    /// Elements of a column are adjacent.
    ColMajor,
}

/// Blocked layout required by the matrix unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new, serde::Serialize, serde::Deserialize)]
pub struct Fractal {
    /// Rows of a block.
    pub block_rows: usize,
    /// Columns of a block.
    pub block_cols: usize,
    /// Order of the blocks.
    pub order: BlockOrder,
    /// Order inside a block.
    pub inner: InnerOrder,
}

impl Fractal {
    /// Column-major blocks of row-major 16 x 32-byte blocks, the staging layout.
    pub fn nz<E: Element>() -> Self {
        Self::new(
            BLOCK_ROWS,
            block_cols::<E>(),
            BlockOrder::ColMajor,
            InnerOrder::RowMajor,
        )
    }

    /// Row-major blocks of row-major 16 x 32-byte blocks, the left operand layout.
    pub fn zz<E: Element>() -> Self {
        Self::new(
            BLOCK_ROWS,
            block_cols::<E>(),
            BlockOrder::RowMajor,
            InnerOrder::RowMajor,
        )
    }

    /// Row-major blocks of column-major 32-byte x 16 blocks, the right operand layout.
    pub fn zn<E: Element>() -> Self {
        Self::new(
            block_cols::<E>(),
            BLOCK_ROWS,
            BlockOrder::RowMajor,
            InnerOrder::ColMajor,
        )
    }

    /// Column-major blocks of row-major 16 x 16 blocks, the accumulator layout.
    pub fn accumulator() -> Self {
        Self::new(
            BLOCK_ROWS,
            BLOCK_ROWS,
            BlockOrder::ColMajor,
            InnerOrder::RowMajor,
        )
    }

    fn offset(&self, rows: usize, cols: usize, row: usize, col: usize) -> usize {
        let (block_row, inner_row) = (row / self.block_rows, row % self.block_rows);
        let (block_col, inner_col) = (col / self.block_cols, col % self.block_cols);

        let block = match self.order {
            BlockOrder::RowMajor => block_row * (cols / self.block_cols) + block_col,
            BlockOrder::ColMajor => block_col * (rows / self.block_rows) + block_row,
        };
        let inner = match self.inner {
            InnerOrder::RowMajor => inner_row * self.block_cols + inner_col,
            InnerOrder::ColMajor => inner_col * self.block_rows + inner_row,
        };

        block * self.block_rows * self.block_cols + inner
    }
}

fn block_cols<E: Element>() -> usize {
    BLOCK_BYTES / size_of::<E>()
}

/// Arrangement of the elements of a tile in its tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TileLayout {
    /// Elements of a row are adjacent.
    #[default]
    RowMajor,
    /// Elements of a column are adjacent.
    ColMajor,
    /// Blocked layout.
    Fractal(Fractal),
}

impl TileLayout {
    /// Element offset of `(row, col)` in a tile of `rows x cols` declared elements.
    pub fn offset(&self, rows: usize, cols: usize, row: usize, col: usize) -> usize {
        match self {
            TileLayout::RowMajor => row * cols + col,
            TileLayout::ColMajor => col * rows + row,
            TileLayout::Fractal(fractal) => fractal.offset(rows, cols, row, col),
        }
    }

    /// Whether the layout is blocked.
    pub fn is_fractal(&self) -> bool {
        matches!(self, TileLayout::Fractal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    fn is_permutation(layout: TileLayout, rows: usize, cols: usize) -> bool {
        let mut seen = alloc::vec![false; rows * cols];
        for row in 0..rows {
            for col in 0..cols {
                let offset = layout.offset(rows, cols, row, col);
                if offset >= seen.len() || seen[offset] {
                    return false;
                }
                seen[offset] = true;
            }
        }
        true
    }

    #[test]
    fn every_layout_is_a_bijection() {
        for layout in [
            TileLayout::RowMajor,
            TileLayout::ColMajor,
            TileLayout::Fractal(Fractal::nz::<f16>()),
            TileLayout::Fractal(Fractal::zz::<f16>()),
            TileLayout::Fractal(Fractal::zn::<f16>()),
            TileLayout::Fractal(Fractal::accumulator()),
        ] {
            assert!(is_permutation(layout, 32, 64), "{layout:?}");
        }
    }

    #[test]
    fn nz_keeps_block_rows_contiguous() {
        let layout = TileLayout::Fractal(Fractal::nz::<f16>());

        // 32 rows, so a block column holds two blocks of 256 elements.
        assert_eq!(layout.offset(32, 64, 0, 15), 15);
        assert_eq!(layout.offset(32, 64, 1, 0), 16);
        assert_eq!(layout.offset(32, 64, 16, 0), 256);
        assert_eq!(layout.offset(32, 64, 0, 16), 512);
    }

    #[test]
    fn zn_blocks_are_column_major() {
        let layout = TileLayout::Fractal(Fractal::zn::<f16>());

        assert_eq!(layout.offset(32, 32, 1, 0), 1);
        assert_eq!(layout.offset(32, 32, 0, 1), 16);
        assert_eq!(layout.offset(32, 32, 0, 16), 256);
    }

    #[test]
    fn block_width_depends_on_the_element() {
        assert_eq!(Fractal::nz::<f16>().block_cols, 16);
        assert_eq!(Fractal::nz::<f32>().block_cols, 8);
    }
}
