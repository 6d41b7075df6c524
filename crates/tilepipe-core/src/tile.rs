use core::{marker::PhantomData, ops::Range};

use tilepipe_common::Element;
use tilepipe_runtime::{KernelContext, tier::{MemoryTier, TierKind}};

use crate::{PadValue, TileError, TileLayout};

/// A typed view over a region of a memory tier.
///
/// The tile owns no memory. It becomes usable once it is given an offset in its tier, either
/// through a [TilePlacement] or with [Tile::assign]. Only its valid region holds data; the rest
/// of the declared shape reads as the padding value once filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile<E: Element> {
    tier: TierKind,
    rows: usize,
    cols: usize,
    valid_rows: usize,
    valid_cols: usize,
    layout: TileLayout,
    pad: PadValue,
    offset: Option<usize>,
    _elem: PhantomData<E>,
}

/// Builder of a [Tile].
#[derive(Clone, Copy, Debug)]
pub struct TileBuilder<E: Element> {
    tier: TierKind,
    rows: usize,
    cols: usize,
    valid: Option<(usize, usize)>,
    layout: TileLayout,
    pad: PadValue,
    _elem: PhantomData<E>,
}

impl<E: Element> TileBuilder<E> {
    /// Valid shape, the declared shape when not set.
    pub fn valid(mut self, rows: usize, cols: usize) -> Self {
        self.valid = Some((rows, cols));
        self
    }

    /// Layout, row-major when not set.
    pub fn layout(mut self, layout: TileLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Padding value, zero when not set.
    pub fn pad(mut self, pad: PadValue) -> Self {
        self.pad = pad;
        self
    }

    /// Build an unassigned tile.
    pub fn build(self) -> Result<Tile<E>, TileError> {
        if let TileLayout::Fractal(fractal) = self.layout
            && (self.rows % fractal.block_rows != 0 || self.cols % fractal.block_cols != 0)
        {
            return Err(TileError::BlockMismatch {
                rows: self.rows,
                cols: self.cols,
                block_rows: fractal.block_rows,
                block_cols: fractal.block_cols,
            });
        }

        let mut tile = Tile {
            tier: self.tier,
            rows: self.rows,
            cols: self.cols,
            valid_rows: self.rows,
            valid_cols: self.cols,
            layout: self.layout,
            pad: self.pad,
            offset: None,
            _elem: PhantomData,
        };
        if let Some((rows, cols)) = self.valid {
            tile.set_valid(rows, cols)?;
        }

        Ok(tile)
    }

    /// Build the tile and reserve its storage.
    pub fn alloc<P: TilePlacement>(self, placement: &mut P) -> Result<Tile<E>, TileError> {
        let mut tile = self.build()?;
        placement.alloc(&mut tile)?;
        Ok(tile)
    }
}

impl<E: Element> Tile<E> {
    /// Start describing a tile of `rows x cols` declared elements in `tier`.
    pub fn builder(tier: TierKind, rows: usize, cols: usize) -> TileBuilder<E> {
        TileBuilder {
            tier,
            rows,
            cols,
            valid: None,
            layout: TileLayout::default(),
            pad: PadValue::default(),
            _elem: PhantomData,
        }
    }

    /// Tier holding the tile.
    pub fn tier(&self) -> TierKind {
        self.tier
    }

    /// Declared rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Declared columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Declared `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Rows holding data.
    pub fn valid_rows(&self) -> usize {
        self.valid_rows
    }

    /// Columns holding data.
    pub fn valid_cols(&self) -> usize {
        self.valid_cols
    }

    /// Valid `(rows, cols)`.
    pub fn valid_shape(&self) -> (usize, usize) {
        (self.valid_rows, self.valid_cols)
    }

    /// Layout in the tier.
    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    /// Padding value.
    pub fn pad(&self) -> PadValue {
        self.pad
    }

    /// Byte offset in the tier, if assigned.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Bytes covered by the declared shape.
    pub fn size_bytes(&self) -> usize {
        self.rows * self.cols * size_of::<E>()
    }

    /// Change the valid shape, used for edge tiles.
    pub fn set_valid(&mut self, rows: usize, cols: usize) -> Result<(), TileError> {
        if rows > self.rows || cols > self.cols {
            return Err(TileError::InvalidShape {
                rows: self.rows,
                cols: self.cols,
                valid_rows: rows,
                valid_cols: cols,
            });
        }

        self.valid_rows = rows;
        self.valid_cols = cols;
        Ok(())
    }

    /// Copy of the tile with another valid shape.
    pub fn with_valid(mut self, rows: usize, cols: usize) -> Result<Self, TileError> {
        self.set_valid(rows, cols)?;
        Ok(self)
    }

    /// Set the byte offset in the tier without any check.
    pub fn assign(&mut self, offset: usize) {
        self.offset = Some(offset);
    }

    /// Reinterpret a row-major tile as `rows x cols` over the same bytes.
    ///
    /// The reshaped tile is entirely valid.
    pub fn reshape(&self, rows: usize, cols: usize) -> Result<Self, TileError> {
        if self.layout != TileLayout::RowMajor {
            return Err(TileError::LayoutMismatch {
                op: "reshape",
                expected: "row-major",
                actual: self.layout,
            });
        }
        if rows * cols != self.rows * self.cols {
            return Err(TileError::ShapeMismatch {
                op: "reshape",
                expected: self.shape(),
                actual: (rows, cols),
            });
        }

        Ok(Self {
            rows,
            cols,
            valid_rows: rows,
            valid_cols: cols,
            ..*self
        })
    }

    /// The tile with its resolved offset, failing when unassigned.
    pub fn placed(&self) -> Result<Placed<E>, TileError> {
        match self.offset {
            Some(base) => Ok(Placed { tile: *self, base }),
            None => Err(TileError::Unassigned { tier: self.tier }),
        }
    }
}

/// A tile with a known offset, addressed by operation bodies.
#[derive(Clone, Copy, Debug)]
pub struct Placed<E: Element> {
    tile: Tile<E>,
    base: usize,
}

impl<E: Element> Placed<E> {
    /// The tile.
    pub fn tile(&self) -> &Tile<E> {
        &self.tile
    }

    /// Byte offset of `(row, col)` in the tier.
    pub fn byte_offset(&self, row: usize, col: usize) -> usize {
        let index = self
            .tile
            .layout
            .offset(self.tile.rows, self.tile.cols, row, col);
        self.base + index * size_of::<E>()
    }

    /// Bytes of the tier covered by the tile.
    pub fn range(&self) -> Range<usize> {
        self.base..self.base + self.tile.size_bytes()
    }

    /// Read the element at `(row, col)`.
    pub fn read(&self, tier: &MemoryTier, row: usize, col: usize) -> E {
        tier.read(self.byte_offset(row, col))
    }

    /// Write the element at `(row, col)`.
    pub fn write(&self, tier: &mut MemoryTier, row: usize, col: usize, value: E) {
        tier.write(self.byte_offset(row, col), value)
    }

    /// Valid region as `f64`, row-major.
    pub fn read_valid(&self, tier: &MemoryTier) -> alloc::vec::Vec<f64> {
        let (rows, cols) = self.tile.valid_shape();
        let mut values = alloc::vec::Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                values.push(self.read(tier, row, col).to_f64());
            }
        }
        values
    }

    /// Write row-major values to the valid region, converting from `f64`.
    pub fn write_valid(&self, tier: &mut MemoryTier, values: &[f64]) {
        let cols = self.tile.valid_cols;
        for (i, value) in values.iter().enumerate() {
            self.write(tier, i / cols, i % cols, E::from_f64(*value));
        }
    }

    /// Write the padding value to every declared element outside of the valid region.
    pub fn fill_pad(&self, tier: &mut MemoryTier) {
        let value = self.tile.pad.value::<E>();
        let (valid_rows, valid_cols) = self.tile.valid_shape();

        for row in 0..self.tile.rows {
            let start = if row < valid_rows { valid_cols } else { 0 };
            for col in start..self.tile.cols {
                self.write(tier, row, col, value);
            }
        }
    }
}

/// Places tiles in the tiers of a core.
pub trait TilePlacement {
    /// Reserve a fresh region for the tile.
    fn alloc<E: Element>(&mut self, tile: &mut Tile<E>) -> Result<(), TileError>;

    /// Place the tile at a fixed offset.
    fn place<E: Element>(&mut self, tile: &mut Tile<E>, offset: usize) -> Result<(), TileError>;
}

impl TilePlacement for KernelContext<'_> {
    fn alloc<E: Element>(&mut self, tile: &mut Tile<E>) -> Result<(), TileError> {
        let reservation = self.reserve(tile.tier, tile.size_bytes())?;
        tile.assign(reservation.offset);
        Ok(())
    }

    fn place<E: Element>(&mut self, tile: &mut Tile<E>, offset: usize) -> Result<(), TileError> {
        let reservation = self.reserve_at(tile.tier, offset, tile.size_bytes())?;
        tile.assign(reservation.offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fractal;
    use half::f16;
    use tilepipe_runtime::tier::TierProperties;

    #[test]
    fn valid_shape_defaults_to_declared() {
        let tile = Tile::<f32>::builder(TierKind::Vector, 8, 16).build().unwrap();

        assert_eq!(tile.valid_shape(), (8, 16));
        assert_eq!(tile.size_bytes(), 8 * 16 * 4);
        assert_eq!(tile.offset(), None);
    }

    #[test]
    fn valid_shape_never_exceeds_declared() {
        let result = Tile::<f32>::builder(TierKind::Vector, 8, 16).valid(9, 16).build();
        assert_eq!(
            result,
            Err(TileError::InvalidShape {
                rows: 8,
                cols: 16,
                valid_rows: 9,
                valid_cols: 16
            })
        );

        let mut tile = Tile::<f32>::builder(TierKind::Vector, 8, 16).build().unwrap();
        assert!(tile.set_valid(8, 17).is_err());
        assert_eq!(tile.valid_shape(), (8, 16));
    }

    #[test]
    fn fractal_tiles_hold_whole_blocks() {
        let result = Tile::<f16>::builder(TierKind::Staging, 32, 24)
            .layout(TileLayout::Fractal(Fractal::nz::<f16>()))
            .build();

        assert_eq!(
            result,
            Err(TileError::BlockMismatch {
                rows: 32,
                cols: 24,
                block_rows: 16,
                block_cols: 16
            })
        );
    }

    #[test]
    fn unassigned_tiles_cannot_be_addressed() {
        let tile = Tile::<f32>::builder(TierKind::Vector, 8, 8).build().unwrap();

        assert_eq!(
            tile.placed().unwrap_err(),
            TileError::Unassigned {
                tier: TierKind::Vector
            }
        );
    }

    #[test]
    fn reshape_keeps_the_bytes() {
        let mut tile = Tile::<f32>::builder(TierKind::Vector, 4, 16).build().unwrap();
        tile.assign(64);

        let reshaped = tile.reshape(8, 8).unwrap();
        assert_eq!(reshaped.offset(), Some(64));
        assert_eq!(reshaped.size_bytes(), tile.size_bytes());
        assert!(tile.reshape(8, 9).is_err());
    }

    #[test]
    fn fill_pad_only_touches_the_invalid_region() {
        let mut tier = MemoryTier::new(TierProperties::new(TierKind::Vector, 1024, 32));
        let mut tile = Tile::<f32>::builder(TierKind::Vector, 4, 4)
            .valid(2, 3)
            .pad(PadValue::Min)
            .build()
            .unwrap();
        tile.assign(0);
        let placed = tile.placed().unwrap();

        for row in 0..2 {
            for col in 0..3 {
                placed.write(&mut tier, row, col, 1.0);
            }
        }
        placed.fill_pad(&mut tier);

        assert_eq!(placed.read_valid(&tier), alloc::vec![1.0; 6]);
        assert_eq!(placed.read(&tier, 1, 3), f32::NEG_INFINITY);
        assert_eq!(placed.read(&tier, 3, 0), f32::NEG_INFINITY);
    }
}
