use core::ops::Range;

use crate::pipeline::ScheduleError;

/// Split of an extent into tiles of a fixed size, the last one possibly shorter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TilePartition {
    extent: usize,
    tile: usize,
}

impl TilePartition {
    /// Partition `extent` elements into tiles of `tile` elements.
    pub fn new(extent: usize, tile: usize) -> Result<Self, ScheduleError> {
        if tile == 0 {
            return Err(ScheduleError::EmptyTile { extent });
        }
        Ok(Self { extent, tile })
    }

    /// Number of elements partitioned.
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// Elements of a full tile.
    pub fn tile_size(&self) -> usize {
        self.tile
    }

    /// Number of tiles, counting the edge tile.
    pub fn count(&self) -> usize {
        self.extent.div_ceil(self.tile)
    }

    /// First element and valid extent of a tile.
    ///
    /// Past the last tile the valid extent is zero.
    pub fn tile(&self, index: usize) -> (usize, usize) {
        let start = index * self.tile;
        (start, self.tile.min(self.extent.saturating_sub(start)))
    }

    /// Whether the last tile is shorter than the others.
    pub fn has_edge(&self) -> bool {
        self.extent % self.tile != 0
    }

    /// Every tile in order.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.count()).map(|index| self.tile(index))
    }
}

/// Contiguous share of the work items of a launch given to one block.
///
/// Shares differ by at most one item, the first blocks taking the extra ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoreRange {
    items: Range<usize>,
}

impl CoreRange {
    /// Share of `block_idx` among `block_num` blocks.
    pub fn of(total: usize, block_idx: usize, block_num: usize) -> Self {
        let block_num = block_num.max(1);
        let base = total / block_num;
        let extra = total % block_num;

        let start = block_idx * base + block_idx.min(extra);
        let len = base + usize::from(block_idx < extra);
        let start = start.min(total);

        Self {
            items: start..(start + len).min(total),
        }
    }

    /// First item of the share.
    pub fn start(&self) -> usize {
        self.items.start
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the block has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items of the share, in order.
    pub fn iter(&self) -> Range<usize> {
        self.items.clone()
    }
}
