use alloc::vec::Vec;

use crate::{MemoryError, tier::TierProperties};

/// A byte region reserved in a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct Reservation {
    /// Byte offset of the region.
    pub offset: usize,
    /// Size of the region in bytes.
    pub size: usize,
}

impl Reservation {
    /// One past the last byte of the region.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Whether the two regions share at least one byte.
    pub fn overlaps(&self, other: &Reservation) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Placement bookkeeping of a tier.
///
/// Automatic reservations are bump allocated after every existing reservation, so they never
/// overlap. Manual reservations go where the caller says.
#[derive(Debug)]
pub struct TierArena {
    properties: TierProperties,
    cursor: usize,
    reservations: Vec<Reservation>,
}

impl TierArena {
    /// Create an empty arena.
    pub fn new(properties: TierProperties) -> Self {
        Self {
            properties,
            cursor: 0,
            reservations: Vec::new(),
        }
    }

    /// Reserve an aligned region of `size` bytes after every existing reservation.
    pub fn reserve(&mut self, size: usize) -> Result<Reservation, MemoryError> {
        let offset = self.cursor + calculate_padding(self.cursor, self.properties.alignment);
        let reservation = Reservation::new(offset, size);
        self.check_capacity(&reservation)?;

        self.push(reservation);
        Ok(reservation)
    }

    /// Reserve `size` bytes at a fixed offset.
    ///
    /// Fails when the offset isn't aligned or the region doesn't fit in the tier. When
    /// `check_overlap` is set, it also fails when the region overlaps a live reservation.
    pub fn reserve_at(
        &mut self,
        offset: usize,
        size: usize,
        check_overlap: bool,
    ) -> Result<Reservation, MemoryError> {
        if offset % self.properties.alignment != 0 {
            return Err(MemoryError::Misaligned {
                tier: self.properties.kind,
                offset,
                alignment: self.properties.alignment,
            });
        }

        let reservation = Reservation::new(offset, size);
        self.check_capacity(&reservation)?;

        if check_overlap
            && let Some(other) = self.reservations.iter().find(|r| r.overlaps(&reservation))
        {
            return Err(MemoryError::Overlap {
                tier: self.properties.kind,
                offset,
                size,
                other_offset: other.offset,
                other_size: other.size,
            });
        }

        self.push(reservation);
        Ok(reservation)
    }

    /// Release every reservation.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.reservations.clear();
    }

    /// Live reservations, in placement order.
    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Bytes up to the end of the last reservation.
    pub fn used(&self) -> usize {
        self.cursor
    }

    fn check_capacity(&self, reservation: &Reservation) -> Result<(), MemoryError> {
        if reservation.end() > self.properties.capacity {
            return Err(MemoryError::CapacityExceeded {
                tier: self.properties.kind,
                offset: reservation.offset,
                size: reservation.size,
                capacity: self.properties.capacity,
            });
        }
        Ok(())
    }

    fn push(&mut self, reservation: Reservation) {
        self.cursor = usize::max(self.cursor, reservation.end());
        self.reservations.push(reservation);
    }
}

/// Number of bytes to add to `offset` to reach the next multiple of `alignment`.
pub fn calculate_padding(offset: usize, alignment: usize) -> usize {
    let remainder = offset % alignment;
    if remainder != 0 {
        alignment - remainder
    } else {
        0
    }
}
