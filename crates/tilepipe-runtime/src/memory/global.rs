use alloc::vec::Vec;
use hashbrown::HashMap;
use tilepipe_common::Element;

use crate::{MemoryError, storage_id_type};

storage_id_type!(BufferId);

/// Handle to a buffer in device global memory.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceBuffer {
    id: BufferId,
    size: usize,
}

impl DeviceBuffer {
    /// Identifier of the buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of elements of type `E` the buffer holds.
    pub fn len<E: Element>(&self) -> usize {
        self.size / size_of::<E>()
    }
}

/// Device global memory, shared by every core.
#[derive(Debug, Default)]
pub struct GlobalMemory {
    buffers: HashMap<BufferId, Vec<u8>>,
}

impl GlobalMemory {
    /// Take ownership of the bytes as a new buffer.
    pub fn alloc(&mut self, bytes: Vec<u8>) -> DeviceBuffer {
        let id = BufferId::new();
        let size = bytes.len();
        self.buffers.insert(id, bytes);

        DeviceBuffer { id, size }
    }

    /// Free a buffer. Handles to it become dangling.
    pub fn release(&mut self, buffer: &DeviceBuffer) -> Result<(), MemoryError> {
        self.buffers
            .remove(&buffer.id)
            .map(|_| ())
            .ok_or(MemoryError::UnknownBuffer { id: buffer.id })
    }

    /// Bytes of a buffer.
    pub fn get(&self, id: BufferId) -> Result<&[u8], MemoryError> {
        self.buffers
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(MemoryError::UnknownBuffer { id })
    }

    /// Mutable bytes of a buffer.
    pub fn get_mut(&mut self, id: BufferId) -> Result<&mut [u8], MemoryError> {
        self.buffers
            .get_mut(&id)
            .map(Vec::as_mut_slice)
            .ok_or(MemoryError::UnknownBuffer { id })
    }

    /// Decode a whole buffer.
    pub fn read<E: Element>(&self, id: BufferId) -> Result<Vec<E>, MemoryError> {
        self.get(id).map(E::from_bytes)
    }

    /// Number of live buffers.
    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }
}

/// Read the element at `index` of a byte slice holding elements of type `E`.
///
/// # Panics
/// Panics when the index is out of bounds. Global tensors are checked against their buffer
/// when they are bound.
#[inline]
pub fn read_elem<E: Element>(bytes: &[u8], index: usize) -> E {
    let size = size_of::<E>();
    bytemuck::pod_read_unaligned(&bytes[index * size..(index + 1) * size])
}

/// Write the element at `index` of a byte slice holding elements of type `E`.
///
/// # Panics
/// Panics when the index is out of bounds.
#[inline]
pub fn write_elem<E: Element>(bytes: &mut [u8], index: usize, value: E) {
    let size = size_of::<E>();
    bytes[index * size..(index + 1) * size].copy_from_slice(bytemuck::bytes_of(&value));
}
