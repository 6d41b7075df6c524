use alloc::{vec, vec::Vec};

use tilepipe_runtime::{KernelContext, fence::FenceToken};

use crate::{
    KernelError,
    pipeline::{ScheduleError, SlotRoles, SlotState},
};

/// A buffer slot and the fences pending on it.
#[derive(Debug)]
struct Slot<B> {
    buffers: B,
    state: SlotState,
    /// Producer finished, the consumer waits on it.
    ready: Option<FenceToken>,
    /// Consumer finished, the store pipe waits on it.
    computed: Option<FenceToken>,
    /// Last reader finished, the next load waits on it.
    free: Option<FenceToken>,
}

/// Slots cycling between a producer, a consumer and an optional store pipe.
///
/// With two slots (ping-pong) the producer fills one slot while the consumer reads the other.
/// Every transition issues the fences it needs: a load waits until the last reader of its slot
/// is done, a consume waits for the load of its slot, a store waits for the consume. The pipes
/// themselves never block the issuing code, so a slot can be refilled as soon as the fences
/// allow it.
#[derive(Debug)]
pub struct BufferRing<B> {
    roles: SlotRoles,
    slots: Vec<Slot<B>>,
}

impl<B> BufferRing<B> {
    /// Create a ring with one slot per buffer set.
    pub fn new(roles: SlotRoles, buffers: Vec<B>) -> Result<Self, ScheduleError> {
        if buffers.is_empty() {
            return Err(ScheduleError::EmptyRing);
        }
        Ok(Self::from_buffers(roles, buffers))
    }

    /// Create a two slot ring.
    pub fn ping_pong(roles: SlotRoles, ping: B, pong: B) -> Self {
        Self::from_buffers(roles, vec![ping, pong])
    }

    fn from_buffers(roles: SlotRoles, buffers: Vec<B>) -> Self {
        let slots = buffers
            .into_iter()
            .map(|buffers| Slot {
                buffers,
                state: SlotState::Idle,
                ready: None,
                computed: None,
                free: None,
            })
            .collect();

        Self { roles, slots }
    }

    /// Pipes of the ring.
    pub fn roles(&self) -> SlotRoles {
        self.roles
    }

    /// Number of slots.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Slot used by the given iteration.
    pub fn slot_for(&self, iteration: usize) -> usize {
        iteration % self.slots.len()
    }

    /// Current state of a slot.
    pub fn state(&self, slot: usize) -> Result<SlotState, ScheduleError> {
        Ok(self.slot(slot)?.state)
    }

    /// Buffers of a slot.
    pub fn buffers(&self, slot: usize) -> Result<&B, ScheduleError> {
        Ok(&self.slot(slot)?.buffers)
    }

    /// `Idle -> Loading`: order the load after the last reader of the slot.
    ///
    /// Returns the buffers so their valid shapes can be set before the load is issued.
    pub fn begin_load(
        &mut self,
        ctx: &mut KernelContext<'_>,
        slot: usize,
    ) -> Result<&mut B, KernelError> {
        let entry = self.transition(slot, SlotState::Loading)?;
        if let Some(token) = entry.free.take() {
            ctx.wait(token);
        }
        Ok(&mut entry.buffers)
    }

    /// `Loading -> Ready`: signal the consumer once everything issued on the producer is done.
    pub fn end_load(&mut self, ctx: &mut KernelContext<'_>, slot: usize) -> Result<(), KernelError> {
        let SlotRoles {
            producer, consumer, ..
        } = self.roles;
        let entry = self.transition(slot, SlotState::Ready)?;
        entry.ready = Some(ctx.signal(producer, consumer)?);
        Ok(())
    }

    /// `Ready -> Consuming`: make the consumer wait for the load of the slot.
    pub fn begin_consume(
        &mut self,
        ctx: &mut KernelContext<'_>,
        slot: usize,
    ) -> Result<&B, KernelError> {
        let entry = self.transition(slot, SlotState::Consuming)?;
        if let Some(token) = entry.ready.take() {
            ctx.wait(token);
        }
        Ok(&entry.buffers)
    }

    /// `Consuming -> Storing` when the ring has a store pipe, `Consuming -> Idle` otherwise.
    pub fn end_consume(
        &mut self,
        ctx: &mut KernelContext<'_>,
        slot: usize,
    ) -> Result<(), KernelError> {
        let SlotRoles {
            producer,
            consumer,
            store,
        } = self.roles;

        match store {
            Some(store) => {
                let entry = self.transition(slot, SlotState::Storing)?;
                entry.computed = Some(ctx.signal(consumer, store)?);
            }
            None => {
                let entry = self.transition(slot, SlotState::Idle)?;
                entry.free = Some(ctx.signal(consumer, producer)?);
            }
        }
        Ok(())
    }

    /// Make the store pipe wait for the consume of the slot.
    ///
    /// The slot stays `Storing` until [end_store](Self::end_store).
    pub fn begin_store(
        &mut self,
        ctx: &mut KernelContext<'_>,
        slot: usize,
    ) -> Result<&B, KernelError> {
        let entry = self.slot_mut(slot)?;
        match (entry.state, entry.computed.take()) {
            (SlotState::Storing, Some(token)) => {
                ctx.wait(token);
                Ok(&entry.buffers)
            }
            (from, _) => Err(ScheduleError::InvalidTransition {
                slot,
                from,
                to: SlotState::Storing,
            }
            .into()),
        }
    }

    /// `Storing -> Idle`: the next load of the slot waits for the store.
    pub fn end_store(&mut self, ctx: &mut KernelContext<'_>, slot: usize) -> Result<(), KernelError> {
        let SlotRoles {
            producer, store, ..
        } = self.roles;
        let entry = self.slot_mut(slot)?;
        if entry.state != SlotState::Storing {
            return Err(ScheduleError::InvalidTransition {
                slot,
                from: entry.state,
                to: SlotState::Idle,
            }
            .into());
        }
        if entry.computed.is_some() {
            return Err(ScheduleError::PendingFence {
                slot,
                state: SlotState::Storing,
            }
            .into());
        }

        let entry = self.transition(slot, SlotState::Idle)?;
        if let Some(store) = store {
            entry.free = Some(ctx.signal(store, producer)?);
        }
        Ok(())
    }

    /// Wait on every fence still pending, leaving all slots idle with nothing in flight.
    ///
    /// A kernel calls it after its last iteration. Slots that aren't idle are an error.
    pub fn drain(&mut self, ctx: &mut KernelContext<'_>) -> Result<(), KernelError> {
        let mut drained = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.state != SlotState::Idle {
                return Err(ScheduleError::InvalidTransition {
                    slot: index,
                    from: slot.state,
                    to: SlotState::Idle,
                }
                .into());
            }
            if let Some(token) = slot.free.take() {
                ctx.wait(token);
                drained += 1;
            }
        }

        log::trace!(
            "Drained {drained} fence(s) from {} to {}",
            self.roles.store.unwrap_or(self.roles.consumer),
            self.roles.producer
        );
        Ok(())
    }

    fn slot(&self, slot: usize) -> Result<&Slot<B>, ScheduleError> {
        let len = self.slots.len();
        self.slots
            .get(slot)
            .ok_or(ScheduleError::UnknownSlot { slot, len })
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Slot<B>, ScheduleError> {
        let len = self.slots.len();
        self.slots
            .get_mut(slot)
            .ok_or(ScheduleError::UnknownSlot { slot, len })
    }

    fn transition(&mut self, slot: usize, to: SlotState) -> Result<&mut Slot<B>, ScheduleError> {
        let entry = self.slot_mut(slot)?;
        if !entry.state.can_transition(to) {
            return Err(ScheduleError::InvalidTransition {
                slot,
                from: entry.state,
                to,
            });
        }

        entry.state = to;
        Ok(entry)
    }
}
