use alloc::{collections::VecDeque, sync::Arc, vec::Vec};
use core::{
    fmt::Display,
    sync::atomic::{AtomicUsize, Ordering},
};
use hashbrown::{HashMap, HashSet};

use crate::{FenceError, pipe::PipeKind};

/// Hardware event number of a pipe pair.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct EventId(pub u8);

impl Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u8> for EventId {
    fn from(value: u8) -> Self {
        EventId(value)
    }
}

/// A binary flag between two pipes.
///
/// The source pipe sets it, the destination pipe waits until it is set then clears it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct FenceKey {
    /// Signaling pipe.
    pub src: PipeKind,
    /// Waiting pipe.
    pub dst: PipeKind,
    /// Event number.
    pub event: EventId,
}

impl Display for FenceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}->{}{}", self.src, self.dst, self.event)
    }
}

/// Dependency token returned when a fence is signaled.
///
/// Waiting on the token consumes it. A token dropped without a wait leaves its flag set and is
/// reported when the kernel finishes.
#[must_use = "a fence token must be waited on, dropping it leaves the fence signaled"]
#[derive(Debug)]
pub struct FenceToken {
    key: FenceKey,
    leaks: Arc<AtomicUsize>,
    armed: bool,
}

impl FenceToken {
    pub(crate) fn new(key: FenceKey, leaks: Arc<AtomicUsize>) -> Self {
        Self {
            key,
            leaks,
            armed: true,
        }
    }

    /// The fence the token stands for.
    pub fn key(&self) -> FenceKey {
        self.key
    }

    pub(crate) fn disarm(mut self) -> FenceKey {
        self.armed = false;
        self.key
    }
}

impl Drop for FenceToken {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("Fence token {} dropped without a wait", self.key);
            self.leaks.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Events of every pipe pair, handed out to tokens.
///
/// An event is released once its wait is issued, before that wait executes. Released events go
/// to the back of the free list so a recently waited event is reused last.
#[derive(Debug)]
pub(crate) struct EventPool {
    size: u8,
    free: HashMap<(PipeKind, PipeKind), VecDeque<EventId>>,
    held: HashSet<FenceKey>,
}

impl EventPool {
    pub(crate) fn new(size: u8) -> Self {
        Self {
            size,
            free: HashMap::new(),
            held: HashSet::new(),
        }
    }

    pub(crate) fn size(&self) -> u8 {
        self.size
    }

    pub(crate) fn acquire(&mut self, src: PipeKind, dst: PipeKind) -> Result<FenceKey, FenceError> {
        let size = self.size;
        let free = self
            .free
            .entry((src, dst))
            .or_insert_with(|| (0..size).map(EventId).collect());

        let event = free
            .pop_front()
            .ok_or(FenceError::PoolExhausted { src, dst, size })?;
        let key = FenceKey::new(src, dst, event);
        self.held.insert(key);

        Ok(key)
    }

    pub(crate) fn release(&mut self, key: FenceKey) {
        if self.held.remove(&key)
            && let Some(free) = self.free.get_mut(&(key.src, key.dst))
        {
            free.push_back(key.event);
        }
    }

    pub(crate) fn is_held(&self, key: &FenceKey) -> bool {
        self.held.contains(key)
    }

    pub(crate) fn check_event(&self, event: EventId) -> Result<(), FenceError> {
        if event.0 >= self.size {
            return Err(FenceError::EventOutOfRange {
                event,
                size: self.size,
            });
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.free.clear();
        self.held.clear();
    }
}

/// Flags currently set, and the token waits issued on them that haven't executed yet.
#[derive(Debug, Default)]
pub(crate) struct FlagTable {
    set: HashSet<FenceKey>,
    queued_waits: HashMap<FenceKey, usize>,
}

impl FlagTable {
    /// Set the flag, returning false when it was already set.
    pub(crate) fn signal(&mut self, key: FenceKey) -> bool {
        self.set.insert(key)
    }

    /// Record a token wait issued on the flag.
    pub(crate) fn queue_wait(&mut self, key: FenceKey) {
        *self.queued_waits.entry(key).or_default() += 1;
    }

    /// Whether a signal on the flag must hold until a queued wait consumes the current one.
    ///
    /// A pooled event can be handed out again while the wait of its previous token is still
    /// queued on the destination pipe.
    pub(crate) fn must_hold(&self, key: &FenceKey) -> bool {
        self.set.contains(key) && self.queued_waits.contains_key(key)
    }

    /// Clear the flag if set, returning whether the wait could proceed.
    pub(crate) fn try_wait(&mut self, key: &FenceKey) -> bool {
        if !self.set.remove(key) {
            return false;
        }
        if let Some(count) = self.queued_waits.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.queued_waits.remove(key);
            }
        }
        true
    }

    pub(crate) fn pending(&self) -> Vec<FenceKey> {
        let mut keys: Vec<_> = self.set.iter().copied().collect();
        keys.sort();
        keys
    }

    pub(crate) fn clear(&mut self) {
        self.set.clear();
        self.queued_waits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_hands_out_every_event_then_fails() {
        let mut pool = EventPool::new(2);

        let a = pool.acquire(PipeKind::Load, PipeKind::Vector).unwrap();
        let b = pool.acquire(PipeKind::Load, PipeKind::Vector).unwrap();

        assert_ne!(a, b);
        assert_eq!(
            pool.acquire(PipeKind::Load, PipeKind::Vector),
            Err(FenceError::PoolExhausted {
                src: PipeKind::Load,
                dst: PipeKind::Vector,
                size: 2
            })
        );
        assert!(pool.acquire(PipeKind::Vector, PipeKind::Load).is_ok());
    }

    #[test]
    fn released_events_are_reused_last() {
        let mut pool = EventPool::new(3);
        let first = pool.acquire(PipeKind::Load, PipeKind::Vector).unwrap();
        pool.release(first);

        let second = pool.acquire(PipeKind::Load, PipeKind::Vector).unwrap();
        let third = pool.acquire(PipeKind::Load, PipeKind::Vector).unwrap();
        let fourth = pool.acquire(PipeKind::Load, PipeKind::Vector).unwrap();

        assert_eq!(second.event, EventId(1));
        assert_eq!(third.event, EventId(2));
        assert_eq!(fourth.event, EventId(0));
    }

    #[test]
    fn dropped_token_counts_as_leak() {
        let leaks = Arc::new(AtomicUsize::new(0));
        let key = FenceKey::new(PipeKind::Load, PipeKind::Vector, EventId(0));

        drop(FenceToken::new(key, leaks.clone()));
        let _ = FenceToken::new(key, leaks.clone()).disarm();

        assert_eq!(leaks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn flags_are_binary() {
        let mut flags = FlagTable::default();
        let key = FenceKey::new(PipeKind::Vector, PipeKind::Store, EventId(3));

        assert!(flags.signal(key));
        assert!(!flags.signal(key));
        assert!(flags.try_wait(&key));
        assert!(!flags.try_wait(&key));
    }

    #[test]
    fn signal_holds_while_a_token_wait_is_queued() {
        let mut flags = FlagTable::default();
        let key = FenceKey::new(PipeKind::Load, PipeKind::Vector, EventId(0));

        flags.queue_wait(key);
        assert!(!flags.must_hold(&key));
        assert!(flags.signal(key));
        flags.queue_wait(key);
        assert!(flags.must_hold(&key));

        assert!(flags.try_wait(&key));
        assert!(!flags.must_hold(&key));
        assert!(flags.signal(key));
        assert!(flags.try_wait(&key));
        assert!(!flags.must_hold(&key));
    }
}
