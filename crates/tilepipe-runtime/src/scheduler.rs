use alloc::vec::Vec;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{config::pipeline::SchedulePolicy, pipe::PipeKind};

/// Decides which runnable pipe executes next when a core drains its queues.
#[derive(Debug)]
pub(crate) enum Scheduler {
    /// One instruction per runnable pipe per round, in pipe order.
    RoundRobin,
    /// One instruction from a random runnable pipe per step.
    Shuffled(StdRng),
}

impl Scheduler {
    pub(crate) fn new(policy: SchedulePolicy) -> Self {
        match policy {
            SchedulePolicy::RoundRobin => Scheduler::RoundRobin,
            SchedulePolicy::Shuffled { seed } => Scheduler::Shuffled(StdRng::seed_from_u64(seed)),
        }
    }

    /// Whether a round executes a single instruction.
    pub(crate) fn single_step(&self) -> bool {
        matches!(self, Scheduler::Shuffled(_))
    }

    /// Pipes to try during the next round, in order.
    ///
    /// `pending` are the pipes with queued instructions. A pipe that turns out to be blocked is
    /// skipped by the caller, a round where none of them progressed is a deadlock.
    /// Under [Scheduler::single_step] the round ends after the first pipe that progressed.
    pub(crate) fn next_round(&mut self, pending: &[PipeKind]) -> Vec<PipeKind> {
        match self {
            Scheduler::RoundRobin => pending.to_vec(),
            Scheduler::Shuffled(rng) => {
                let mut order = pending.to_vec();
                order.shuffle(rng);
                order
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_keeps_pipe_order() {
        let mut scheduler = Scheduler::new(SchedulePolicy::RoundRobin);

        assert_eq!(
            scheduler.next_round(&[PipeKind::Load, PipeKind::Vector, PipeKind::Store]),
            [PipeKind::Load, PipeKind::Vector, PipeKind::Store]
        );
    }

    #[test]
    fn shuffled_is_a_permutation_and_replays() {
        let pending = PipeKind::ALL;
        let mut first = Scheduler::new(SchedulePolicy::Shuffled { seed: 3 });
        let mut second = Scheduler::new(SchedulePolicy::Shuffled { seed: 3 });

        for _ in 0..10 {
            let a = first.next_round(&pending);
            let b = second.next_round(&pending);
            let mut sorted = a.clone();
            sorted.sort();

            assert_eq!(a, b);
            assert_eq!(sorted, pending);
        }
    }
}
