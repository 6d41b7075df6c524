#![allow(dead_code)]

use tilepipe_core::{GlobalTensor, tests::test_device};
use tilepipe_runtime::{
    Device,
    config::{pipeline::SchedulePolicy, validation::ValidationLevel},
    memory::DeviceBuffer,
    target::{Target, TrainingTarget},
};

/// Training target with every check enabled and a shuffled pipe interleaving.
pub fn device(seed: u64) -> Device {
    test_device(
        TrainingTarget::properties(),
        ValidationLevel::Full,
        SchedulePolicy::Shuffled { seed },
    )
}

/// Same target and checks, with the deterministic round robin interleaving.
pub fn round_robin_device() -> Device {
    test_device(
        TrainingTarget::properties(),
        ValidationLevel::Full,
        SchedulePolicy::RoundRobin,
    )
}

pub fn matrix<E: tilepipe_common::Element>(
    buffer: &DeviceBuffer,
    rows: usize,
    cols: usize,
) -> GlobalTensor<E> {
    GlobalTensor::contiguous(buffer, &[rows, cols]).unwrap()
}
