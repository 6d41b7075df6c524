mod dummy;

use dummy::*;
use pretty_assertions::assert_eq;
use serial_test::serial;
use tilepipe_runtime::{
    ExecutionError, FenceError, HazardError, MemoryError,
    config::{GlobalConfig, pipeline::SchedulePolicy, validation::ValidationLevel},
    fence::{EventId, FenceKey},
    pipe::{PipeKind, PipeOp, Resource},
    tier::TierKind,
};

const LEN: usize = 64;
const X: usize = 0;
const Y: usize = 256;
const Z: usize = 512;

#[test_log::test]
fn created_resource_is_the_same_when_read() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);
    let resource = vec![0.5f32, 1.0, 2.0];
    let buffer = device.create_from_slice(&resource);

    assert_eq!(device.read::<f32>(&buffer).unwrap(), resource);
}

#[test_log::test]
fn empty_allocates_zeroed_memory() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);
    let buffer = device.empty::<i32>(4);

    assert_eq!(device.read::<i32>(&buffer).unwrap(), vec![0; 4]);
}

fn run_addition(
    device: &mut tilepipe_runtime::Device,
    fenced: bool,
) -> Result<Vec<f32>, ExecutionError> {
    let lhs: Vec<f32> = (0..LEN).map(|i| i as f32).collect();
    let rhs: Vec<f32> = (0..LEN).map(|i| 2.0 * i as f32).collect();
    let lhs = device.create_from_slice(&lhs);
    let rhs = device.create_from_slice(&rhs);
    let out = device.empty::<f32>(LEN);

    device.launch(1, |ctx| {
        ctx.issue(PipeKind::Load, load_op(&lhs, X, LEN))?;
        ctx.issue(PipeKind::Load, load_op(&rhs, Y, LEN))?;
        if fenced {
            let loaded = ctx.signal(PipeKind::Load, PipeKind::Vector)?;
            ctx.wait(loaded);
        }
        ctx.issue(PipeKind::Vector, add_op(X, Y, Z, LEN))?;
        if fenced {
            let computed = ctx.signal(PipeKind::Vector, PipeKind::Store)?;
            ctx.wait(computed);
        }
        ctx.issue(PipeKind::Store, store_op(&out, Z, LEN))?;
        Ok::<_, ExecutionError>(())
    })?;

    Ok(device.read::<f32>(&out)?)
}

#[test_log::test]
fn execute_fenced_elementwise_addition() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);

    let result = run_addition(&mut device, true).unwrap();

    let expected: Vec<f32> = (0..LEN).map(|i| 3.0 * i as f32).collect();
    assert_eq!(result, expected);
    assert_eq!(device.stats().get(PipeKind::Load).ops, 2);
    assert_eq!(device.stats().get(PipeKind::Vector).waits, 1);
    assert_eq!(device.stats().get(PipeKind::Store).waits, 1);
}

#[test_log::test]
fn fenced_addition_is_schedule_independent() {
    let expected: Vec<f32> = (0..LEN).map(|i| 3.0 * i as f32).collect();

    for seed in 0..8 {
        let mut device = test_device(ValidationLevel::Full, SchedulePolicy::Shuffled { seed });

        assert_eq!(run_addition(&mut device, true).unwrap(), expected);
    }
}

#[test_log::test]
fn missing_fence_is_a_race() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);

    let result = run_addition(&mut device, false);

    match result {
        Err(ExecutionError::Hazard(HazardError::Race { first, second, .. })) => {
            assert_eq!(first.pipe, PipeKind::Load);
            assert_eq!(second.pipe, PipeKind::Vector);
        }
        other => panic!("Expected a race, got {other:?}"),
    }
}

#[test_log::test]
fn missing_fence_is_silent_without_validation() {
    let mut device = test_device(ValidationLevel::Disabled, SchedulePolicy::RoundRobin);

    assert!(run_addition(&mut device, false).is_ok());
}

#[test_log::test]
fn wait_without_signal_deadlocks() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);

    let result = device.launch(1, |ctx| {
        ctx.wait_flag(PipeKind::Load, PipeKind::Vector, EventId(2))?;
        Ok::<_, ExecutionError>(())
    });

    match result {
        Err(ExecutionError::Deadlock { blocked, .. }) => assert_eq!(
            blocked,
            vec![FenceKey::new(PipeKind::Load, PipeKind::Vector, EventId(2))]
        ),
        other => panic!("Expected a deadlock, got {other:?}"),
    }
}

#[test_log::test]
fn signal_without_wait_is_unmatched() {
    let mut device = test_device(ValidationLevel::Fences, SchedulePolicy::RoundRobin);

    let result = device.launch(1, |ctx| {
        ctx.set_flag(PipeKind::Vector, PipeKind::Store, EventId(0))?;
        Ok::<_, ExecutionError>(())
    });

    assert!(matches!(
        result,
        Err(ExecutionError::Fence(FenceError::Unmatched { keys })) if keys.len() == 1
    ));
}

#[test_log::test]
fn dropped_token_is_reported() {
    let mut device = test_device(ValidationLevel::Fences, SchedulePolicy::RoundRobin);

    let result = device.launch(1, |ctx| {
        let _ = ctx.signal(PipeKind::Load, PipeKind::Vector)?;
        Ok::<_, ExecutionError>(())
    });

    assert!(matches!(
        result,
        Err(ExecutionError::Fence(FenceError::TokenLeaked { count: 1 }))
    ));
}

#[test_log::test]
fn double_signal_is_reported() {
    let mut device = test_device(ValidationLevel::Fences, SchedulePolicy::RoundRobin);

    let result = device.launch(1, |ctx| {
        ctx.set_flag(PipeKind::Load, PipeKind::Vector, EventId(1))?;
        ctx.set_flag(PipeKind::Load, PipeKind::Vector, EventId(1))?;
        Ok::<_, ExecutionError>(())
    });

    assert!(matches!(
        result,
        Err(ExecutionError::Fence(FenceError::AlreadySignaled { .. }))
    ));
}

#[test_log::test]
fn token_pool_is_bounded() {
    let mut device = test_device(ValidationLevel::Fences, SchedulePolicy::RoundRobin);
    let events = device.properties().events_per_pair as usize;

    let result = device.launch(1, |ctx| {
        let mut tokens = Vec::new();
        for _ in 0..=events {
            match ctx.signal(PipeKind::Load, PipeKind::Vector) {
                Ok(token) => tokens.push(token),
                Err(err) => {
                    tokens.into_iter().for_each(|token| ctx.wait(token));
                    return Err(err.into());
                }
            }
        }
        tokens.into_iter().for_each(|token| ctx.wait(token));
        Ok::<_, ExecutionError>(())
    });

    assert!(matches!(
        result,
        Err(ExecutionError::Fence(FenceError::PoolExhausted { size: 8, .. }))
    ));
}

#[test_log::test]
fn reused_events_wait_for_their_previous_consumer() {
    for level in [ValidationLevel::Disabled, ValidationLevel::Full] {
        for seed in 0..20 {
            let mut device = test_device(level, SchedulePolicy::Shuffled { seed });

            device
                .launch(1, |ctx| {
                    for _ in 0..12 {
                        let token = ctx.signal(PipeKind::Load, PipeKind::Vector)?;
                        ctx.wait(token);
                    }
                    Ok::<_, ExecutionError>(())
                })
                .unwrap_or_else(|err| panic!("{level:?}, seed {seed}: {err}"));

            assert_eq!(device.stats().get(PipeKind::Load).signals, 12);
            assert_eq!(device.stats().get(PipeKind::Vector).waits, 12);
        }
    }
}

#[test_log::test]
fn pipes_respect_tier_affinity() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);

    let result = device.launch(1, |ctx| {
        let op = PipeOp::new("write_left", |_| Ok(())).writes(Resource::Tier(TierKind::Left), 0..32);
        ctx.issue(PipeKind::Load, op)?;
        Ok::<_, ExecutionError>(())
    });

    assert!(matches!(
        result,
        Err(ExecutionError::Memory(MemoryError::Affinity {
            tier: TierKind::Left,
            pipe: PipeKind::Load,
            ..
        }))
    ));
}

#[test_log::test]
fn manual_placements_are_checked_for_overlap() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);

    let result = device.launch(1, |ctx| {
        ctx.reserve_at(TierKind::Vector, 0, 1024)?;
        ctx.reserve_at(TierKind::Vector, 512, 1024)?;
        Ok::<_, ExecutionError>(())
    });

    assert!(matches!(
        result,
        Err(ExecutionError::Memory(MemoryError::Overlap { .. }))
    ));
}

#[test_log::test]
fn blocks_are_spread_over_cores() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);
    let num_cores = device.properties().num_cores;
    let mut seen = Vec::new();

    device
        .launch(num_cores + 2, |ctx| {
            seen.push((ctx.block_idx(), ctx.core_idx(), ctx.block_num()));
            Ok::<_, ExecutionError>(())
        })
        .unwrap();

    assert_eq!(seen.len(), num_cores + 2);
    assert_eq!(seen[num_cores + 1], (num_cores + 1, 1, num_cores + 2));
}

#[test_log::test]
fn placements_reset_between_blocks() {
    let mut device = test_device(ValidationLevel::Full, SchedulePolicy::RoundRobin);
    let capacity = device.properties().tier(TierKind::Vector).capacity;
    let num_cores = device.properties().num_cores;

    device
        .launch(num_cores * 2, |ctx| {
            ctx.reserve(TierKind::Vector, capacity)?;
            Ok::<_, ExecutionError>(())
        })
        .unwrap();
}

#[test]
#[serial]
fn environment_overrides_the_configuration() {
    // SAFETY: the test is serial, no other thread reads the environment.
    unsafe {
        std::env::set_var("TILEPIPE_VALIDATION", "fences");
        std::env::set_var("TILEPIPE_SCHEDULE_SEED", "42");
    }

    let config = GlobalConfig::default().override_from_env();

    unsafe {
        std::env::remove_var("TILEPIPE_VALIDATION");
        std::env::remove_var("TILEPIPE_SCHEDULE_SEED");
    }

    assert_eq!(config.validation.level, ValidationLevel::Fences);
    assert_eq!(
        config.pipeline.schedule,
        SchedulePolicy::Shuffled { seed: 42 }
    );
}
