mod common;

use common::*;
use pretty_assertions::assert_eq;
use tilepipe_common::rand::sample;
use tilepipe_core::{
    Tile,
    ops::{add, load, store},
};
use tilepipe_kernels::{
    KernelError,
    pipeline::{BufferRing, ScheduleError, SlotRoles, SlotState},
};
use tilepipe_runtime::{ExecutionError, FenceError, pipe::PipeKind, tier::TierKind};

const ROWS: usize = 8;
const COLS: usize = 64;

#[derive(Clone, Copy)]
struct Doubling {
    input: Tile<f32>,
    output: Tile<f32>,
}

#[test_log::test]
fn ring_streams_tiles_through_three_pipes() {
    let mut device = device(77);
    let chunks = 12;
    let data: Vec<f32> = sample(chunks * ROWS * COLS, 1);
    let input = device.create_from_slice(&data);
    let output = device.empty::<f32>(data.len());

    device
        .launch(1, |ctx| -> Result<(), KernelError> {
            let src = matrix::<f32>(&input, chunks * ROWS, COLS);
            let dst = matrix::<f32>(&output, chunks * ROWS, COLS);

            let mut slot = || -> Result<Doubling, KernelError> {
                Ok(Doubling {
                    input: Tile::builder(TierKind::Vector, ROWS, COLS).alloc(ctx)?,
                    output: Tile::builder(TierKind::Vector, ROWS, COLS).alloc(ctx)?,
                })
            };
            let mut ring = BufferRing::ping_pong(
                SlotRoles::with_store(PipeKind::Load, PipeKind::Vector, PipeKind::Store),
                slot()?,
                slot()?,
            );

            for chunk in 0..chunks {
                let slot = ring.slot_for(chunk);
                let row = chunk * ROWS;

                let tiles = *ring.begin_load(ctx, slot)?;
                load(ctx, &tiles.input, &src.window(row, 0, ROWS, COLS)?)?;
                ring.end_load(ctx, slot)?;

                ring.begin_consume(ctx, slot)?;
                add(ctx, &tiles.output, &tiles.input, &tiles.input)?;
                ring.end_consume(ctx, slot)?;
                assert_eq!(ring.state(slot)?, SlotState::Storing);

                ring.begin_store(ctx, slot)?;
                store(ctx, &dst.window(row, 0, ROWS, COLS)?, &tiles.output)?;
                ring.end_store(ctx, slot)?;
            }

            ring.drain(ctx)
        })
        .unwrap();

    let expected: Vec<f32> = data.iter().map(|v| v * 2.0).collect();
    assert_eq!(device.read::<f32>(&output).unwrap(), expected);
}

#[test_log::test]
fn skipping_the_fences_is_a_race() {
    let mut device = device(77);
    let input = device.create_from_slice(&sample::<f32>(ROWS * COLS, 1));
    let output = device.empty::<f32>(ROWS * COLS);

    let result = device.launch(1, |ctx| -> Result<(), KernelError> {
        let src = matrix::<f32>(&input, ROWS, COLS);
        let dst = matrix::<f32>(&output, ROWS, COLS);
        let tile = Tile::<f32>::builder(TierKind::Vector, ROWS, COLS).alloc(ctx)?;

        load(ctx, &tile, &src)?;
        add(ctx, &tile, &tile, &tile)?;
        store(ctx, &dst, &tile)?;
        Ok(())
    });

    assert!(
        matches!(
            result,
            Err(KernelError::Execution(ExecutionError::Hazard(_)))
        ),
        "{result:?}"
    );
}

#[test_log::test]
fn consuming_an_empty_slot_is_rejected() {
    let mut device = device(1);

    let result = device.launch(1, |ctx| -> Result<(), KernelError> {
        let mut ring = BufferRing::ping_pong(SlotRoles::pair(PipeKind::Load, PipeKind::Vector), (), ());
        ring.begin_consume(ctx, 1)?;
        Ok(())
    });

    assert!(
        matches!(
            result,
            Err(KernelError::Schedule(ScheduleError::InvalidTransition {
                slot: 1,
                from: SlotState::Idle,
                to: SlotState::Consuming,
            }))
        ),
        "{result:?}"
    );
}

#[test_log::test]
fn draining_a_busy_ring_is_rejected() {
    let mut device = device(1);

    let result = device.launch(1, |ctx| -> Result<(), KernelError> {
        let mut ring = BufferRing::ping_pong(SlotRoles::pair(PipeKind::Load, PipeKind::Vector), (), ());
        ring.begin_load(ctx, 0)?;
        ring.drain(ctx)
    });

    assert!(
        matches!(
            result,
            Err(KernelError::Schedule(ScheduleError::InvalidTransition {
                slot: 0,
                from: SlotState::Loading,
                to: SlotState::Idle,
            }))
        ),
        "{result:?}"
    );
}

#[test_log::test]
fn store_must_wait_for_the_consume() {
    let mut device = device(1);

    let result = device.launch(1, |ctx| -> Result<(), KernelError> {
        let mut ring = BufferRing::new(
            SlotRoles::with_store(PipeKind::Load, PipeKind::Vector, PipeKind::Store),
            vec![()],
        )?;
        ring.begin_load(ctx, 0)?;
        ring.end_load(ctx, 0)?;
        ring.begin_consume(ctx, 0)?;
        ring.end_consume(ctx, 0)?;
        ring.end_store(ctx, 0)
    });

    assert!(
        matches!(
            result,
            Err(KernelError::Schedule(ScheduleError::PendingFence {
                slot: 0,
                state: SlotState::Storing,
            }))
        ),
        "{result:?}"
    );
}

#[test_log::test]
fn undrained_ring_leaks_its_fence() {
    let mut device = device(1);

    let result = device.launch(1, |ctx| -> Result<(), KernelError> {
        let mut ring = BufferRing::ping_pong(SlotRoles::pair(PipeKind::Load, PipeKind::Vector), (), ());
        ring.begin_load(ctx, 0)?;
        ring.end_load(ctx, 0)?;
        ring.begin_consume(ctx, 0)?;
        ring.end_consume(ctx, 0)?;
        Ok(())
    });

    assert!(
        matches!(
            result,
            Err(KernelError::Execution(ExecutionError::Fence(
                FenceError::TokenLeaked { count: 1 }
            )))
        ),
        "{result:?}"
    );
}

#[test_log::test]
fn rings_need_a_slot() {
    let result = BufferRing::<()>::new(SlotRoles::pair(PipeKind::Load, PipeKind::Vector), vec![]);

    assert_eq!(result.err(), Some(ScheduleError::EmptyRing));
}
