mod common;

use common::*;
use half::f16;
use pretty_assertions::assert_eq;
use tilepipe_common::rand::sample;
use tilepipe_core::{
    Fractal, GlobalTensor, PadValue, Tile, TileError, TileLayout, TilePlacement,
    ops::{MatmulMode, extract, fill_pad, load, matmul, move_tile, store, transpose},
};
use tilepipe_runtime::{pipe::PipeKind, tier::TierKind};

#[test_log::test]
fn load_then_store_reproduces_the_tensor() {
    let mut device = test_device();
    let data: Vec<f16> = sample(20 * 64, 7);
    let input = device.create_from_slice(&data);
    let output = device.empty::<f16>(20 * 64);

    device
        .launch(1, |ctx| -> Result<(), TestError> {
            let src = GlobalTensor::<f16>::contiguous(&input, &[20, 64])?;
            let dst = GlobalTensor::<f16>::contiguous(&output, &[20, 64])?;

            // The second tile is an edge tile: only 24 of its 48 columns hold data.
            for (col, cols) in [(0, 40), (40, 24)] {
                let tile = Tile::<f16>::builder(TierKind::Vector, 24, 48)
                    .valid(20, cols)
                    .alloc(ctx)?;
                load(ctx, &tile, &src.window(0, col, 20, cols)?)?;
                fence(ctx, PipeKind::Load, PipeKind::Store)?;
                store(ctx, &dst.window(0, col, 20, cols)?, &tile)?;
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(device.read::<f16>(&output).unwrap(), data);
}

#[test_log::test]
fn load_checks_the_window_shape() {
    let mut device = test_device();
    let input = device.empty::<f32>(64);

    device
        .launch(1, |ctx| -> Result<(), TestError> {
            let src = GlobalTensor::<f32>::contiguous(&input, &[8, 8])?;
            let tile = Tile::<f32>::builder(TierKind::Vector, 8, 8)
                .valid(4, 8)
                .alloc(ctx)?;

            assert_eq!(
                load(ctx, &tile, &src),
                Err(TileError::ShapeMismatch {
                    op: "load",
                    expected: (4, 8),
                    actual: (8, 8)
                })
            );
            Ok(())
        })
        .unwrap();
}

#[test_log::test]
fn operators_need_placed_tiles() {
    let mut device = test_device();
    let input = device.empty::<f32>(64);

    device
        .launch(1, |ctx| -> Result<(), TestError> {
            let src = GlobalTensor::<f32>::contiguous(&input, &[8, 8])?;
            let tile = Tile::<f32>::builder(TierKind::Vector, 8, 8).build()?;

            assert_eq!(
                load(ctx, &tile, &src),
                Err(TileError::Unassigned {
                    tier: TierKind::Vector
                })
            );
            Ok(())
        })
        .unwrap();
}

#[test_log::test]
fn unsupported_moves_are_rejected() {
    let mut device = test_device();
    let output = device.empty::<f32>(16 * 16);

    device
        .launch(1, |ctx| -> Result<(), TestError> {
            let vector = Tile::<f16>::builder(TierKind::Vector, 16, 16).alloc(ctx)?;
            let left = Tile::<f16>::builder(TierKind::Left, 16, 16)
                .layout(TileLayout::Fractal(Fractal::zz::<f16>()))
                .alloc(ctx)?;
            let staging = Tile::<f32>::builder(TierKind::Staging, 16, 16).alloc(ctx)?;
            let other = Tile::<f32>::builder(TierKind::Vector, 16, 16).alloc(ctx)?;

            assert_eq!(
                move_tile(ctx, &left, &vector),
                Err(TileError::UnsupportedMove {
                    src: TierKind::Vector,
                    dst: TierKind::Left
                })
            );
            assert!(matches!(
                move_tile(ctx, &other, &vector),
                Err(TileError::DTypeMismatch { op: "move", .. })
            ));
            assert!(matches!(
                store(ctx, &GlobalTensor::<f32>::contiguous(&output, &[16, 16])?, &staging),
                Err(TileError::TierMismatch { op: "store", .. })
            ));
            Ok(())
        })
        .unwrap();
}

#[test_log::test]
fn fractal_round_trip_through_the_matrix_unit() {
    const M: usize = 16;
    const K: usize = 64;
    const N: usize = 32;

    let mut device = test_device();
    let lhs: Vec<f16> = (0..M * K).map(|i| f16::from_f32((i % 7) as f32 - 3.0)).collect();
    let rhs: Vec<f16> = (0..K * N).map(|i| f16::from_f32((i % 5) as f32 - 2.0)).collect();
    let lhs_buffer = device.create_from_slice(&lhs);
    let rhs_buffer = device.create_from_slice(&rhs);
    let out_buffer = device.empty::<f32>(M * N);

    device
        .launch(1, |ctx| -> Result<(), TestError> {
            let lhs = GlobalTensor::<f16>::contiguous(&lhs_buffer, &[M, K])?;
            let rhs = GlobalTensor::<f16>::contiguous(&rhs_buffer, &[K, N])?;
            let out = GlobalTensor::<f32>::contiguous(&out_buffer, &[M, N])?;

            let nz = TileLayout::Fractal(Fractal::nz::<f16>());
            let lhs_staging = Tile::<f16>::builder(TierKind::Staging, M, K).layout(nz).alloc(ctx)?;
            let rhs_staging = Tile::<f16>::builder(TierKind::Staging, K, N).layout(nz).alloc(ctx)?;
            load(ctx, &lhs_staging, &lhs)?;
            load(ctx, &rhs_staging, &rhs)?;
            fence(ctx, PipeKind::Load, PipeKind::Move)?;

            let acc = Tile::<f32>::builder(TierKind::Accumulator, M, N)
                .layout(TileLayout::Fractal(Fractal::accumulator()))
                .alloc(ctx)?;

            // Two K steps of 32: the first initializes, the second accumulates.
            for step in 0..2 {
                let left = Tile::<f16>::builder(TierKind::Left, M, 32)
                    .layout(TileLayout::Fractal(Fractal::zz::<f16>()))
                    .alloc(ctx)?;
                let right = Tile::<f16>::builder(TierKind::Right, 32, N)
                    .layout(TileLayout::Fractal(Fractal::zn::<f16>()))
                    .alloc(ctx)?;
                extract(ctx, &left, &lhs_staging, 0, step * 32)?;
                extract(ctx, &right, &rhs_staging, step * 32, 0)?;
                fence(ctx, PipeKind::Move, PipeKind::Matrix)?;
                matmul(ctx, &acc, &left, &right, MatmulMode::for_step(step))?;
            }

            fence(ctx, PipeKind::Matrix, PipeKind::Fixup)?;
            store(ctx, &out, &acc)?;
            Ok(())
        })
        .unwrap();

    let expected: Vec<f32> = (0..M * N)
        .map(|i| {
            let (row, col) = (i / N, i % N);
            (0..K)
                .map(|k| lhs[row * K + k].to_f32() * rhs[k * N + col].to_f32())
                .sum()
        })
        .collect();
    assert_eq!(device.read::<f32>(&out_buffer).unwrap(), expected);
}

#[test_log::test]
fn matmul_checks_its_operands() {
    let mut device = test_device();

    device
        .launch(1, |ctx| -> Result<(), TestError> {
            let acc = Tile::<f32>::builder(TierKind::Accumulator, 16, 16)
                .layout(TileLayout::Fractal(Fractal::accumulator()))
                .alloc(ctx)?;
            let left = Tile::<f16>::builder(TierKind::Left, 16, 32)
                .layout(TileLayout::Fractal(Fractal::zz::<f16>()))
                .alloc(ctx)?;
            let right = Tile::<f16>::builder(TierKind::Right, 16, 16)
                .layout(TileLayout::Fractal(Fractal::zn::<f16>()))
                .alloc(ctx)?;
            let flat = Tile::<f16>::builder(TierKind::Right, 32, 16).alloc(ctx)?;

            assert_eq!(
                matmul(ctx, &acc, &left, &right, MatmulMode::Initialize),
                Err(TileError::ShapeMismatch {
                    op: "matmul",
                    expected: (32, 16),
                    actual: (16, 16)
                })
            );
            assert!(matches!(
                matmul(ctx, &acc, &left, &flat, MatmulMode::Initialize),
                Err(TileError::LayoutMismatch { op: "matmul", .. })
            ));
            assert!(matches!(
                matmul(ctx, &acc, &right, &left, MatmulMode::Initialize),
                Err(TileError::TierMismatch {
                    expected: TierKind::Left,
                    actual: TierKind::Right,
                    ..
                })
            ));
            Ok(())
        })
        .unwrap();
}

#[test_log::test]
fn transpose_and_refill_padding() {
    let mut device = test_device();
    let input = device.create_from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let output = device.empty::<f32>(6);

    device
        .launch(1, |ctx| -> Result<(), TestError> {
            let src_tile = Tile::<f32>::builder(TierKind::Vector, 8, 8)
                .valid(2, 3)
                .alloc(ctx)?;
            let mut dst_tile = Tile::<f32>::builder(TierKind::Vector, 8, 8)
                .valid(3, 2)
                .pad(PadValue::Max)
                .build()?;
            ctx.place(&mut dst_tile, 8 * 8 * 4)?;

            load(ctx, &src_tile, &GlobalTensor::<f32>::contiguous(&input, &[2, 3])?)?;
            fence(ctx, PipeKind::Load, PipeKind::Vector)?;
            transpose(ctx, &dst_tile, &src_tile)?;
            fill_pad(ctx, &dst_tile)?;
            fence(ctx, PipeKind::Vector, PipeKind::Store)?;
            store(ctx, &GlobalTensor::<f32>::contiguous(&output, &[3, 2])?, &dst_tile)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(
        device.read::<f32>(&output).unwrap(),
        vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]
    );
}
