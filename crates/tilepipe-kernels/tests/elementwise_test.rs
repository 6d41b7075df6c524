mod common;

use common::*;
use half::f16;
use tilepipe_common::rand::sample;
use tilepipe_core::{
    TileError,
    tests::{assert_equals_approx, elementwise_reference},
};
use tilepipe_kernels::{
    KernelError,
    elementwise::{BinaryOp, ElementwiseConfig, launch_binary},
};

#[test_log::test]
fn add_f16_in_ping_pong_tiles() {
    let mut device = device(7);
    let (rows, cols) = (20, 2048);
    let lhs_data: Vec<f16> = sample(rows * cols, 1);
    let rhs_data: Vec<f16> = sample(rows * cols, 2);

    let lhs = device.create_from_slice(&lhs_data);
    let rhs = device.create_from_slice(&rhs_data);
    let out = device.empty::<f16>(rows * cols);

    launch_binary::<f16>(
        &mut device,
        BinaryOp::Add,
        &matrix(&lhs, rows, cols),
        &matrix(&rhs, rows, cols),
        &matrix(&out, rows, cols),
        ElementwiseConfig::ping_pong(20, 256),
        4,
    )
    .unwrap();

    let expected = elementwise_reference(&lhs_data, &rhs_data, |a, b| a + b);
    let actual = device.read::<f16>(&out).unwrap();
    if let Err(err) = assert_equals_approx(&actual, &expected, 1e-2) {
        panic!("{err}");
    }
}

#[test_log::test]
fn edge_tiles_only_touch_the_tensor() {
    let mut device = device(11);
    let (rows, cols) = (30, 100);
    let lhs_data: Vec<f32> = sample(rows * cols, 3);
    let rhs_data: Vec<f32> = sample(rows * cols, 4);

    let lhs = device.create_from_slice(&lhs_data);
    let rhs = device.create_from_slice(&rhs_data);
    // One guard row past the output, which no tile may write.
    let out = device.create_from_slice(&vec![7.0f32; (rows + 1) * cols]);

    for op in [BinaryOp::Mul, BinaryOp::Max, BinaryOp::Sub] {
        launch_binary::<f32>(
            &mut device,
            op,
            &matrix(&lhs, rows, cols),
            &matrix(&rhs, rows, cols),
            &matrix(&out, rows, cols),
            ElementwiseConfig::ping_pong(16, 40),
            3,
        )
        .unwrap();

        let mut expected = elementwise_reference(&lhs_data, &rhs_data, |a, b| op.apply(a, b));
        expected.extend(core::iter::repeat_n(7.0, cols));
        let actual = device.read::<f32>(&out).unwrap();
        if let Err(err) = assert_equals_approx(&actual, &expected, 1e-6) {
            panic!("{op:?}: {err}");
        }
    }
}

#[test_log::test]
fn long_streams_recycle_their_fences() {
    // 64 tiles through a single block, far more than the events of a pipe pair.
    let mut device = device(5);
    let (rows, cols) = (64, 1024);
    let lhs_data: Vec<f32> = sample(rows * cols, 8);
    let rhs_data: Vec<f32> = sample(rows * cols, 9);

    let lhs = device.create_from_slice(&lhs_data);
    let rhs = device.create_from_slice(&rhs_data);
    let out = device.empty::<f32>(rows * cols);

    launch_binary::<f32>(
        &mut device,
        BinaryOp::Add,
        &matrix(&lhs, rows, cols),
        &matrix(&rhs, rows, cols),
        &matrix(&out, rows, cols),
        ElementwiseConfig::ping_pong(16, 64),
        1,
    )
    .unwrap();

    let expected = elementwise_reference(&lhs_data, &rhs_data, |a, b| a + b);
    let actual = device.read::<f32>(&out).unwrap();
    if let Err(err) = assert_equals_approx(&actual, &expected, 1e-6) {
        panic!("{err}");
    }
}

#[test_log::test]
fn three_slots_produce_the_same_result() {
    let (rows, cols) = (48, 256);
    let lhs_data: Vec<f32> = sample(rows * cols, 12);
    let rhs_data: Vec<f32> = sample(rows * cols, 13);

    let run = |config: ElementwiseConfig| {
        let mut device = device(3);
        let lhs = device.create_from_slice(&lhs_data);
        let rhs = device.create_from_slice(&rhs_data);
        let out = device.empty::<f32>(rows * cols);

        launch_binary::<f32>(
            &mut device,
            BinaryOp::Min,
            &matrix(&lhs, rows, cols),
            &matrix(&rhs, rows, cols),
            &matrix(&out, rows, cols),
            config,
            2,
        )
        .unwrap();
        device.read::<f32>(&out).unwrap()
    };

    assert_eq!(
        run(ElementwiseConfig::ping_pong(16, 64)),
        run(ElementwiseConfig::new(16, 64, 3))
    );
}

#[test_log::test]
fn output_can_alias_an_input() {
    let (rows, cols) = (20, 2048);
    let lhs_data: Vec<f32> = sample(rows * cols, 21);
    let rhs_data: Vec<f32> = sample(rows * cols, 22);
    let expected = elementwise_reference(&lhs_data, &rhs_data, |a, b| a + b);

    for (mut device, grid) in [(round_robin_device(), 1), (device(17), 4)] {
        let lhs = device.create_from_slice(&lhs_data);
        let rhs = device.create_from_slice(&rhs_data);
        let lhs_view = matrix(&lhs, rows, cols);

        launch_binary::<f32>(
            &mut device,
            BinaryOp::Add,
            &lhs_view,
            &matrix(&rhs, rows, cols),
            &lhs_view,
            ElementwiseConfig::ping_pong(20, 256),
            grid,
        )
        .unwrap();

        let actual = device.read::<f32>(&lhs).unwrap();
        if let Err(err) = assert_equals_approx(&actual, &expected, 1e-6) {
            panic!("grid {grid}: {err}");
        }
    }
}

#[test_log::test]
fn mismatched_shapes_are_rejected() {
    let mut device = device(1);
    let lhs = device.empty::<f32>(64);
    let out = device.empty::<f32>(64);

    let result = launch_binary::<f32>(
        &mut device,
        BinaryOp::Add,
        &matrix(&lhs, 8, 8),
        &matrix(&lhs, 8, 8),
        &matrix(&out, 4, 16),
        ElementwiseConfig::ping_pong(8, 8),
        1,
    );

    match result {
        Err(KernelError::Tile(err)) => assert_eq!(
            err,
            TileError::ShapeMismatch {
                op: "elementwise",
                expected: (8, 8),
                actual: (4, 16),
            }
        ),
        other => panic!("Expected a shape mismatch, got {other:?}"),
    }
}
