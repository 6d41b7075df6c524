use half::f16;
use pretty_assertions::assert_eq;
use tilepipe::prelude::*;

#[test_log::test]
fn hand_written_kernel_with_the_prelude() {
    let mut device = Device::for_target::<TrainingTarget>();
    let data: Vec<f16> = (0..16 * 32).map(|i| f16::from_f32((i % 7) as f32)).collect();
    let input = device.create_from_slice(&data);
    let output = device.empty::<f16>(data.len());

    device
        .launch(1, |ctx| -> Result<(), KernelError> {
            let src = GlobalTensor::<f16>::contiguous(&input, &[16, 32])?;
            let dst = GlobalTensor::<f16>::contiguous(&output, &[16, 32])?;

            let mut ring = BufferRing::new(
                SlotRoles::with_store(PipeKind::Load, PipeKind::Vector, PipeKind::Store),
                vec![Tile::<f16>::builder(TierKind::Vector, 16, 32).alloc(ctx)?],
            )?;

            let tile = *ring.begin_load(ctx, 0)?;
            ops::load(ctx, &tile, &src)?;
            ring.end_load(ctx, 0)?;

            ring.begin_consume(ctx, 0)?;
            ops::add(ctx, &tile, &tile, &tile)?;
            ring.end_consume(ctx, 0)?;

            ring.begin_store(ctx, 0)?;
            ops::store(ctx, &dst, &tile)?;
            ring.end_store(ctx, 0)?;

            ring.drain(ctx)
        })
        .unwrap();

    let expected: Vec<f16> = data.iter().map(|v| *v + *v).collect();
    assert_eq!(device.read::<f16>(&output).unwrap(), expected);
}

#[test_log::test]
fn elementwise_kernel_from_the_prelude() {
    let mut device = Device::for_target::<TrainingTarget>();
    let lhs: Vec<f32> = (0..40 * 64).map(|i| i as f32).collect();
    let rhs = vec![0.5f32; lhs.len()];

    let lhs_buffer = device.create_from_slice(&lhs);
    let rhs_buffer = device.create_from_slice(&rhs);
    let out_buffer = device.empty::<f32>(lhs.len());
    let tensor = |buffer: &DeviceBuffer| GlobalTensor::<f32>::contiguous(buffer, &[40, 64]).unwrap();

    launch_binary(
        &mut device,
        BinaryOp::Mul,
        &tensor(&lhs_buffer),
        &tensor(&rhs_buffer),
        &tensor(&out_buffer),
        ElementwiseConfig::ping_pong(16, 64),
        2,
    )
    .unwrap();

    let expected: Vec<f32> = lhs.iter().map(|v| v * 0.5).collect();
    assert_eq!(device.read::<f32>(&out_buffer).unwrap(), expected);
}
