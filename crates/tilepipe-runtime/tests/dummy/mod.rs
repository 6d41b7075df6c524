use std::sync::Arc;

use tilepipe_runtime::{
    Device,
    config::{GlobalConfig, pipeline::SchedulePolicy, validation::ValidationLevel},
    memory::{DeviceBuffer, read_elem, write_elem},
    pipe::{PipeOp, Resource},
    target::{Target, TrainingTarget},
    tier::TierKind,
};

pub fn test_device(level: ValidationLevel, schedule: SchedulePolicy) -> Device {
    let mut config = GlobalConfig::default();
    config.validation.level = level;
    config.pipeline.schedule = schedule;

    Device::with_config(TrainingTarget::properties(), Arc::new(config))
}

/// Copy `len` f32 values from a buffer to the vector tier.
pub fn load_op(buffer: &DeviceBuffer, offset: usize, len: usize) -> PipeOp {
    let id = buffer.id();
    PipeOp::new("dummy_load", move |memory| {
        let (tier, global) = memory.split_mut(TierKind::Vector);
        let src = global.get(id)?;
        for i in 0..len {
            tier.write(offset + i * 4, read_elem::<f32>(src, i));
        }
        Ok(())
    })
    .reads(Resource::Global(id), 0..len * 4)
    .writes(Resource::Tier(TierKind::Vector), offset..offset + len * 4)
}

/// Add two f32 vectors of the vector tier.
pub fn add_op(lhs: usize, rhs: usize, out: usize, len: usize) -> PipeOp {
    PipeOp::new("dummy_add", move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        for i in 0..len {
            let value = tier.read::<f32>(lhs + i * 4) + tier.read::<f32>(rhs + i * 4);
            tier.write(out + i * 4, value);
        }
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), lhs..lhs + len * 4)
    .reads(Resource::Tier(TierKind::Vector), rhs..rhs + len * 4)
    .writes(Resource::Tier(TierKind::Vector), out..out + len * 4)
}

/// Copy `len` f32 values from the vector tier to a buffer.
pub fn store_op(buffer: &DeviceBuffer, offset: usize, len: usize) -> PipeOp {
    let id = buffer.id();
    PipeOp::new("dummy_store", move |memory| {
        let (tier, global) = memory.split_mut(TierKind::Vector);
        let dst = global.get_mut(id)?;
        for i in 0..len {
            write_elem(dst, i, tier.read::<f32>(offset + i * 4));
        }
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), offset..offset + len * 4)
    .writes(Resource::Global(id), 0..len * 4)
}
