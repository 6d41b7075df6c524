use alloc::{sync::Arc, vec, vec::Vec};
use tilepipe_common::Element;

use crate::{
    ExecutionError, MemoryError,
    compute::Core,
    config::GlobalConfig,
    context::KernelContext,
    logging::{PipeStats, PipelineLogger},
    memory::{DeviceBuffer, GlobalMemory},
    target::{DefaultTarget, Target, TargetProperties},
};

/// A simulated accelerator: global memory and a set of cores.
#[derive(Debug)]
pub struct Device {
    properties: TargetProperties,
    cores: Vec<Core>,
    global: GlobalMemory,
    logger: Arc<PipelineLogger>,
    stats: PipeStats,
}

impl Default for Device {
    fn default() -> Self {
        Self::for_target::<DefaultTarget>()
    }
}

impl Device {
    /// Create a device with the global configuration.
    pub fn new(properties: TargetProperties) -> Self {
        Self::with_config(properties, GlobalConfig::get())
    }

    /// Create a device of the given generation with the global configuration.
    pub fn for_target<T: Target>() -> Self {
        Self::new(T::properties())
    }

    /// Create a device with a specific configuration.
    pub fn with_config(properties: TargetProperties, config: Arc<GlobalConfig>) -> Self {
        let logger = Arc::new(PipelineLogger::new(config.clone()));
        let cores = (0..usize::max(properties.num_cores, 1))
            .map(|index| Core::new(index, &properties, &config, logger.clone()))
            .collect();

        Self {
            properties,
            cores,
            global: GlobalMemory::default(),
            logger,
            stats: PipeStats::default(),
        }
    }

    /// Capabilities of the device.
    pub fn properties(&self) -> &TargetProperties {
        &self.properties
    }

    /// A core of the device.
    pub fn core(&self, index: usize) -> Option<&Core> {
        self.cores.get(index)
    }

    /// Counters of the last launch, summed over its blocks.
    pub fn stats(&self) -> &PipeStats {
        &self.stats
    }

    /// Copy host data to a new device buffer.
    pub fn create_from_slice<E: Element>(&mut self, data: &[E]) -> DeviceBuffer {
        self.global.alloc(bytemuck::cast_slice(data).to_vec())
    }

    /// Create a zeroed device buffer of `len` elements.
    pub fn empty<E: Element>(&mut self, len: usize) -> DeviceBuffer {
        self.global.alloc(vec![0; len * size_of::<E>()])
    }

    /// Copy a device buffer back to the host.
    pub fn read<E: Element>(&self, buffer: &DeviceBuffer) -> Result<Vec<E>, MemoryError> {
        self.global.read(buffer.id())
    }

    /// Free a device buffer.
    pub fn release(&mut self, buffer: &DeviceBuffer) -> Result<(), MemoryError> {
        self.global.release(buffer)
    }

    /// Run the kernel once per block of the grid.
    ///
    /// Block `i` runs on core `i % num_cores`. Blocks run one after the other, each one starting
    /// with empty placements and ending when every pipe of its core is drained. The first error
    /// stops the launch.
    pub fn launch<F, Err>(&mut self, grid: usize, mut kernel: F) -> Result<(), Err>
    where
        F: FnMut(&mut KernelContext<'_>) -> Result<(), Err>,
        Err: From<ExecutionError>,
    {
        let mut stats = PipeStats::default();
        let num_cores = self.cores.len();

        for block_idx in 0..grid {
            let core = &mut self.cores[block_idx % num_cores];
            core.begin_kernel();

            let result = {
                let mut context =
                    KernelContext::new(core, &mut self.global, &self.properties, block_idx, grid);
                kernel(&mut context)
            };

            if let Err(err) = result {
                core.abort();
                return Err(err);
            }

            match core.finish_kernel(&mut self.global) {
                Ok(block_stats) => stats.merge(&block_stats),
                Err(err) => {
                    self.logger
                        .log_violation(format_args!("[core {}] block {block_idx}: {err}", core.index()));
                    core.abort();
                    return Err(err.into());
                }
            }
        }

        self.logger.log_summary(format_args!(
            "Launch of {grid} block(s) on {} core(s)\n{stats}",
            usize::min(grid, num_cores)
        ));
        self.stats = stats;

        Ok(())
    }
}
