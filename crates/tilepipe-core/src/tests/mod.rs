use alloc::{format, string::String, sync::Arc, vec::Vec};

use tilepipe_common::Element;
use tilepipe_runtime::{
    Device,
    config::{GlobalConfig, pipeline::SchedulePolicy, validation::ValidationLevel},
    target::TargetProperties,
};

/// Device with an explicit configuration, independent of the global one.
pub fn test_device(
    properties: TargetProperties,
    level: ValidationLevel,
    schedule: SchedulePolicy,
) -> Device {
    let mut config = GlobalConfig::default();
    config.validation.level = level;
    config.pipeline.schedule = schedule;

    Device::with_config(properties, Arc::new(config))
}

/// Compare device output with a host reference.
///
/// The allowed error is relative for large values and absolute around zero.
pub fn assert_equals_approx<E: Element>(
    actual: &[E],
    expected: &[f64],
    epsilon: f64,
) -> Result<(), String> {
    if actual.len() != expected.len() {
        return Err(format!(
            "Length differs: actual={}, expected={}",
            actual.len(),
            expected.len()
        ));
    }

    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let a = a.to_f64();
        let allowed_error = (epsilon * e.abs()).max(epsilon);

        if a.is_nan() || (a - e).abs() >= allowed_error {
            return Err(format!(
                "Values differ more than epsilon: index={} actual={}, expected={}, difference={}, epsilon={}",
                i,
                a,
                e,
                (a - e).abs(),
                epsilon
            ));
        }
    }

    Ok(())
}

/// Naive triple loop over row-major `m x k` and `k x n` matrices.
pub fn matmul_reference<E: Element>(lhs: &[E], rhs: &[E], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut out = alloc::vec![0.0; m * n];
    for row in 0..m {
        for i in 0..k {
            let a = lhs[row * k + i].to_f64();
            for col in 0..n {
                out[row * n + col] += a * rhs[i * n + col].to_f64();
            }
        }
    }
    out
}

/// Elementwise host reference.
pub fn elementwise_reference<E: Element>(
    lhs: &[E],
    rhs: &[E],
    func: impl Fn(f64, f64) -> f64,
) -> Vec<f64> {
    lhs.iter()
        .zip(rhs)
        .map(|(a, b)| func(a.to_f64(), b.to_f64()))
        .collect()
}
