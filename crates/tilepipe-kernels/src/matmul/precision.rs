use half::{bf16, f16};
use tilepipe_common::Element;

/// Element types flowing through a matmul.
pub trait MatmulPrecision: Send + Sync + Copy + 'static {
    /// Element type of both operands, in global memory and on chip.
    type Input: Element;
    /// Element type of the accumulator.
    type Acc: Element;
    /// Element type of the output tensor.
    type Output: Element;
}

impl MatmulPrecision for f16 {
    type Input = f16;
    type Acc = f32;
    type Output = f16;
}

impl MatmulPrecision for bf16 {
    type Input = bf16;
    type Acc = f32;
    type Output = bf16;
}

impl MatmulPrecision for f32 {
    type Input = f32;
    type Acc = f32;
    type Output = f32;
}

impl MatmulPrecision for i8 {
    type Input = i8;
    type Acc = i32;
    type Output = i32;
}

impl<EI: Element, EA: Element, EO: Element> MatmulPrecision for (EI, EA, EO) {
    type Input = EI;
    type Acc = EA;
    type Output = EO;
}
