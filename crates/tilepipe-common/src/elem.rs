use core::fmt::{Debug, Display};

use half::{bf16, f16};

/// Data type tag of an [Element].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// 32-bit IEEE float.
    F32,
    /// 16-bit IEEE float.
    F16,
    /// 16-bit brain float.
    BF16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 16-bit integer.
    I16,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F16 | DType::BF16 | DType::I16 => 2,
            DType::I8 | DType::U8 => 1,
        }
    }

    /// Whether the type is a floating point type.
    pub const fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F16 | DType::BF16)
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::I32 => "i32",
            DType::U32 => "u32",
            DType::I16 => "i16",
            DType::I8 => "i8",
            DType::U8 => "u8",
        };
        f.write_str(name)
    }
}

/// A value that can be stored in on-chip tiers and device memory.
///
/// Leaf kernels compute through `f64`, which represents every supported type exactly,
/// and convert back with [Element::from_f64].
pub trait Element:
    bytemuck::Pod + PartialOrd + Debug + Display + Default + Send + Sync + 'static
{
    /// The data type tag.
    const DTYPE: DType;

    /// Widen the value.
    fn to_f64(self) -> f64;

    /// Narrow a value, rounding to nearest for floats and saturating for integers.
    fn from_f64(value: f64) -> Self;

    /// The additive identity.
    fn zero() -> Self {
        Self::default()
    }

    /// The smallest value of the type, negative infinity for floats.
    fn lowest() -> Self;

    /// The largest value of the type, positive infinity for floats.
    fn highest() -> Self;

    /// Decode a slice of raw bytes.
    fn from_bytes(bytes: &[u8]) -> alloc::vec::Vec<Self> {
        bytes
            .chunks_exact(core::mem::size_of::<Self>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

macro_rules! float_element {
    ($ty:ty, $dtype:ident, $to:expr, $from:expr) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn to_f64(self) -> f64 {
                $to(self)
            }

            fn from_f64(value: f64) -> Self {
                $from(value)
            }

            fn lowest() -> Self {
                <$ty>::NEG_INFINITY
            }

            fn highest() -> Self {
                <$ty>::INFINITY
            }
        }
    };
}

macro_rules! int_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                // `as` saturates and maps NaN to zero.
                num_traits::float::FloatCore::round(value) as $ty
            }

            fn lowest() -> Self {
                <$ty>::MIN
            }

            fn highest() -> Self {
                <$ty>::MAX
            }
        }
    };
}

float_element!(f32, F32, |v: f32| v as f64, |v: f64| v as f32);
float_element!(f16, F16, f16::to_f64, f16::from_f64);
float_element!(bf16, BF16, bf16::to_f64, bf16::from_f64);
int_element!(i32, I32);
int_element!(u32, U32);
int_element!(i16, I16);
int_element!(i8, I8);
int_element!(u8, U8);
