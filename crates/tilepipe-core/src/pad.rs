use tilepipe_common::Element;

/// Value of the declared but invalid elements of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PadValue {
    /// Zero, also used when no policy is given.
    #[default]
    Zero,
    /// Largest value of the type, positive infinity for floats. Neutral for a min reduction.
    Max,
    /// Smallest value of the type, negative infinity for floats. Neutral for a max reduction.
    Min,
}

impl PadValue {
    /// The padding element.
    pub fn value<E: Element>(self) -> E {
        match self {
            PadValue::Zero => E::zero(),
            PadValue::Max => E::highest(),
            PadValue::Min => E::lowest(),
        }
    }
}
