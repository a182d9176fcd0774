use std::fmt;

/// Frame rotation, restricted to quarter turns.
///
/// Engines report rotation as a raw degree count; anything outside the four
/// quarter turns is a contract violation by the frame source and is rejected
/// rather than wrapped.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const fn degrees(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Exact `(sin, cos)` for the quarter turn.
    ///
    /// Computing these with `f32::sin_cos` leaves ~1e-8 residue in what must
    /// be exact zeros, which shows up as sub-texel skew.
    pub const fn sin_cos(self) -> (f32, f32) {
        match self {
            Rotation::Deg0 => (0.0, 1.0),
            Rotation::Deg90 => (1.0, 0.0),
            Rotation::Deg180 => (0.0, -1.0),
            Rotation::Deg270 => (-1.0, 0.0),
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(InvalidRotation(other)),
        }
    }
}

/// Rotation value outside {0, 90, 180, 270}.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InvalidRotation(pub i32);

impl fmt::Display for InvalidRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rotation {} is not a quarter turn", self.0)
    }
}

impl std::error::Error for InvalidRotation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_quarter_turns() {
        for deg in [0, 90, 180, 270] {
            assert_eq!(Rotation::try_from(deg).unwrap().degrees(), deg);
        }
    }

    #[test]
    fn rejects_full_turn_and_negatives() {
        // 360 and -90 are equivalent angles but not part of the declared set.
        assert_eq!(Rotation::try_from(360), Err(InvalidRotation(360)));
        assert_eq!(Rotation::try_from(-90), Err(InvalidRotation(-90)));
        assert_eq!(Rotation::try_from(45), Err(InvalidRotation(45)));
    }
}
