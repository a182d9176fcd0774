use std::ops::BitOr;

/// Pipeline positions at which an observer wants video frames.
///
/// Stored as the engine's raw bitmask so unknown bits pass through.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FramePosition(pub u32);

impl FramePosition {
    pub const POST_CAPTURER: Self = Self(1 << 0);
    pub const PRE_RENDERER: Self = Self(1 << 1);
    pub const PRE_ENCODER: Self = Self(1 << 2);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Maps an empty mask to the capture position.
    pub fn or_default(self) -> Self {
        if self.0 == 0 { Self::default() } else { self }
    }
}

impl Default for FramePosition {
    fn default() -> Self {
        Self::POST_CAPTURER
    }
}

impl BitOr for FramePosition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_falls_back_to_capture() {
        assert_eq!(FramePosition(0).or_default(), FramePosition::POST_CAPTURER);
    }

    #[test]
    fn combined_mask_contains_parts() {
        let mask = FramePosition::POST_CAPTURER | FramePosition::PRE_ENCODER;
        assert_eq!(mask.bits(), 0b101);
        assert!(mask.contains(FramePosition::PRE_ENCODER));
        assert!(!mask.contains(FramePosition::PRE_RENDERER));
        assert_eq!(mask.or_default(), mask);
    }
}
