use std::fmt;

/// Number of strokes in a seven-segment character.
pub const SEGMENT_COUNT: usize = 7;

/// Which segments of one character are lit.
///
/// Bit `s` holds segment `s`, using the layout
///
/// ```text
///      0
///   5     1
///      6
///   4     2
///      3
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SegmentActivation(u8);

impl SegmentActivation {
    const MASK: u8 = (1 << SEGMENT_COUNT) - 1;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Build from per-segment flags in segment index order.
    pub const fn from_flags(flags: [bool; SEGMENT_COUNT]) -> Self {
        let mut bits = 0u8;
        let mut segment = 0;
        while segment < SEGMENT_COUNT {
            if flags[segment] {
                bits |= 1 << segment;
            }
            segment += 1;
        }
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_active(self, segment: usize) -> bool {
        segment < SEGMENT_COUNT && self.0 & (1 << segment) != 0
    }

    pub fn activate(&mut self, segment: usize) {
        if segment < SEGMENT_COUNT {
            self.0 |= 1 << segment;
        }
    }

    pub fn flags(self) -> [bool; SEGMENT_COUNT] {
        std::array::from_fn(|segment| self.is_active(segment))
    }
}

/// Renders as seven 0/1 characters, segment 0 first.
impl fmt::Display for SegmentActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in self.flags() {
            f.write_str(if flag { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// A decoded decimal digit, always in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digit(u8);

impl Digit {
    pub fn new(value: u8) -> Option<Self> {
        (value <= 9).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a successful decode, one entry per character in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub digits: Vec<Digit>,
    pub activations: Vec<SegmentActivation>,
}

impl Reading {
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in &self.digits {
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}
