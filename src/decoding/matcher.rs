use crate::models::{Digit, SEGMENT_COUNT, SegmentActivation};

/// Lit segments for each digit, row `d` is digit `d`, columns in segment order.
pub const DIGIT_TEMPLATES: [[bool; SEGMENT_COUNT]; 10] = {
    const O: bool = true;
    const X: bool = false;
    [
        [O, O, O, O, O, O, X], // 0
        [X, O, O, X, X, X, X], // 1
        [O, O, X, O, O, X, O], // 2
        [O, O, O, O, X, X, O], // 3
        [X, O, O, X, X, O, O], // 4
        [O, X, O, O, X, O, O], // 5
        [O, X, O, O, O, O, O], // 6
        [O, O, O, X, X, O, X], // 7
        [O, O, O, O, O, O, O], // 8
        [O, O, O, O, X, O, O], // 9
    ]
};

const PATTERN_COUNT: usize = 1 << SEGMENT_COUNT;

/// Every 7-bit pattern mapped to its digit; built once at compile time.
const LOOKUP: [Option<u8>; PATTERN_COUNT] = build_lookup();

const fn build_lookup() -> [Option<u8>; PATTERN_COUNT] {
    let mut table = [None; PATTERN_COUNT];
    let mut digit = 0;
    while digit < DIGIT_TEMPLATES.len() {
        let bits = SegmentActivation::from_flags(DIGIT_TEMPLATES[digit]).bits() as usize;
        assert!(table[bits].is_none(), "digit templates must be distinct");
        table[bits] = Some(digit as u8);
        digit += 1;
    }
    table
}

/// The segment pattern that displays `digit`.
pub fn template_for(digit: Digit) -> SegmentActivation {
    SegmentActivation::from_flags(DIGIT_TEMPLATES[digit.value() as usize])
}

/// Exact match against the digit templates.
///
/// Returns `None` for any pattern that is not one of the ten digits; there
/// is no nearest-match fallback.
pub fn match_digit(activation: SegmentActivation) -> Option<Digit> {
    LOOKUP[activation.bits() as usize].and_then(Digit::new)
}
