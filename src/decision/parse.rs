//! Lenient direction parsing
//!
//! Models are asked to finish with `x,y`, but they often wrap the answer in
//! prose or quote an example first. The scanner finds every
//! `<number>,<number>` pair in the text and keeps the last one.

use crate::error::DecisionError;
use crate::util::vec2::Vec2;

/// A number token: optional `-`, digits, and an optional fraction with at
/// least one digit (`-?\d*\.?\d+`). Returns the token's end offset.
fn scan_number(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }

    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let has_int = i > int_start;

    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        return Some(i);
    }

    has_int.then_some(i)
}

/// Separator between the two numbers: a comma, then optional whitespace
fn scan_separator(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&b',') {
        return None;
    }
    let mut i = start + 1;
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    Some(i)
}

/// Last `<number>,<number>` pair in `text`, as raw slices. Matches do not
/// overlap: after a pair is found scanning resumes behind its second number.
pub fn last_pair(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut found = None;
    let mut i = 0;

    while i < bytes.len() {
        let Some(first_end) = scan_number(bytes, i) else {
            i += 1;
            continue;
        };

        let pair = scan_separator(bytes, first_end)
            .and_then(|second_start| scan_number(bytes, second_start).map(|end| (second_start, end)));

        match pair {
            Some((second_start, second_end)) => {
                found = Some((&text[i..first_end], &text[second_start..second_end]));
                i = second_end;
            }
            None => i += 1,
        }
    }

    found
}

/// Parse a model reply into a unit heading.
///
/// Only the last pair counts. Both components must be finite and within
/// `[-1, 1]`, and the pair must not be the zero vector.
pub fn parse_direction(text: &str) -> Result<Vec2, DecisionError> {
    let (x, y) = last_pair(text)
        .ok_or_else(|| DecisionError::MalformedResponse("no coordinate pair in response".to_string()))?;

    let parse = |raw: &str| {
        raw.parse::<f32>()
            .map_err(|e| DecisionError::MalformedResponse(format!("bad number '{}': {}", raw, e)))
    };
    let direction = Vec2::new(parse(x)?, parse(y)?);

    if !direction.is_finite() || direction.x.abs() > 1.0 || direction.y.abs() > 1.0 {
        return Err(DecisionError::MalformedResponse(format!(
            "direction {} out of range",
            direction
        )));
    }

    let (unit, length) = direction.normalize_with_length();
    if length == 0.0 {
        return Err(DecisionError::MalformedResponse("zero direction".to_string()));
    }

    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(text: &str) -> bool {
        matches!(parse_direction(text), Err(DecisionError::MalformedResponse(_)))
    }

    #[test]
    fn test_plain_pair() {
        let d = parse_direction("0.6,0.8").unwrap();
        assert!(d.approx_eq(Vec2::new(0.6, 0.8), 1e-6));
    }

    #[test]
    fn test_last_pair_wins() {
        let text = "For example 0.5,-0.7 moves south-east. I will go 0.0, 1.0";
        let d = parse_direction(text).unwrap();
        assert!(d.approx_eq(Vec2::new(0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_ellipsis_before_pair_is_skipped() {
        let d = parse_direction("thinking... 0.3,-0.9").unwrap();
        assert!(d.approx_eq(Vec2::new(0.3, -0.9).normalize(), 1e-6));
        assert_eq!(last_pair("thinking... 0.3,-0.9"), Some(("0.3", "-0.9")));
    }

    #[test]
    fn test_second_of_two_pairs_wins() {
        let text = "0.3,-0.9 then 0.1,0.1";
        assert_eq!(last_pair(text), Some(("0.1", "0.1")));
        let d = parse_direction(text).unwrap();
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert!(d.approx_eq(Vec2::new(s, s), 1e-6));
    }

    #[test]
    fn test_normalizes_to_unit() {
        let d = parse_direction("Going up-left: -1,-1").unwrap();
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert!(d.approx_eq(Vec2::new(-s, -s), 1e-6));
        assert!((d.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_leading_dot_and_negative() {
        let d = parse_direction("-.5,.5").unwrap();
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert!(d.approx_eq(Vec2::new(-s, s), 1e-6));
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        assert!(malformed("1.5,0.2"));
        assert!(malformed("0.2,-3"));
        // The last pair decides, even when an earlier one was valid
        assert!(malformed("0.5,0.5 then 2,2"));
    }

    #[test]
    fn test_zero_is_rejected() {
        assert!(malformed("0,0"));
        assert!(malformed("0.0, -0.0"));
    }

    #[test]
    fn test_no_pair() {
        assert!(malformed(""));
        assert!(malformed("I would move right"));
        assert!(malformed("0.5 0.5"));
        assert!(malformed("0.5;0.5"));
    }

    #[test]
    fn test_huge_number_is_rejected() {
        let huge = format!("{},0.1", "9".repeat(60));
        assert!(malformed(&huge));
    }

    #[test]
    fn test_pairs_do_not_overlap() {
        assert_eq!(last_pair("1,0,0.5"), Some(("1", "0")));
        assert_eq!(last_pair("a 0.1,0.2 b 0.3,\n 0.4."), Some(("0.3", "0.4")));
    }
}
