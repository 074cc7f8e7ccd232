//! Parsing helpers for selector text

use crate::CoreError;

/// Parse a signed index, allowing surrounding whitespace
pub fn parse_isize(text: &str) -> Result<isize, CoreError> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() {
        return Err(CoreError::InvalidSelector);
    }

    let mut result: isize = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            return Err(CoreError::InvalidSelector);
        }
        let digit = (byte - b'0') as isize;
        result = result
            .checked_mul(10)
            .and_then(|r| r.checked_add(digit))
            .ok_or(CoreError::ArraySizeOverflow)?;
    }

    Ok(if negative { -result } else { result })
}
