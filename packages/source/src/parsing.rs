//! Cell decoding and typed value parsing shared by the loader.
//!
//! Every parser returns `Ok(None)` for an empty cell and `Err(raw)` for a
//! non-empty cell that cannot be interpreted, leaving it to the caller to
//! attach the row and column to the error.

/// Decodes a raw cell as UTF-8, falling back to ISO-8859-1.
///
/// ISO-8859-1 maps every byte to the code point of the same value, so
/// decoding can never fail and no byte is lost.
#[must_use]
pub fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().copied().map(char::from).collect(),
    }
}

/// Returns the trimmed cell text, or `None` if it is blank.
#[must_use]
pub fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Parses a floating-point cell. `NaN` (any case) counts as missing.
///
/// # Errors
///
/// Returns the offending text if the cell is not a number or is infinite.
pub fn parse_float(raw: &str) -> Result<Option<f64>, String> {
    let Some(text) = non_empty(raw) else {
        return Ok(None);
    };
    if text.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(text.to_owned()),
    }
}

/// Parses an integer cell. Float spellings with no fractional part
/// (`"2001.0"`) are accepted, since spreadsheet exports often write them.
///
/// # Errors
///
/// Returns the offending text if the cell is not an integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn parse_int(raw: &str) -> Result<Option<i64>, String> {
    let Some(text) = non_empty(raw) else {
        return Ok(None);
    };
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Some(value));
    }
    match text.parse::<f64>() {
        Ok(value)
            if value.is_finite()
                && value.fract() == 0.0
                && value >= i64::MIN as f64
                && value <= i64::MAX as f64 =>
        {
            Ok(Some(value as i64))
        }
        _ => Err(text.to_owned()),
    }
}
