use crate::error::ApiError;

/// Inclusive row range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub from: i64,
    pub to: i64,
}

impl Range {
    /// `limit` is clamped to `1..=max_limit` so the range is never empty or inverted.
    /// An offset whose range end does not fit in an `i64` is a 400.
    pub fn from_offset_limit(offset: i64, limit: i64, max_limit: i64) -> Result<Self, ApiError> {
        let from = offset.max(0);
        if limit > max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max_limit);
        }
        let limit = limit.clamp(1, max_limit.max(1));
        let to = from
            .checked_add(limit - 1)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid 'offset' parameter '{}', out of range", offset)))?;
        Ok(Self { from, to })
    }

    pub fn len(&self) -> i64 {
        self.to.saturating_sub(self.from).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }
}

/// Parses a non-negative integer query parameter. Absent or blank input
/// falls back to `default`; anything else that is not a number is rejected.
pub fn parse_param(name: &str, raw: Option<&str>, default: i64) -> Result<i64, ApiError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };
    match raw.parse::<i64>() {
        Ok(value) if value >= 0 => Ok(value),
        _ => Err(ApiError::bad_request(format!(
            "Invalid '{}' parameter '{}', expected a non-negative integer",
            name, raw
        ))),
    }
}
