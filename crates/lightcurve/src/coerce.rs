//! Parse-with-default combinators.
//!
//! Every function here is total: a value that is missing, unparseable or
//! non-finite collapses to the supplied default instead of failing.

/// Returns `value` when present and finite, otherwise `default`.
pub fn finite_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

/// Rounds `value` (ties to even) to a non-negative count, otherwise `default`.
pub fn count_or(value: Option<f64>, default: u32) -> u32 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v.round_ties_even() as u32,
        _ => default,
    }
}

/// Parses a token as a finite float, otherwise `default`.
pub fn parse_or(token: &str, default: f64) -> f64 {
    finite_or(token.trim().parse::<f64>().ok(), default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_or() {
        assert_eq!(finite_or(Some(1.5), 0.0), 1.5);
        assert_eq!(finite_or(Some(f64::NAN), 0.0), 0.0);
        assert_eq!(finite_or(Some(f64::NEG_INFINITY), -1.0), -1.0);
        assert_eq!(finite_or(None, 2.0), 2.0);
    }

    #[test]
    fn test_count_or_rounds_half_to_even() {
        assert_eq!(count_or(Some(2.5), 0), 2);
        assert_eq!(count_or(Some(3.5), 0), 4);
        assert_eq!(count_or(Some(4.2), 0), 4);
    }

    #[test]
    fn test_count_or_rejects_invalid() {
        assert_eq!(count_or(Some(-1.0), 0), 0);
        assert_eq!(count_or(Some(f64::INFINITY), 0), 0);
        assert_eq!(count_or(None, 7), 7);
    }

    #[test]
    fn test_parse_or() {
        assert_eq!(parse_or(" 0.25 ", 0.0), 0.25);
        assert_eq!(parse_or("abc", 0.0), 0.0);
        assert_eq!(parse_or("nan", 0.0), 0.0);
        assert_eq!(parse_or("1e-3", 0.0), 1e-3);
    }
}
