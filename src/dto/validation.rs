//! Validation helpers for DTOs.

use time::{Date, format_description::well_known::Iso8601};
use validator::ValidationError;

use crate::services::scoring::Score;

/// Validates that a tournament date is a calendar date in `YYYY-MM-DD` form.
///
/// # Examples
///
/// ```ignore
/// validate_tournament_date("2026-05-02") // Ok
/// validate_tournament_date("2026-02-30") // Err - no such day
/// validate_tournament_date("02/05/2026") // Err - wrong format
/// ```
pub fn validate_tournament_date(value: &str) -> Result<(), ValidationError> {
    if value.len() != 10 || Date::parse(value, &Iso8601::DATE).is_err() {
        let mut err = ValidationError::new("tournament_date");
        err.message = Some(format!("`{value}` is not a YYYY-MM-DD calendar date").into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a score looks like `games1-games2`, using the same parser as scoring.
pub fn validate_score(value: &str) -> Result<(), ValidationError> {
    if value.parse::<Score>().is_err() {
        let mut err = ValidationError::new("score_format");
        err.message = Some(format!("`{value}` is not of the form games1-games2").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tournament_date_valid() {
        assert!(validate_tournament_date("2026-05-02").is_ok());
        assert!(validate_tournament_date("2024-02-29").is_ok());
    }

    #[test]
    fn test_validate_tournament_date_invalid() {
        assert!(validate_tournament_date("2026-02-30").is_err()); // no such day
        assert!(validate_tournament_date("02/05/2026").is_err()); // wrong separators
        assert!(validate_tournament_date("2026-5-2").is_err()); // missing padding
        assert!(validate_tournament_date("").is_err()); // empty
    }

    #[test]
    fn test_validate_score() {
        assert!(validate_score("6-4").is_ok());
        assert!(validate_score(" 7 - 6 ").is_ok());
        assert!(validate_score("6:4").is_err()); // wrong separator
        assert!(validate_score("six-four").is_err()); // not numeric
    }

    #[test]
    fn test_validate_score_agrees_with_scoring() {
        for value in ["6-4", "0-0", "6-", "-4", "6-4-2", "-1-3", "", "10 - 12"] {
            assert_eq!(
                validate_score(value).is_ok(),
                value.parse::<Score>().is_ok(),
                "{value:?}"
            );
        }
    }
}
