pub mod auth;
pub mod bus;
pub mod driver;
pub mod flight;
pub mod route;
pub mod station;
pub mod ticket;
pub mod user;

use std::borrow::Cow;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

// Re-export all the models that are used in other modules
pub use auth::{AuthResponse, LoginRequest, RegisterRequest};
pub use bus::{Bus, BusInput, BusResponse};
pub use driver::{Driver, DriverInput, DriverResponse};
pub use flight::{Flight, FlightInput, FlightResponse};
pub use route::{Route, RouteInput, RouteResponse};
pub use station::{BusStation, StationInput, StationResponse};
pub use ticket::{Sale, Ticket, TicketInput, TicketResponse, TicketUpdate};
pub use user::{assign_role, Claims, Role, User, UserInput, UserResponse, UserUpdate};

/// Rejects empty values and values longer than `max` characters.
pub(crate) fn check_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub(crate) fn check_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<(), AppError> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Related records are accepted either as a bare id or as the hyperlink the
/// API hands out (`.../api/routes/<id>/`), percent-encoded or not.
pub fn related_id(value: &str) -> Cow<'_, str> {
    let segment = value
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub(crate) fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn related_id_accepts_bare_ids_and_urls() {
        assert_eq!(related_id("65f0c0ffee"), "65f0c0ffee");
        assert_eq!(
            related_id("http://localhost:8080/api/routes/65f0c0ffee/"),
            "65f0c0ffee"
        );
        assert_eq!(related_id("/api/buses/E12KX"), "E12KX");
    }

    #[test]
    fn related_id_decodes_percent_encoded_segments() {
        assert_eq!(
            related_id("http://localhost:8080/api/buses/%D0%90101%D0%A2%D0%A3/"),
            "А101ТУ"
        );
        assert_eq!(related_id("А101ТУ"), "А101ТУ");
    }

    #[test]
    fn parse_time_with_and_without_seconds() {
        assert_eq!(parse_time("10:00"), NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(parse_time("22:15:30"), NaiveTime::from_hms_opt(22, 15, 30));
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("noon"), None);
    }

    #[test]
    fn check_text_limits() {
        assert!(check_text("name", "Tula", 50).is_ok());
        assert!(check_text("name", "   ", 50).is_err());
        assert!(check_text("name", &"x".repeat(51), 50).is_err());
        // limits count characters, not bytes
        assert!(check_text("name", &"Ж".repeat(50), 50).is_ok());
    }
}
