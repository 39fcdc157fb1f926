//! Common type definitions.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, BillId, etc.)
//! - The resource/operation pair used for authorization errors
//! - [`closed_enum!`], which generates the status and classification enums used throughout the API
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases. Human readable identifiers (`BIL-001`,
//! `PYM-001`, `TKT-001`) are separate string columns, see [`crate::db::models::sequences`].
//!
//! # Closed enumerations
//!
//! Every status field is a closed enumeration. Parsing is case-insensitive and accepts `-` or
//! a space in place of `_`, so `"in review"`, `"In-Review"` and `"IN_REVIEW"` are the same
//! value. Serialization always uses the canonical upper-case spelling, which is also the
//! Postgres enum label.

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type BillId = Uuid;
pub type PaymentId = Uuid;
pub type PermitId = Uuid;
pub type TicketId = Uuid;
pub type ScheduleId = Uuid;
pub type NotificationId = Uuid;
pub type AdminLogId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Bills,
    Payments,
    Ledger,
    Permits,
    Tickets,
    Schedules,
    Notifications,
    AdminLogs,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Bills => "bills",
            Resource::Payments => "payments",
            Resource::Ledger => "ledger",
            Resource::Permits => "permits",
            Resource::Tickets => "service requests",
            Resource::Schedules => "service schedules",
            Resource::Notifications => "notifications",
            Resource::AdminLogs => "admin logs",
        };
        f.write_str(name)
    }
}

/// Normalize user supplied enum text: trim, upper-case, and map `-`/space to `_`.
pub fn normalize_enum_text(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Declare a closed enumeration that is stored as a Postgres enum, serialized in its canonical
/// spelling, and parsed leniently from JSON and query strings.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $pg_type:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, sqlx::Type, utoipa::ToSchema)]
        #[sqlx(type_name = $pg_type)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                #[sqlx(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match $crate::types::normalize_enum_text(s).as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "invalid {} '{}', expected one of: {}",
                        $pg_type.replace('_', " "),
                        s,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use closed_enum;

#[cfg(test)]
mod tests {
    use super::*;

    closed_enum! {
        pub enum Light as "traffic_light" {
            Red => "RED",
            AmberFlashing => "AMBER_FLASHING",
        }
    }

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_closed_enum_parsing_is_lenient() {
        assert_eq!("red".parse::<Light>().unwrap(), Light::Red);
        assert_eq!(" Amber-Flashing ".parse::<Light>().unwrap(), Light::AmberFlashing);
        assert_eq!("amber flashing".parse::<Light>().unwrap(), Light::AmberFlashing);
    }

    #[test]
    fn test_closed_enum_rejects_unknown_values() {
        let err = "green".parse::<Light>().unwrap_err();
        assert!(err.contains("traffic light"));
        assert!(err.contains("RED, AMBER_FLASHING"));
    }

    #[test]
    fn test_closed_enum_serde() {
        let parsed: Light = serde_json::from_str("\"amber_flashing\"").unwrap();
        assert_eq!(parsed, Light::AmberFlashing);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"AMBER_FLASHING\"");
        assert!(serde_json::from_str::<Light>("\"blue\"").is_err());
        assert_eq!(Light::ALL.len(), 2);
    }
}
