//! Core type definitions with validation.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Strict `YYYY-MM-DD` shape; chrono alone accepts single-digit months and days.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A mode number outside the known machine states.
    #[error("invalid mode: {value}. Valid modes are [1, 2, 3, 4, 5]")]
    InvalidMode { value: i64 },

    /// A log identifier that is not a non-negative integer.
    #[error("invalid {field} format: {value}")]
    InvalidLogId { field: &'static str, value: String },

    /// A date string that is not `YYYY-MM-DD`.
    #[error("invalid date format: {value}. Use YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Parses a calendar date in strict `YYYY-MM-DD` form.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::InvalidDate {
        value: value.to_string(),
    };
    if !DATE_RE.is_match(value) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

/// Machine operating state reported with every log entry.
///
/// This is the only mode-to-label table in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Mode {
    /// Production time.
    Sewing,
    /// Machine on, nothing happening.
    Idle,
    /// Waiting for material.
    NoFeeding,
    Meeting,
    Maintenance,
}

impl Mode {
    pub const ALL: [Self; 5] = [
        Self::Sewing,
        Self::Idle,
        Self::NoFeeding,
        Self::Meeting,
        Self::Maintenance,
    ];

    /// Wire value sent by the devices.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Sewing => 1,
            Self::Idle => 2,
            Self::NoFeeding => 3,
            Self::Meeting => 4,
            Self::Maintenance => 5,
        }
    }

    /// Display label used in log listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sewing => "Sewing",
            Self::Idle => "Idle",
            Self::NoFeeding => "No feeding",
            Self::Meeting => "Meeting",
            Self::Maintenance => "Maintenance",
        }
    }

    /// Modes that count towards non-productive time when logged.
    #[must_use]
    pub const fn is_stoppage(self) -> bool {
        matches!(self, Self::NoFeeding | Self::Meeting | Self::Maintenance)
    }
}

impl TryFrom<i64> for Mode {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.code() == value)
            .ok_or(ValidationError::InvalidMode { value })
    }
}

impl From<Mode> for i64 {
    fn from(mode: Mode) -> Self {
        mode.code()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Identifier of a sewing machine.
    MachineId, "machine ID"
);

define_string_id!(
    /// Production line number, kept as text as the devices send it.
    LineNumber, "line number"
);

define_string_id!(
    /// Operator RFID card number.
    ///
    /// `"0"` is what a machine reports when nobody is logged in; see
    /// [`OperatorId::is_unassigned`].
    OperatorId, "operator ID"
);

impl OperatorId {
    /// Whether this is the placeholder sent when no card is present.
    pub fn is_unassigned(&self) -> bool {
        self.0 == "0"
    }
}
