//! Participants and ticket numbers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::eligibility::EligibilityFilter;

/// Unique identifier of one draw entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(String);

impl TicketNumber {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    /// Normalize a raw ticket, left-padding all-digit values with zeros.
    ///
    /// Spreadsheets tend to strip leading zeros ("007" comes back as "7"),
    /// so numeric tickets are restored to the event's fixed width. Values
    /// that are not purely ASCII digits are kept as-is.
    pub fn padded(raw: &str, width: usize) -> Self {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Self(format!("{:0>width$}", trimmed, width = width))
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TicketNumber {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A roster entry. Eligibility is decided once, at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub ticket: TicketNumber,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact: String,
    pub eligible: bool,
}

impl Participant {
    pub fn new(
        ticket: TicketNumber,
        name: impl Into<String>,
        contact: impl Into<String>,
        filter: &EligibilityFilter,
    ) -> Self {
        let name = name.into();
        let contact = contact.into();
        let eligible = filter.classify(&name, &contact);
        Self {
            ticket,
            name,
            contact,
            eligible,
        }
    }
}
