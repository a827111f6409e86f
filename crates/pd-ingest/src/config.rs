//! Roster Configuration: TOML-based column mapping and eligibility codes

use serde::{Deserialize, Serialize};

use pd_core::EligibilityFilter;

use crate::roster::RosterError;

/// Input format of a roster file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterFormat {
    /// Decide from the file extension, then from the first character
    #[default]
    Auto,
    Csv,
    Json,
}

/// How to read a roster export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub format: RosterFormat,

    /// Field separator for delimited text
    pub delimiter: char,

    /// Accepted header names for the ticket column, first match wins
    pub ticket_columns: Vec<String>,

    pub name_columns: Vec<String>,

    pub contact_columns: Vec<String>,

    /// Left-pad tickets with zeros to this width. Spreadsheet exports tend to
    /// strip leading zeros from numeric-looking tickets.
    pub ticket_width: Option<usize>,

    /// Exclusion codes matched against name and contact
    pub exclude: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            format: RosterFormat::Auto,
            delimiter: ',',
            ticket_columns: strings(&["Nomor Undian", "ticket", "ticket_number"]),
            name_columns: strings(&["Nama", "name"]),
            contact_columns: strings(&["No HP", "contact", "phone", "email"]),
            ticket_width: None,
            exclude: strings(&["F"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Header comparison key: case-folded with inner whitespace collapsed
pub(crate) fn column_key(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl RosterConfig {
    /// Load from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, RosterError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| RosterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to TOML string
    pub fn to_toml(&self) -> Result<String, RosterError> {
        toml::to_string_pretty(self).map_err(|e| RosterError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), RosterError> {
        if self.ticket_columns.iter().all(|c| c.trim().is_empty()) {
            return Err(RosterError::Config(
                "at least one ticket column name is required".to_string(),
            ));
        }
        if self.delimiter == '"' || self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(RosterError::Config(format!(
                "delimiter {:?} cannot be used",
                self.delimiter
            )));
        }
        if self.ticket_width == Some(0) {
            return Err(RosterError::Config(
                "ticket_width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn filter(&self) -> EligibilityFilter {
        EligibilityFilter::new(&self.exclude)
    }

    /// Index of the first header matching any of `aliases`
    pub(crate) fn find_column(headers: &[String], aliases: &[String]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            let wanted = column_key(alias);
            headers.iter().position(|h| column_key(h) == wanted)
        })
    }
}
