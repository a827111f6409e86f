//! Roster loading: column resolution, ticket normalization, eligibility

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use pd_core::{DrawError, Participant, TicketNumber};

use crate::config::{RosterConfig, RosterFormat};
use crate::reader::{Table, parse_delimited, parse_json};

/// Errors that can occur while reading a roster
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Malformed roster: missing column '{missing}' (found: {})", .found.join(", "))]
    MalformedRoster { missing: String, found: Vec<String> },

    #[error("Duplicate ticket {ticket} at line {line} (first seen at line {first_line})")]
    DuplicateTicket {
        ticket: String,
        line: usize,
        first_line: usize,
    },

    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<RosterError> for DrawError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::MalformedRoster { missing, found } => {
                DrawError::MalformedRoster { missing, found }
            }
            other => DrawError::Config(other.to_string()),
        }
    }
}

/// A loaded, classified participant list
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub participants: Vec<Participant>,
    /// Rows dropped for having no ticket
    pub skipped: usize,
    pub source: Option<PathBuf>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn eligible_count(&self) -> usize {
        self.participants.iter().filter(|p| p.eligible).count()
    }

    /// Participants the eligibility rule turned away
    pub fn excluded(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| !p.eligible)
    }

    pub fn into_participants(self) -> Vec<Participant> {
        self.participants
    }
}

/// Reads roster files according to a [`RosterConfig`]
pub struct RosterLoader {
    config: RosterConfig,
}

impl Default for RosterLoader {
    fn default() -> Self {
        Self::new(RosterConfig::default())
    }
}

impl RosterLoader {
    pub fn new(config: RosterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    pub fn load_path(&self, path: &Path) -> Result<Roster, RosterError> {
        let text = fs::read_to_string(path)?;
        let format = match self.config.format {
            RosterFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => RosterFormat::Json,
                Some(ext) if ext.eq_ignore_ascii_case("csv") => RosterFormat::Csv,
                _ => RosterFormat::Auto,
            },
            fixed => fixed,
        };

        let mut roster = self.load_str(&text, format)?;
        log::info!(
            "Loaded {} participants ({} eligible) from {}",
            roster.len(),
            roster.eligible_count(),
            path.display()
        );
        roster.source = Some(path.to_path_buf());
        Ok(roster)
    }

    /// Parse roster text. `Auto` picks JSON when the text opens with `[`.
    pub fn load_str(&self, text: &str, format: RosterFormat) -> Result<Roster, RosterError> {
        self.config.validate()?;
        let format = match format {
            RosterFormat::Auto if text.trim_start_matches('\u{feff}').trim_start().starts_with('[') => {
                RosterFormat::Json
            }
            RosterFormat::Auto => RosterFormat::Csv,
            fixed => fixed,
        };
        let table = match format {
            RosterFormat::Json => parse_json(text)?,
            _ => parse_delimited(text, self.config.delimiter)?,
        };
        self.from_table(table)
    }

    fn from_table(&self, table: Table) -> Result<Roster, RosterError> {
        let config = &self.config;
        let Some(ticket_col) = RosterConfig::find_column(&table.headers, &config.ticket_columns)
        else {
            return Err(RosterError::MalformedRoster {
                missing: config.ticket_columns.first().cloned().unwrap_or_default(),
                found: table.headers,
            });
        };
        let name_col = RosterConfig::find_column(&table.headers, &config.name_columns);
        let contact_col = RosterConfig::find_column(&table.headers, &config.contact_columns);

        let filter = config.filter();
        let mut first_seen: HashMap<TicketNumber, usize> = HashMap::new();
        let mut participants = Vec::with_capacity(table.rows.len());
        let mut skipped = 0;

        for (line, row) in &table.rows {
            let raw = Table::cell(row, Some(ticket_col));
            if raw.is_empty() {
                skipped += 1;
                continue;
            }
            let ticket = match config.ticket_width {
                Some(width) => TicketNumber::padded(raw, width),
                None => TicketNumber::new(raw),
            };
            if let Some(first_line) = first_seen.insert(ticket.clone(), *line) {
                return Err(RosterError::DuplicateTicket {
                    ticket: ticket.to_string(),
                    line: *line,
                    first_line,
                });
            }

            participants.push(Participant::new(
                ticket,
                Table::cell(row, name_col),
                Table::cell(row, contact_col),
                &filter,
            ));
        }

        if skipped > 0 {
            log::warn!("Skipped {} roster rows without a ticket", skipped);
        }
        Ok(Roster {
            participants,
            skipped,
            source: None,
        })
    }
}
