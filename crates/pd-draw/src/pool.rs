//! Draw Pool Manager
//!
//! The live set of eligible tickets that have not won yet. The pool only
//! ever shrinks; a commit is validated in full before anything is removed.

use std::collections::{BTreeSet, HashSet};

use pd_core::{DrawError, DrawResult, TicketNumber};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawPool {
    tickets: BTreeSet<TicketNumber>,
}

impl DrawPool {
    pub fn initialize<I>(eligible: I) -> Self
    where
        I: IntoIterator<Item = TicketNumber>,
    {
        Self {
            tickets: eligible.into_iter().collect(),
        }
    }

    /// Tickets still drawable, in ticket order
    pub fn current_pool(&self) -> Vec<TicketNumber> {
        self.tickets.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn contains(&self, ticket: &TicketNumber) -> bool {
        self.tickets.contains(ticket)
    }

    /// Remove winners from the pool.
    ///
    /// Every ticket must be in the pool and appear once in `winners`;
    /// otherwise nothing is removed and `PoolConsistency` is returned.
    pub fn commit_winners(&mut self, winners: &[TicketNumber]) -> DrawResult<()> {
        let mut seen = HashSet::with_capacity(winners.len());
        for ticket in winners {
            if !self.tickets.contains(ticket) || !seen.insert(ticket) {
                log::error!("Refusing commit: ticket {} is not drawable", ticket);
                return Err(DrawError::PoolConsistency(ticket.to_string()));
            }
        }

        for ticket in winners {
            self.tickets.remove(ticket);
        }
        log::debug!(
            "Committed {} winners, {} remain in pool",
            winners.len(),
            self.tickets.len()
        );
        Ok(())
    }
}
