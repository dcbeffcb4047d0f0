//! # Invoice Numbering
//!
//! Human-facing invoice numbers of the form `INV-<year>-<sequence>`, e.g.
//! `INV-2025-0007`. The sequence restarts at 1 every calendar year (UTC).
//!
//! ## Where The Counter Lives
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NumberSequence (this module)     InvoiceSequenceRepository (db)        │
//! │  ───────────────────────────      ──────────────────────────────        │
//! │  in-process (year, last)          one row per (tenant, year)            │
//! │  single owner, &mut self          atomic UPSERT ... RETURNING           │
//! │  used by tests, previews,         used when invoices are created,       │
//! │  offline tools                    safe across connections/processes     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both share [`InvoiceNumber`] for formatting and parsing, so they can never
//! disagree about what a number looks like.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Prefix of every generated invoice number.
pub const INVOICE_PREFIX: &str = "INV";

// =============================================================================
// Invoice Number
// =============================================================================

/// A parsed `INV-YYYY-NNNN` number.
///
/// The sequence is zero-padded to four digits and simply grows wider past
/// 9999 (`INV-2025-10000`); it is never truncated.
///
/// ## Example
/// ```rust
/// use billbook_core::numbering::InvoiceNumber;
///
/// let n = InvoiceNumber::new(2025, 7);
/// assert_eq!(n.to_string(), "INV-2025-0007");
/// assert_eq!("INV-2025-0007".parse::<InvoiceNumber>().unwrap(), n);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvoiceNumber {
    pub year: i32,
    pub sequence: u32,
}

impl InvoiceNumber {
    pub const fn new(year: i32, sequence: u32) -> Self {
        InvoiceNumber { year, sequence }
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}-{:04}", INVOICE_PREFIX, self.year, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "number".to_string(),
            reason: format!("expected {INVOICE_PREFIX}-YYYY-NNNN, got '{s}'"),
        };

        let mut parts = s.trim().splitn(3, '-');
        let (prefix, year, sequence) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(y), Some(n)) => (p, y, n),
            _ => return Err(invalid()),
        };

        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if prefix != INVOICE_PREFIX || year.len() != 4 || !all_digits(year) || sequence.len() < 4 || !all_digits(sequence) {
            return Err(invalid());
        }

        Ok(InvoiceNumber {
            year: year.parse().map_err(|_| invalid())?,
            sequence: sequence.parse().map_err(|_| invalid())?,
        })
    }
}

// =============================================================================
// In-Process Sequence
// =============================================================================

/// Year-scoped counter owned by a single writer.
///
/// Concurrent callers must wrap it in a lock; storage-backed callers use the
/// database sequence instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberSequence {
    last_year: Option<i32>,
    last_sequence: u32,
}

impl NumberSequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_for(&self, year: i32) -> u32 {
        match self.last_year {
            Some(y) if y == year => self.last_sequence.saturating_add(1),
            _ => 1,
        }
    }

    /// Issues the next number for the year of `now`, restarting at 1 on a new year.
    pub fn generate(&mut self, now: DateTime<Utc>) -> InvoiceNumber {
        let year = now.year();
        let sequence = self.next_for(year);

        self.last_year = Some(year);
        self.last_sequence = sequence;

        InvoiceNumber { year, sequence }
    }

    /// The number [`generate`](Self::generate) would return, without consuming it.
    pub fn preview_next(&self, now: DateTime<Utc>) -> InvoiceNumber {
        let year = now.year();
        InvoiceNumber {
            year,
            sequence: self.next_for(year),
        }
    }

    /// The last issued sequence value (0 when nothing was issued).
    pub fn current_sequence(&self) -> u32 {
        self.last_sequence
    }

    /// Makes `next` the sequence of the next number generated in `year`.
    pub fn set_sequence(&mut self, year: i32, next: u32) {
        self.last_year = Some(year);
        self.last_sequence = next.saturating_sub(1);
    }

    /// Accounts for a number issued elsewhere (e.g. restored from a backup)
    /// so the counter never hands it out again.
    pub fn observe(&mut self, number: InvoiceNumber) {
        match self.last_year {
            Some(y) if y == number.year => {
                self.last_sequence = self.last_sequence.max(number.sequence);
            }
            Some(y) if y > number.year => {}
            _ => {
                self.last_year = Some(number.year);
                self.last_sequence = number.sequence;
            }
        }
    }

    /// Forgets all state; the next number is `...-0001`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
