//! Public record codes and claim tickets.
//!
//! Every record carries a human-facing code. A root record's code is its
//! bare base (`INC2024001234`); a claim contests a closed record and
//! reuses the base with a two-digit ticket suffix (`INC2024001234-03`).
//! The first claim in a family always takes ticket `02`, so the root
//! reads as the implicit `01`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Ticket assigned to the first claim of a record family.
pub const FIRST_CLAIM_TICKET: u32 = 2;

/// A public record code: a normalized base plus an optional claim ticket.
///
/// The wire form is the base alone, or `{base}-{NN}` with the ticket
/// zero-padded to two digits. Base codes are uppercased on construction
/// and must not themselves end in a ticket-shaped segment, which keeps
/// parsing unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordCode {
    base: String,
    ticket: Option<u32>,
}

impl RecordCode {
    /// Creates a root record code from its base.
    ///
    /// The base is trimmed and uppercased. It must be non-empty, contain
    /// no whitespace, and must not end in a two-digit segment (that tail
    /// is reserved for claim tickets).
    pub fn new(base: impl AsRef<str>) -> Result<Self> {
        let base = normalize_base(base.as_ref())?;
        Ok(Self { base, ticket: None })
    }

    /// Returns this code's base with the given claim ticket attached.
    ///
    /// Tickets below [`FIRST_CLAIM_TICKET`] are never produced by the
    /// lifecycle; derive them with [`RecordCode::next_ticket`].
    #[must_use]
    pub fn with_ticket(&self, ticket: u32) -> Self {
        Self {
            base: self.base.clone(),
            ticket: Some(ticket),
        }
    }

    /// Computes the ticket for the next claim given the family's current
    /// claim count.
    ///
    /// The first claim takes ticket `02` regardless of the stored count;
    /// afterwards the count advances by one.
    #[must_use]
    pub const fn next_ticket(claims_number: u32) -> u32 {
        if claims_number < FIRST_CLAIM_TICKET {
            FIRST_CLAIM_TICKET
        } else {
            claims_number + 1
        }
    }

    /// Returns the base shared by every record in this family.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the claim ticket, if this is a claim code.
    #[must_use]
    pub const fn ticket(&self) -> Option<u32> {
        self.ticket
    }

    /// Returns true if this code carries a claim ticket.
    #[must_use]
    pub const fn is_claim(&self) -> bool {
        self.ticket.is_some()
    }

    /// Returns the root code of this family (the base without a ticket).
    #[must_use]
    pub fn family_root(&self) -> Self {
        Self {
            base: self.base.clone(),
            ticket: None,
        }
    }
}

fn normalize_base(raw: &str) -> Result<String> {
    let base = raw.trim().to_ascii_uppercase();
    if base.is_empty() {
        return Err(Error::validation("record code must not be empty"));
    }
    if base.chars().any(char::is_whitespace) {
        return Err(Error::validation(format!(
            "record code '{base}' must not contain whitespace"
        )));
    }
    if let Some((_, tail)) = base.rsplit_once('-') {
        if is_ticket_segment(tail) {
            return Err(Error::validation(format!(
                "record code '{base}' ends in a ticket-shaped segment"
            )));
        }
    }
    Ok(base)
}

fn is_ticket_segment(segment: &str) -> bool {
    segment.len() == 2 && segment.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for RecordCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ticket {
            Some(ticket) => write!(f, "{}-{ticket:02}", self.base),
            None => write!(f, "{}", self.base),
        }
    }
}

impl FromStr for RecordCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some((head, tail)) = trimmed.rsplit_once('-') {
            if is_ticket_segment(tail) {
                let ticket: u32 = tail
                    .parse()
                    .map_err(|_| Error::validation(format!("invalid claim ticket in '{s}'")))?;
                if ticket < FIRST_CLAIM_TICKET {
                    return Err(Error::validation(format!(
                        "claim ticket in '{s}' is below the first ticket {FIRST_CLAIM_TICKET:02}"
                    )));
                }
                let base = normalize_base(head)?;
                return Ok(Self {
                    base,
                    ticket: Some(ticket),
                });
            }
        }
        Self::new(trimmed)
    }
}

impl Serialize for RecordCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}
