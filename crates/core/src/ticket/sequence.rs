//! Ticket numbering.
//!
//! A ticket number is `max(number) + 1` within its partition. The partition is
//! the transaction type, narrowed by lane and issuing day depending on the
//! configured [`SequencePolicy`] and [`SequenceReset`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::PriorityClass;

/// Whether priority and regular tickets of one transaction type share a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePolicy {
    /// One counter per transaction type. `P0003` and `R0003` never both exist.
    Shared,
    /// Separate counters per lane. `P0001` and `R0001` can coexist.
    PerLane,
}

/// Numbers are shared across lanes; the `P`/`R` prefix is presentation only.
pub const DEFAULT_SEQUENCE_POLICY: SequencePolicy = SequencePolicy::Shared;

/// When counters start again from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceReset {
    /// Every local calendar day.
    Daily,
    /// Never; numbers grow for the lifetime of the database.
    Never,
}

pub const DEFAULT_SEQUENCE_RESET: SequenceReset = SequenceReset::Daily;

/// Lane key stored for tickets numbered under [`SequencePolicy::Shared`].
const SHARED_LANE: &str = "*";

/// Numbering rules in effect for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbering {
    pub policy: SequencePolicy,
    pub reset: SequenceReset,
}

impl Default for Numbering {
    fn default() -> Self {
        Self {
            policy: DEFAULT_SEQUENCE_POLICY,
            reset: DEFAULT_SEQUENCE_RESET,
        }
    }
}

impl Numbering {
    pub fn new(policy: SequencePolicy, reset: SequenceReset) -> Self {
        Self { policy, reset }
    }

    /// Partition a new ticket is numbered in.
    pub fn partition(&self, is_priority: bool, today: NaiveDate) -> SequencePartition {
        let lane = match self.policy {
            SequencePolicy::Shared => SHARED_LANE.to_string(),
            SequencePolicy::PerLane => PriorityClass::from_flag(is_priority).prefix().to_string(),
        };
        SequencePartition {
            lane,
            day: self.day_key(today),
        }
    }

    /// Day component of the partition; empty when counters never reset.
    pub fn day_key(&self, today: NaiveDate) -> String {
        match self.reset {
            SequenceReset::Daily => today.format("%Y-%m-%d").to_string(),
            SequenceReset::Never => String::new(),
        }
    }

    pub fn is_per_lane(&self) -> bool {
        self.policy == SequencePolicy::PerLane
    }
}

/// Lane and day part of a sequence partition (the transaction type is the third part).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePartition {
    pub lane: String,
    pub day: String,
}

/// A ticket number typed by a teller, e.g. `"12"`, `"0012"` or `"P0012"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketNumberInput {
    /// Lane given by the prefix, if one was typed.
    pub lane: Option<PriorityClass>,
    pub number: u32,
}

static TICKET_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([PpRr])?\s*0*([0-9]{1,9})$").expect("ticket number pattern is valid")
});

impl TicketNumberInput {
    /// Parse teller input. Returns a human-readable message on malformed input.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        let caps = TICKET_NUMBER
            .captures(trimmed)
            .ok_or_else(|| format!("'{}' is not a ticket number", trimmed))?;

        let lane = caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(PriorityClass::from_prefix);

        let number: u32 = caps[2]
            .parse()
            .map_err(|_| format!("'{}' is not a ticket number", trimmed))?;
        if number == 0 {
            return Err("ticket numbers start at 1".to_string());
        }

        Ok(Self { lane, number })
    }
}
