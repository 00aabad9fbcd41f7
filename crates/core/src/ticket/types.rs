//! Core ticket data types and the step/status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a persisted or user-supplied state value is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStateError {
    kind: &'static str,
    value: String,
}

impl ParseStateError {
    fn new(kind: &'static str, value: impl fmt::Display) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Step / Status
// ============================================================================

/// Teller step a ticket is at. Serialized as the integer `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Step {
    One,
    Two,
}

impl Step {
    pub fn as_u8(self) -> u8 {
        match self {
            Step::One => 1,
            Step::Two => 2,
        }
    }

    pub const ALL: [Step; 2] = [Step::One, Step::Two];
}

impl TryFrom<u8> for Step {
    type Error = ParseStateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Step::One),
            2 => Ok(Step::Two),
            other => Err(ParseStateError::new("step", other)),
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.as_u8()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Ticket status within its current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Waiting,
    Serving,
    NoShow,
    Done,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Waiting => "waiting",
            Status::Serving => "serving",
            Status::NoShow => "no_show",
            Status::Done => "done",
        }
    }
}

impl FromStr for Status {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Status::Waiting),
            "serving" => Ok(Status::Serving),
            "no_show" => Ok(Status::NoShow),
            "done" => Ok(Status::Done),
            other => Err(ParseStateError::new("status", other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Something a teller (or the queue selector) does to a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketEvent {
    /// Queue selector binds a waiting ticket to a teller.
    Claim,
    /// Teller finishes the step.
    Complete,
    /// Teller marks the client absent.
    NoShow,
    /// Teller recovers a no-show ticket by number.
    Override,
}

impl TicketEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketEvent::Claim => "claim",
            TicketEvent::Complete => "complete",
            TicketEvent::NoShow => "no_show",
            TicketEvent::Override => "override",
        }
    }
}

impl fmt::Display for TicketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw `(step, status)` pair as it appears on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateParts {
    pub step: Step,
    pub status: Status,
}

/// A valid `(step, status)` combination.
///
/// ```text
///  (1, waiting) --claim--> (1, serving) --complete--> (2, waiting) --claim--> (2, serving)
///                              |                          ^                      |    |
///                           no_show                       |                no_show    complete
///                              v                          |                      v    v
///                         (1, no_show) ----override-------+            (2, no_show)-->(2, done)
///                                                                               override
/// ```
///
/// `(2, done)` is terminal. `(1, done)` does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StateParts", into = "StateParts")]
pub struct TicketState {
    step: Step,
    status: Status,
}

impl TicketState {
    /// Every state a persisted ticket may be in.
    pub const ALL: [TicketState; 7] = [
        TicketState::at(Step::One, Status::Waiting),
        TicketState::at(Step::One, Status::Serving),
        TicketState::at(Step::One, Status::NoShow),
        TicketState::at(Step::Two, Status::Waiting),
        TicketState::at(Step::Two, Status::Serving),
        TicketState::at(Step::Two, Status::NoShow),
        TicketState::at(Step::Two, Status::Done),
    ];

    const fn at(step: Step, status: Status) -> Self {
        Self { step, status }
    }

    /// State of a freshly issued ticket.
    pub const fn initial() -> Self {
        Self::at(Step::One, Status::Waiting)
    }

    /// Build a state, rejecting combinations that can never be persisted.
    pub fn new(step: Step, status: Status) -> Option<Self> {
        match (step, status) {
            (Step::One, Status::Done) => None,
            _ => Some(Self::at(step, status)),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.status == Status::Done
    }

    /// Returns true if the normal queue pull may pick this ticket.
    pub fn is_selectable(&self) -> bool {
        self.status == Status::Waiting
    }

    /// Apply an event. Returns `None` for any edge outside the transition table.
    pub fn apply(self, event: TicketEvent) -> Option<TicketState> {
        use Status::*;

        let next = match (self.step, self.status, event) {
            (step, Waiting, TicketEvent::Claim) => Self::at(step, Serving),
            (Step::One, Serving, TicketEvent::Complete) => Self::at(Step::Two, Waiting),
            (Step::Two, Serving, TicketEvent::Complete) => Self::at(Step::Two, Done),
            (step, Serving, TicketEvent::NoShow) => Self::at(step, NoShow),
            (Step::One, NoShow, TicketEvent::Override) => Self::at(Step::Two, Waiting),
            (Step::Two, NoShow, TicketEvent::Override) => Self::at(Step::Two, Done),
            _ => return None,
        };
        Some(next)
    }
}

impl TryFrom<StateParts> for TicketState {
    type Error = ParseStateError;

    fn try_from(parts: StateParts) -> Result<Self, Self::Error> {
        TicketState::new(parts.step, parts.status).ok_or_else(|| {
            ParseStateError::new("state", format!("({}, {})", parts.step, parts.status))
        })
    }
}

impl From<TicketState> for StateParts {
    fn from(state: TicketState) -> Self {
        StateParts {
            step: state.step,
            status: state.status,
        }
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.step, self.status)
    }
}

// ============================================================================
// Priority lanes
// ============================================================================

/// Which lane a teller is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    Priority,
    Regular,
}

impl PriorityClass {
    pub fn from_flag(is_priority: bool) -> Self {
        if is_priority {
            PriorityClass::Priority
        } else {
            PriorityClass::Regular
        }
    }

    pub fn is_priority(self) -> bool {
        self == PriorityClass::Priority
    }

    /// Letter shown before the number on the board.
    pub fn prefix(self) -> char {
        match self {
            PriorityClass::Priority => 'P',
            PriorityClass::Regular => 'R',
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'P' => Some(PriorityClass::Priority),
            'R' => Some(PriorityClass::Regular),
            _ => None,
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Format a ticket number as shown to clients, e.g. `P0007`.
pub fn display_code(is_priority: bool, number: u32) -> String {
    format!("{}{:04}", PriorityClass::from_flag(is_priority).prefix(), number)
}

/// A numbered queue ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Store-assigned identifier, increasing in creation order.
    pub id: i64,

    /// Number within the ticket's sequence partition.
    pub number: u32,

    /// Transaction type chosen at intake. Never changes.
    pub transaction_type: i64,

    pub is_priority: bool,

    /// Current `(step, status)`.
    #[serde(flatten)]
    pub state: TicketState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_by_step1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_by_step2: Option<String>,

    /// Transaction type assigned by the step-1 teller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<i64>,

    /// Notes left at step 1 for the step-2 teller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_step1: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_step1: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_step2: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_step2: Option<DateTime<Utc>>,

    /// Issuing day of the number's partition; empty when numbering never resets.
    #[serde(default)]
    pub sequence_day: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn step(&self) -> Step {
        self.state.step()
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    pub fn lane(&self) -> PriorityClass {
        PriorityClass::from_flag(self.is_priority)
    }

    pub fn display_code(&self) -> String {
        display_code(self.is_priority, self.number)
    }

    /// Transaction type the ticket is queued under at step 2.
    pub fn effective_transaction_type(&self) -> i64 {
        self.classification.unwrap_or(self.transaction_type)
    }

    /// Teller recorded for the given step, if any.
    pub fn served_by(&self, step: Step) -> Option<&str> {
        match step {
            Step::One => self.served_by_step1.as_deref(),
            Step::Two => self.served_by_step2.as_deref(),
        }
    }

    /// Seconds between the start and end of a step, when both are known.
    pub fn service_secs(&self, step: Step) -> Option<f64> {
        let (start, end) = match step {
            Step::One => (self.started_at_step1, self.finished_at_step1),
            Step::Two => (self.started_at_step2, self.finished_at_step2),
        };
        let millis = (end? - start?).num_milliseconds();
        Some(millis as f64 / 1000.0)
    }
}
