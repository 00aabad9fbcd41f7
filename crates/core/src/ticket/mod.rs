//! Queue tickets: the step/status state machine, numbering and storage.

mod sequence;
mod sqlite_store;
mod store;
mod types;

pub use sequence::{
    Numbering, SequencePartition, SequencePolicy, SequenceReset, TicketNumberInput,
    DEFAULT_SEQUENCE_POLICY, DEFAULT_SEQUENCE_RESET,
};
pub use sqlite_store::SqliteTicketStore;
pub use store::{
    BoardRows, CreateTicketRequest, NumberLookup, QueueQuery, QueueStats, StateCount, StepNotes,
    TicketError, TicketFilter, TicketStore,
};
pub use types::{
    display_code, ParseStateError, PriorityClass, StateParts, Status, Step, Ticket, TicketEvent,
    TicketState,
};
