//! Primary store: the durable record of rooms, memberships and messages.
//!
//! Every function takes an executor so the orchestrator can run several of them
//! inside one transaction.

pub mod memberships;
pub mod messages;
pub mod outbox;
pub mod rooms;
