mod connection;
mod service;

pub use connection::{ConnectionSession, Occupant, SessionPhase};
pub use service::{ChatService, ENTER_GREETING, LEAVE_FAREWELL};
