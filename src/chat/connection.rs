use uuid::Uuid;

use crate::error::{ChatError, ChatResult};

/// Who a connection speaks as, once it entered a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub email: String,
    pub room_code: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Socket is up but nothing was entered yet.
    Joining,
    Active(Occupant),
    /// Left the room; identity is kept for the rest of the connection.
    Leaving(Occupant),
    Disconnected,
}

/// State of one socket connection. Owned by that connection's task.
#[derive(Debug)]
pub struct ConnectionSession {
    id: Uuid,
    phase: SessionPhase,
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            phase: SessionPhase::Joining,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn occupant(&self) -> Option<&Occupant> {
        match &self.phase {
            SessionPhase::Active(occupant) | SessionPhase::Leaving(occupant) => Some(occupant),
            SessionPhase::Joining | SessionPhase::Disconnected => None,
        }
    }

    /// Room whose broadcasts this connection should see.
    pub fn room_code(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Active(occupant) => Some(&occupant.room_code),
            _ => None,
        }
    }

    pub(crate) fn attach(&mut self, occupant: Occupant) -> ChatResult<()> {
        if self.phase == SessionPhase::Disconnected {
            return Err(ChatError::SessionAttach);
        }
        self.phase = SessionPhase::Active(occupant);
        Ok(())
    }

    pub(crate) fn mark_leaving(&mut self) {
        if let SessionPhase::Active(occupant) = &self.phase {
            self.phase = SessionPhase::Leaving(occupant.clone());
        }
    }

    pub fn disconnect(&mut self) {
        self.phase = SessionPhase::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> Occupant {
        Occupant {
            email: "a@x.com".to_owned(),
            room_code: "C1".to_owned(),
            nickname: "Ann".to_owned(),
        }
    }

    #[test]
    fn walks_through_phases() {
        let mut session = ConnectionSession::new();
        assert_eq!(session.phase(), &SessionPhase::Joining);
        assert!(session.occupant().is_none());

        session.attach(ann()).unwrap();
        assert_eq!(session.room_code(), Some("C1"));

        session.mark_leaving();
        assert_eq!(session.phase(), &SessionPhase::Leaving(ann()));
        assert_eq!(session.occupant(), Some(&ann()));
        assert_eq!(session.room_code(), None);

        session.disconnect();
        assert!(session.occupant().is_none());
    }

    #[test]
    fn disconnected_session_refuses_attach() {
        let mut session = ConnectionSession::new();
        session.disconnect();

        let err = session.attach(ann()).unwrap_err();
        assert!(matches!(err, ChatError::SessionAttach));
    }

    #[test]
    fn leaving_before_entering_is_a_no_op() {
        let mut session = ConnectionSession::new();
        session.mark_leaving();
        assert_eq!(session.phase(), &SessionPhase::Joining);
    }
}
