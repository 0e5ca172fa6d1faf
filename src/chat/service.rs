use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, instrument};

use super::{ConnectionSession, Occupant};
use crate::{
    error::ChatResult,
    index::IndexRelay,
    members::MemberDirectory,
    model::{ChatPayload, Member, MessageType, Page, Room, SearchResult},
    store::{memberships, messages, outbox, rooms},
};

pub const ENTER_GREETING: &str = "님 입장!! ο(=•ω＜=)ρ⌒☆";
pub const LEAVE_FAREWELL: &str = "님 퇴장!! ヽ(*。>Д<)o゜";

/// Handles every inbound chat event: resolves room and member, writes the
/// primary store, and hands the search copy to the index relay.
pub struct ChatService {
    db_pool: SqlitePool,
    members: Arc<dyn MemberDirectory>,
    relay: Arc<IndexRelay>,
}

impl ChatService {
    pub fn new(db_pool: SqlitePool, members: Arc<dyn MemberDirectory>, relay: Arc<IndexRelay>) -> Self {
        Self {
            db_pool,
            members,
            relay,
        }
    }

    /// Creates a room owned by `email`.
    #[instrument(skip(self))]
    pub async fn make_room(&self, name: &str, email: &str) -> ChatResult<Room> {
        let member = self.members.find_member_by_email(email).await?;

        let mut tx = self.db_pool.begin().await?;
        let room = rooms::create_room(&mut *tx, name).await?;
        memberships::create_membership(&mut *tx, &room, &member).await?;
        tx.commit().await?;

        info!(code = %room.code, "room made");
        Ok(room)
    }

    /// Adds `email` to an existing room.
    #[instrument(skip(self))]
    pub async fn register_room(&self, code: &str, email: &str) -> ChatResult<Room> {
        let room = rooms::resolve_room(&self.db_pool, code).await?;
        let member = self.members.find_member_by_email(email).await?;
        memberships::create_membership(&self.db_pool, &room, &member).await?;

        info!("room joined");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn search_room_list(&self, email: &str) -> ChatResult<Vec<Room>> {
        let member = self.members.find_member_by_email(email).await?;
        memberships::list_rooms_for_member(&self.db_pool, &member).await
    }

    /// Full history of a room, oldest first, from the primary store.
    #[instrument(skip(self))]
    pub async fn search_chat_list(&self, code: &str) -> ChatResult<Vec<ChatPayload>> {
        let room = rooms::resolve_room(&self.db_pool, code).await?;
        let history = messages::list_messages(&self.db_pool, &room).await?;
        Ok(history.into_iter().map(ChatPayload::from).collect())
    }

    /// Attaches the sender's identity to the connection and builds the greeting.
    /// Member and room are resolved before the connection changes, so a failed
    /// enter leaves it where it was. Nothing is stored; run the result through
    /// [`ChatService::send`].
    pub async fn enter(&self, payload: ChatPayload, session: &mut ConnectionSession) -> ChatResult<ChatPayload> {
        let member = self.members.find_member_by_email(&payload.email).await?;
        let room = rooms::resolve_room(&self.db_pool, &payload.room_code).await?;
        let nickname = if payload.nickname.is_empty() {
            member.nickname
        } else {
            payload.nickname
        };

        session.attach(Occupant {
            email: member.email.clone(),
            room_code: room.code.clone(),
            nickname: nickname.clone(),
        })?;

        info!(session = %session.id(), email = %member.email, room_code = %room.code, "entered room");
        Ok(ChatPayload {
            kind: MessageType::Enter,
            message: format!("{nickname}{ENTER_GREETING}"),
            nickname,
            email: member.email,
            room_code: room.code,
            created_at: None,
        })
    }

    /// Records a message. Once this returns the message counts as sent; it
    /// becomes searchable when the relay has copied it into the index.
    #[instrument(skip(self, payload), fields(kind = %payload.kind, room_code = %payload.room_code))]
    pub async fn send(&self, payload: ChatPayload) -> ChatResult<ChatPayload> {
        let member = self.members.find_member_by_email(&payload.email).await?;
        let room = rooms::resolve_room(&self.db_pool, &payload.room_code).await?;

        let sender = Member {
            nickname: if payload.nickname.is_empty() {
                member.nickname
            } else {
                payload.nickname
            },
            email: member.email,
        };

        let mut tx = self.db_pool.begin().await?;
        let message = messages::record_message(&mut *tx, payload.kind, &sender, &room, &payload.message).await?;
        outbox::enqueue(&mut *tx, &message).await?;
        tx.commit().await?;

        self.relay.notify();
        info!(message_id = %message.id, "message sent");
        Ok(ChatPayload::from(message))
    }

    /// Builds the departure notice from whatever identity the connection has.
    /// A connection that never entered yields blank identity fields.
    pub fn leave(&self, session: &mut ConnectionSession) -> ChatPayload {
        let (email, room_code, nickname) = match session.occupant() {
            Some(Occupant { email, room_code, nickname }) => (email.clone(), room_code.clone(), nickname.clone()),
            None => Default::default(),
        };
        session.mark_leaving();

        info!(session = %session.id(), %email, %room_code, "left room");
        ChatPayload {
            kind: MessageType::Leave,
            message: format!("{nickname}{LEAVE_FAREWELL}"),
            nickname,
            email,
            room_code,
            created_at: None,
        }
    }

    #[instrument(skip(self))]
    pub async fn search_messages(&self, code: &str, text: &str, page: Page) -> ChatResult<Vec<SearchResult>> {
        Ok(self.relay.index().search(code, text, page).await?)
    }

    pub async fn pending_index_writes(&self) -> ChatResult<i64> {
        self.relay.pending_index_writes().await
    }
}
