use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ChatError, ChatResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Enter,
    #[default]
    Talk,
    Leave,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        use MessageType::*;
        match self {
            Enter => "ENTER",
            Talk => "TALK",
            Leave => "LEAVE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ChatError;

    fn from_str(s: &str) -> ChatResult<Self> {
        match s {
            "ENTER" => Ok(Self::Enter),
            "TALK" => Ok(Self::Talk),
            "LEAVE" => Ok(Self::Leave),
            other => Err(ChatError::Corrupt(format!("unknown message type {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub email: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_code: String,
    pub email: String,
    pub created_at: OffsetDateTime,
}

/// A message as kept in the primary store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub kind: MessageType,
    pub nickname: String,
    pub email: String,
    pub room_code: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// What travels over the socket, in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub room_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl From<Message> for ChatPayload {
    fn from(msg: Message) -> Self {
        ChatPayload {
            kind: msg.kind,
            nickname: msg.nickname,
            email: msg.email,
            room_code: msg.room_code,
            message: msg.body,
            created_at: Some(msg.created_at),
        }
    }
}

/// Denormalized copy of a [`Message`] as the search index stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub message_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub nickname: String,
    pub email: String,
    pub room_code: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Message> for IndexEntry {
    fn from(msg: &Message) -> Self {
        IndexEntry {
            message_id: msg.id,
            kind: msg.kind,
            nickname: msg.nickname.clone(),
            email: msg.email.clone(),
            room_code: msg.room_code.clone(),
            message: msg.body.clone(),
            created_at: msg.created_at,
        }
    }
}

pub type SearchResult = IndexEntry;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for Page {
    fn default() -> Self {
        Page { page: 0, size: DEFAULT_PAGE_SIZE }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.size.clamp(1, MAX_PAGE_SIZE) as i64
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.limit()
    }
}

// timestamps are stored as unix nanoseconds so they sort as integers
pub(crate) fn to_nanos(t: OffsetDateTime) -> i64 {
    t.unix_timestamp_nanos() as i64
}

pub(crate) fn from_nanos(nanos: i64) -> ChatResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
        .map_err(|e| ChatError::Corrupt(format!("bad timestamp {nanos}: {e}")))
}
