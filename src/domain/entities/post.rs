use serde::{Deserialize, Serialize};

/// Event kind of profile metadata events.
pub const KIND_METADATA: u16 = 0;
/// Event kind of plain text notes.
pub const KIND_TEXT_NOTE: u16 = 1;
/// Event kind of contact (follow) lists.
pub const KIND_CONTACTS: u16 = 3;
/// Event kind of relay list declarations.
pub const KIND_RELAY_LIST: u16 = 10002;

/// An immutable post record keyed by its event id.
///
/// Once inserted into the cache a post never changes; duplicate delivery from
/// overlapping relays is resolved by idempotent insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    /// Author identity key (hex pubkey).
    pub pubkey: String,
    pub content: String,
    /// Creation time in unix seconds, as carried by the event.
    pub created_at: i64,
    pub kind: u16,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        pubkey: impl Into<String>,
        content: impl Into<String>,
        created_at: i64,
        kind: u16,
    ) -> Self {
        Self {
            id: id.into(),
            pubkey: pubkey.into(),
            content: content.into(),
            created_at,
            kind,
        }
    }

    pub fn text_note(
        id: impl Into<String>,
        pubkey: impl Into<String>,
        content: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self::new(id, pubkey, content, created_at, KIND_TEXT_NOTE)
    }

    pub fn is_text_note(&self) -> bool {
        self.kind == KIND_TEXT_NOTE
    }
}
