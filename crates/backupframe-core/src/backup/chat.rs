//! Conversations.

use std::collections::BTreeMap;

use backupframe_proto::schema as proto;
use serde::Serialize;
use thiserror::Error;

use super::recipient::Destination;

/// Validated [`proto::Chat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chat {
    /// Recipient this chat is with; always a known recipient
    pub recipient_id: u64,
    /// Whether the chat is archived
    pub archived: bool,
    /// Position among pinned chats
    pub pinned_order: Option<u32>,
    /// Disappearing message timer
    pub expiration_timer_ms: Option<u64>,
    /// Muted until this time
    pub mute_until_ms: Option<u64>,
}

/// Problems with a `Chat` frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Id already used by an earlier chat
    #[error("duplicate chat id")]
    DuplicateId,

    /// Recipient does not appear before the chat
    #[error("unknown recipient {0}")]
    UnknownRecipient(u64),

    /// Recipient already has a chat
    #[error("recipient {0} already has a chat")]
    DuplicateRecipient(u64),
}

impl Chat {
    /// Validate a chat against the recipients seen so far.
    ///
    /// Id and per-recipient uniqueness are checked by the accumulator.
    pub(crate) fn validate(
        value: proto::Chat,
        recipients: &BTreeMap<u64, Destination>,
    ) -> Result<Self, ChatError> {
        let proto::Chat {
            id: _,
            recipient_id,
            archived,
            pinned_order,
            expiration_timer_ms,
            mute_until_ms,
        } = value;

        if !recipients.contains_key(&recipient_id) {
            return Err(ChatError::UnknownRecipient(recipient_id));
        }

        Ok(Self { recipient_id, archived, pinned_order, expiration_timer_ms, mute_until_ms })
    }
}
