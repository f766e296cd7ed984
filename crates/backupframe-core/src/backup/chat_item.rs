//! Messages inside chats.

use std::collections::BTreeMap;

use backupframe_proto::schema::{
    self as proto,
    chat_item::{Direction as ProtoDirection, Item as ProtoItem},
};
use serde::Serialize;
use thiserror::Error;

use super::{
    Purpose,
    chat::Chat,
    recipient::Destination,
    text::{MessageText, TextError},
};

/// Shortest disappearing timer a remote backup may carry. Shorter-lived
/// messages are expected to have expired before upload.
pub const MIN_REMOTE_EXPIRATION_MS: u64 = 24 * 60 * 60 * 1000;

/// Validated [`proto::ChatItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatItem {
    /// Chat the item belongs to
    pub chat_id: u64,
    /// Recipient who wrote the item
    pub author_id: u64,
    /// Send time
    pub date_sent: u64,
    /// When the disappearing timer started
    pub expire_start_date: Option<u64>,
    /// Disappearing timer length
    pub expires_in_ms: Option<u64>,
    /// Whether the item arrived over SMS
    pub sms: bool,
    /// Who sent the item relative to the owner
    pub direction: Direction,
    /// Content
    pub content: ChatItemContent,
}

/// Validated direction details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Received from another recipient
    Incoming {
        /// Receive time
        date_received: u64,
        /// Server timestamp
        date_server_sent: Option<u64>,
        /// Whether the owner has read it
        read: bool,
        /// Whether it was sent with sealed sender
        sealed_sender: bool,
    },
    /// Sent by the owner
    Outgoing,
    /// Neither
    Directionless,
}

/// Validated item content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChatItemContent {
    /// Text message with reactions
    Standard {
        /// Body
        text: MessageText,
        /// Reactions, in backup order
        reactions: Vec<Reaction>,
    },
    /// Deleted for everyone
    RemoteDeleted,
}

/// Validated [`proto::Reaction`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Reaction {
    /// Display order among reactions
    pub sort_order: u64,
    /// Reaction emoji, never empty
    pub emoji: String,
    /// Recipient who reacted
    pub author_id: u64,
    /// When the reaction was sent
    pub sent_timestamp: u64,
}

/// Problems with a `ChatItem` frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatItemError {
    /// Chat does not appear before the item
    #[error("no chat with id {0}")]
    UnknownChat(u64),

    /// Author does not appear before the item
    #[error("unknown author {0}")]
    UnknownAuthor(u64),

    /// `direction` oneof is empty
    #[error("ChatItem.direction is a oneof but has no value")]
    MissingDirection,

    /// `item` oneof is empty
    #[error("ChatItem.item is a oneof but has no value")]
    MissingItem,

    /// Outgoing item written by someone other than the owner
    #[error("outgoing message from recipient {0}, not Self")]
    OutgoingNotFromSelf(u64),

    /// Incoming item written by the owner
    #[error("incoming message from Self")]
    IncomingFromSelf,

    /// Timer start without a timer
    #[error("expire_start_date set without expires_in_ms")]
    ExpireStartWithoutTimer,

    /// Short-lived disappearing message in a remote backup
    #[error("expires_in_ms {0} is too short for a remote backup")]
    ExpiresTooSoon(u64),

    /// Standard message with no body
    #[error("standard message has no text")]
    MissingText,

    /// Invalid body
    #[error("text: {0}")]
    Text(#[from] TextError),

    /// Reaction with an empty emoji
    #[error("reaction has empty emoji")]
    EmptyReactionEmoji,

    /// Reaction from an unknown recipient
    #[error("reaction from unknown author {0}")]
    UnknownReactionAuthor(u64),
}

impl ChatItem {
    /// Validate an item against the recipients and chats seen so far.
    pub(crate) fn validate(
        value: proto::ChatItem,
        recipients: &BTreeMap<u64, Destination>,
        chats: &BTreeMap<u64, Chat>,
        purpose: Purpose,
    ) -> Result<Self, ChatItemError> {
        let proto::ChatItem {
            chat_id,
            author_id,
            date_sent,
            expire_start_date,
            expires_in_ms,
            sms,
            direction,
            item,
        } = value;

        if !chats.contains_key(&chat_id) {
            return Err(ChatItemError::UnknownChat(chat_id));
        }
        let author = recipients.get(&author_id).ok_or(ChatItemError::UnknownAuthor(author_id))?;

        let direction = match direction.ok_or(ChatItemError::MissingDirection)? {
            ProtoDirection::Incoming(details) => {
                if author.is_self() {
                    return Err(ChatItemError::IncomingFromSelf);
                }
                let proto::IncomingMessageDetails {
                    date_received,
                    date_server_sent,
                    read,
                    sealed_sender,
                } = details;
                Direction::Incoming { date_received, date_server_sent, read, sealed_sender }
            },
            ProtoDirection::Outgoing(proto::OutgoingMessageDetails {}) => {
                if !author.is_self() {
                    return Err(ChatItemError::OutgoingNotFromSelf(author_id));
                }
                Direction::Outgoing
            },
            ProtoDirection::Directionless(proto::DirectionlessMessageDetails {}) => {
                Direction::Directionless
            },
        };

        // Zero means the item does not disappear
        let expires_in_ms = expires_in_ms.filter(|&ms| ms > 0);
        match (expire_start_date, expires_in_ms) {
            (Some(_), None) => return Err(ChatItemError::ExpireStartWithoutTimer),
            (_, Some(ms)) if purpose == Purpose::RemoteBackup && ms <= MIN_REMOTE_EXPIRATION_MS => {
                return Err(ChatItemError::ExpiresTooSoon(ms));
            },
            _ => {},
        }

        let content = match item.ok_or(ChatItemError::MissingItem)? {
            ProtoItem::StandardMessage(message) => {
                let proto::StandardMessage { text, reactions } = message;
                let text = MessageText::try_from(text.ok_or(ChatItemError::MissingText)?)?;
                let reactions = reactions
                    .into_iter()
                    .map(|reaction| Reaction::validate(reaction, recipients))
                    .collect::<Result<_, _>>()?;
                ChatItemContent::Standard { text, reactions }
            },
            ProtoItem::RemoteDeletedMessage(proto::RemoteDeletedMessage {}) => {
                ChatItemContent::RemoteDeleted
            },
        };

        Ok(Self {
            chat_id,
            author_id,
            date_sent,
            expire_start_date,
            expires_in_ms,
            sms,
            direction,
            content,
        })
    }

    /// Sort nested collections whose order carries no meaning.
    pub(crate) fn normalize(&mut self) {
        if let ChatItemContent::Standard { text, reactions } = &mut self.content {
            text.normalize();
            reactions.sort_unstable();
        }
    }
}

impl Reaction {
    fn validate(
        value: proto::Reaction,
        recipients: &BTreeMap<u64, Destination>,
    ) -> Result<Self, ChatItemError> {
        let proto::Reaction { emoji, author_id, sent_timestamp, sort_order } = value;

        if emoji.is_empty() {
            return Err(ChatItemError::EmptyReactionEmoji);
        }
        if !recipients.contains_key(&author_id) {
            return Err(ChatItemError::UnknownReactionAuthor(author_id));
        }

        Ok(Self { sort_order, emoji, author_id, sent_timestamp })
    }
}

#[cfg(test)]
mod tests {
    use backupframe_proto::schema::Text;

    use super::*;

    const SELF_ID: u64 = 1;
    const FRIEND_ID: u64 = 2;
    const CHAT_ID: u64 = 10;

    fn context() -> (BTreeMap<u64, Destination>, BTreeMap<u64, Chat>) {
        let recipients = BTreeMap::from([
            (SELF_ID, Destination::SelfRecipient),
            (FRIEND_ID, Destination::ReleaseNotes),
        ]);
        let chats = BTreeMap::from([(
            CHAT_ID,
            Chat {
                recipient_id: FRIEND_ID,
                archived: false,
                pinned_order: None,
                expiration_timer_ms: None,
                mute_until_ms: None,
            },
        )]);
        (recipients, chats)
    }

    fn incoming() -> proto::ChatItem {
        proto::ChatItem {
            chat_id: CHAT_ID,
            author_id: FRIEND_ID,
            date_sent: 1_700_000_000_000,
            direction: Some(ProtoDirection::Incoming(proto::IncomingMessageDetails {
                date_received: 1_700_000_000_500,
                ..Default::default()
            })),
            item: Some(ProtoItem::StandardMessage(proto::StandardMessage {
                text: Some(Text { body: "hi".into(), body_ranges: vec![] }),
                reactions: vec![proto::Reaction {
                    emoji: "👍".into(),
                    author_id: SELF_ID,
                    sent_timestamp: 1_700_000_001_000,
                    sort_order: 1,
                }],
            })),
            ..Default::default()
        }
    }

    fn check(item: proto::ChatItem, purpose: Purpose) -> Result<ChatItem, ChatItemError> {
        let (recipients, chats) = context();
        ChatItem::validate(item, &recipients, &chats, purpose)
    }

    #[test]
    fn valid_incoming_message() {
        let item = check(incoming(), Purpose::RemoteBackup).expect("valid");
        assert!(matches!(item.direction, Direction::Incoming { .. }));
        let ChatItemContent::Standard { reactions, .. } = item.content else {
            unreachable!("standard message");
        };
        assert_eq!(reactions.len(), 1);
    }

    #[test]
    fn references_must_exist() {
        let mut item = incoming();
        item.chat_id = 99;
        assert_eq!(check(item, Purpose::DeviceTransfer), Err(ChatItemError::UnknownChat(99)));

        let mut item = incoming();
        item.author_id = 99;
        assert_eq!(check(item, Purpose::DeviceTransfer), Err(ChatItemError::UnknownAuthor(99)));
    }

    #[test]
    fn direction_must_match_author() {
        let mut item = incoming();
        item.author_id = SELF_ID;
        assert_eq!(check(item, Purpose::DeviceTransfer), Err(ChatItemError::IncomingFromSelf));

        let mut item = incoming();
        item.direction = Some(ProtoDirection::Outgoing(proto::OutgoingMessageDetails {}));
        assert_eq!(
            check(item, Purpose::DeviceTransfer),
            Err(ChatItemError::OutgoingNotFromSelf(FRIEND_ID))
        );

        let mut item = incoming();
        item.direction = None;
        assert_eq!(check(item, Purpose::DeviceTransfer), Err(ChatItemError::MissingDirection));
    }

    #[test]
    fn short_timers_only_rejected_for_remote_backups() {
        let mut item = incoming();
        item.expires_in_ms = Some(60_000);
        item.expire_start_date = Some(1_700_000_000_600);

        assert!(check(item.clone(), Purpose::DeviceTransfer).is_ok());
        assert_eq!(
            check(item.clone(), Purpose::RemoteBackup),
            Err(ChatItemError::ExpiresTooSoon(60_000))
        );

        item.expires_in_ms = Some(MIN_REMOTE_EXPIRATION_MS + 1);
        assert!(check(item, Purpose::RemoteBackup).is_ok());
    }

    #[test]
    fn timer_start_requires_timer() {
        let mut item = incoming();
        item.expire_start_date = Some(1);
        assert_eq!(
            check(item, Purpose::DeviceTransfer),
            Err(ChatItemError::ExpireStartWithoutTimer)
        );
    }

    #[test]
    fn body_problems_surface() {
        let mut item = incoming();
        item.item = Some(ProtoItem::StandardMessage(proto::StandardMessage::default()));
        assert_eq!(check(item, Purpose::DeviceTransfer), Err(ChatItemError::MissingText));

        let mut item = incoming();
        item.item = None;
        assert_eq!(check(item, Purpose::DeviceTransfer), Err(ChatItemError::MissingItem));

        let mut item = incoming();
        let Some(ProtoItem::StandardMessage(message)) = item.item.as_mut() else {
            unreachable!("standard message");
        };
        message.text = Some(Text::default());
        assert_eq!(
            check(item, Purpose::DeviceTransfer),
            Err(ChatItemError::Text(TextError::EmptyBody))
        );
    }

    #[test]
    fn reactions_checked() {
        let mut item = incoming();
        let Some(ProtoItem::StandardMessage(message)) = item.item.as_mut() else {
            unreachable!("standard message");
        };
        message.reactions[0].author_id = 42;
        assert_eq!(
            check(item, Purpose::DeviceTransfer),
            Err(ChatItemError::UnknownReactionAuthor(42))
        );

        let mut item = incoming();
        let Some(ProtoItem::StandardMessage(message)) = item.item.as_mut() else {
            unreachable!("standard message");
        };
        message.reactions[0].emoji.clear();
        assert_eq!(check(item, Purpose::DeviceTransfer), Err(ChatItemError::EmptyReactionEmoji));
    }

    #[test]
    fn remote_deleted_needs_no_body() {
        let mut item = incoming();
        item.item = Some(ProtoItem::RemoteDeletedMessage(proto::RemoteDeletedMessage {}));
        let item = check(item, Purpose::RemoteBackup).expect("valid");
        assert_eq!(item.content, ChatItemContent::RemoteDeleted);
    }
}
