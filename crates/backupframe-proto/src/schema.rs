//! Backup record types.
//!
//! Protobuf messages declared with `prost` derives; field numbers are part of
//! the wire format and must never be reused. This is the subset of the backup
//! schema the validators understand: the header, account data, recipients,
//! chats, chat items and sticker packs. Fields outside this subset are still
//! tolerated on the wire and surface through [`crate::unknown`].

use prost::Message;

use crate::error::{ProtoError, Result};

/// Container header. Always the first record.
#[derive(Clone, PartialEq, Message)]
pub struct BackupInfo {
    /// Format version
    #[prost(uint64, tag = "1")]
    pub version: u64,
    /// Creation time, milliseconds since the Unix epoch
    #[prost(uint64, tag = "2")]
    pub backup_time_ms: u64,
    /// Root key for media encryption; exactly 32 bytes
    #[prost(bytes = "vec", tag = "3")]
    pub media_root_backup_key: Vec<u8>,
    /// Version of the app that wrote this backup
    #[prost(string, tag = "4")]
    pub current_app_version: String,
    /// Version of the app that first created the account
    #[prost(string, tag = "5")]
    pub first_app_version: String,
}

/// One record following the header.
#[derive(Clone, PartialEq, Message)]
pub struct Frame {
    /// Record payload; exactly one variant must be set
    #[prost(oneof = "frame::Item", tags = "1, 2, 3, 4, 5")]
    pub item: Option<frame::Item>,
}

/// Nested types for [`Frame`].
pub mod frame {
    /// Closed set of record variants.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Item {
        /// Account-wide data; exactly one per backup
        #[prost(message, tag = "1")]
        Account(super::AccountData),
        /// Conversation participant
        #[prost(message, tag = "2")]
        Recipient(super::Recipient),
        /// Conversation with one recipient
        #[prost(message, tag = "3")]
        Chat(super::Chat),
        /// Message inside a chat
        #[prost(message, tag = "4")]
        ChatItem(super::ChatItem),
        /// Installed sticker pack
        #[prost(message, tag = "5")]
        StickerPack(super::StickerPack),
    }
}

/// Account-wide data.
#[derive(Clone, PartialEq, Message)]
pub struct AccountData {
    /// Profile key; exactly 32 bytes
    #[prost(bytes = "vec", tag = "1")]
    pub profile_key: Vec<u8>,
    /// Username, if one is registered
    #[prost(string, optional, tag = "2")]
    pub username: Option<String>,
    /// Profile given name
    #[prost(string, tag = "3")]
    pub given_name: String,
    /// Profile family name
    #[prost(string, tag = "4")]
    pub family_name: String,
    /// CDN path of the profile avatar
    #[prost(string, tag = "5")]
    pub avatar_url_path: String,
}

/// Conversation participant, referenced by id from chats and chat items.
#[derive(Clone, PartialEq, Message)]
pub struct Recipient {
    /// Backup-local identifier
    #[prost(uint64, tag = "1")]
    pub id: u64,
    /// What kind of participant this is
    #[prost(oneof = "recipient::Destination", tags = "2, 3, 5, 6")]
    pub destination: Option<recipient::Destination>,
}

/// Nested types for [`Recipient`].
pub mod recipient {
    /// Recipient kinds.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Destination {
        /// Another account
        #[prost(message, tag = "2")]
        Contact(super::Contact),
        /// Group conversation
        #[prost(message, tag = "3")]
        Group(super::Group),
        /// The backup owner
        #[prost(message, tag = "5")]
        SelfRecipient(super::SelfRecipient),
        /// Release notes channel
        #[prost(message, tag = "6")]
        ReleaseNotes(super::ReleaseNotes),
    }
}

/// Another account.
#[derive(Clone, PartialEq, Message)]
pub struct Contact {
    /// ACI UUID bytes
    #[prost(bytes = "vec", optional, tag = "1")]
    pub aci: Option<Vec<u8>>,
    /// PNI UUID bytes
    #[prost(bytes = "vec", optional, tag = "2")]
    pub pni: Option<Vec<u8>>,
    /// Username
    #[prost(string, optional, tag = "3")]
    pub username: Option<String>,
    /// Phone number in E.164 form, without the leading `+`
    #[prost(uint64, optional, tag = "4")]
    pub e164: Option<u64>,
    /// Whether the contact is blocked
    #[prost(bool, tag = "5")]
    pub blocked: bool,
    /// Profile given name
    #[prost(string, optional, tag = "6")]
    pub profile_given_name: Option<String>,
    /// Profile family name
    #[prost(string, optional, tag = "7")]
    pub profile_family_name: Option<String>,
}

/// Group conversation.
#[derive(Clone, PartialEq, Message)]
pub struct Group {
    /// Group master key; exactly 32 bytes
    #[prost(bytes = "vec", tag = "1")]
    pub master_key: Vec<u8>,
    /// Whether the group is on the profile sharing whitelist
    #[prost(bool, tag = "2")]
    pub whitelisted: bool,
    /// Whether stories from this group are hidden
    #[prost(bool, tag = "3")]
    pub hide_story: bool,
}

/// Marker for the backup owner.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct SelfRecipient {}

/// Marker for the release notes channel.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct ReleaseNotes {}

/// Conversation with one recipient.
#[derive(Clone, PartialEq, Message)]
pub struct Chat {
    /// Backup-local identifier
    #[prost(uint64, tag = "1")]
    pub id: u64,
    /// Recipient this chat is with
    #[prost(uint64, tag = "2")]
    pub recipient_id: u64,
    /// Whether the chat is archived
    #[prost(bool, tag = "3")]
    pub archived: bool,
    /// Position among pinned chats
    #[prost(uint32, optional, tag = "4")]
    pub pinned_order: Option<u32>,
    /// Disappearing message timer
    #[prost(uint64, optional, tag = "5")]
    pub expiration_timer_ms: Option<u64>,
    /// Muted until this time, milliseconds since the Unix epoch
    #[prost(uint64, optional, tag = "6")]
    pub mute_until_ms: Option<u64>,
}

/// Message inside a chat.
#[derive(Clone, PartialEq, Message)]
pub struct ChatItem {
    /// Chat this item belongs to
    #[prost(uint64, tag = "1")]
    pub chat_id: u64,
    /// Recipient who wrote the item
    #[prost(uint64, tag = "2")]
    pub author_id: u64,
    /// Send time, milliseconds since the Unix epoch
    #[prost(uint64, tag = "3")]
    pub date_sent: u64,
    /// When the disappearing timer started
    #[prost(uint64, optional, tag = "4")]
    pub expire_start_date: Option<u64>,
    /// Disappearing timer length
    #[prost(uint64, optional, tag = "5")]
    pub expires_in_ms: Option<u64>,
    /// Whether the item arrived over SMS
    #[prost(bool, tag = "7")]
    pub sms: bool,
    /// Who sent the item relative to the backup owner
    #[prost(oneof = "chat_item::Direction", tags = "8, 9, 10")]
    pub direction: Option<chat_item::Direction>,
    /// Item content
    #[prost(oneof = "chat_item::Item", tags = "11, 12")]
    pub item: Option<chat_item::Item>,
}

/// Nested types for [`ChatItem`].
pub mod chat_item {
    /// Direction details.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Direction {
        /// Received from someone else
        #[prost(message, tag = "8")]
        Incoming(super::IncomingMessageDetails),
        /// Sent by the backup owner
        #[prost(message, tag = "9")]
        Outgoing(super::OutgoingMessageDetails),
        /// Neither, e.g. chat updates
        #[prost(message, tag = "10")]
        Directionless(super::DirectionlessMessageDetails),
    }

    /// Item content kinds.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Item {
        /// Text message with reactions
        #[prost(message, tag = "11")]
        StandardMessage(super::StandardMessage),
        /// Message deleted for everyone
        #[prost(message, tag = "12")]
        RemoteDeletedMessage(super::RemoteDeletedMessage),
    }
}

/// Details of a received item.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct IncomingMessageDetails {
    /// Receive time, milliseconds since the Unix epoch
    #[prost(uint64, tag = "1")]
    pub date_received: u64,
    /// Server timestamp, if known
    #[prost(uint64, optional, tag = "2")]
    pub date_server_sent: Option<u64>,
    /// Whether the owner has read the item
    #[prost(bool, tag = "3")]
    pub read: bool,
    /// Whether the item was sent with sealed sender
    #[prost(bool, tag = "4")]
    pub sealed_sender: bool,
}

/// Details of a sent item.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct OutgoingMessageDetails {}

/// Details of an item with no sender.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct DirectionlessMessageDetails {}

/// Text message with reactions.
#[derive(Clone, PartialEq, Message)]
pub struct StandardMessage {
    /// Message body
    #[prost(message, optional, tag = "1")]
    pub text: Option<Text>,
    /// Reactions from participants
    #[prost(message, repeated, tag = "5")]
    pub reactions: Vec<Reaction>,
}

/// Marker for a message deleted for everyone.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct RemoteDeletedMessage {}

/// Message body with formatting.
#[derive(Clone, PartialEq, Message)]
pub struct Text {
    /// Body text
    #[prost(string, tag = "1")]
    pub body: String,
    /// Styles and mentions over body ranges
    #[prost(message, repeated, tag = "2")]
    pub body_ranges: Vec<BodyRange>,
}

/// Style or mention applied to part of a body.
#[derive(Clone, PartialEq, Message)]
pub struct BodyRange {
    /// Start offset
    #[prost(uint32, tag = "1")]
    pub start: u32,
    /// Range length
    #[prost(uint32, tag = "2")]
    pub length: u32,
    /// What the range applies; required
    #[prost(oneof = "body_range::AssociatedValue", tags = "3, 4")]
    pub associated_value: Option<body_range::AssociatedValue>,
}

/// Nested types for [`BodyRange`].
pub mod body_range {
    /// Text styles.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Style {
        /// No style
        None = 0,
        /// Bold
        Bold = 1,
        /// Italic
        Italic = 2,
        /// Hidden until tapped
        Spoiler = 3,
        /// Strikethrough
        Strikethrough = 4,
        /// Fixed width
        Monospace = 5,
    }

    /// Range payload.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum AssociatedValue {
        /// Mentioned account's ACI UUID bytes
        #[prost(bytes, tag = "3")]
        MentionAci(Vec<u8>),
        /// Applied style
        #[prost(enumeration = "Style", tag = "4")]
        Style(i32),
    }
}

/// Reaction to a chat item.
#[derive(Clone, PartialEq, Message)]
pub struct Reaction {
    /// Reaction emoji
    #[prost(string, tag = "1")]
    pub emoji: String,
    /// Recipient who reacted
    #[prost(uint64, tag = "2")]
    pub author_id: u64,
    /// When the reaction was sent
    #[prost(uint64, tag = "3")]
    pub sent_timestamp: u64,
    /// Display order among reactions
    #[prost(uint64, tag = "4")]
    pub sort_order: u64,
}

/// Installed sticker pack.
#[derive(Clone, PartialEq, Message)]
pub struct StickerPack {
    /// Pack identifier; exactly 16 bytes
    #[prost(bytes = "vec", tag = "1")]
    pub pack_id: Vec<u8>,
    /// Pack decryption key; exactly 32 bytes
    #[prost(bytes = "vec", tag = "2")]
    pub pack_key: Vec<u8>,
}

/// Decode a header record.
///
/// # Errors
///
/// - `ProtoError::Decode` if `bytes` is not a well-formed `BackupInfo`
pub fn decode_backup_info(bytes: &[u8]) -> Result<BackupInfo> {
    BackupInfo::decode(bytes)
        .map_err(|e| ProtoError::Decode { message: "BackupInfo", reason: e.to_string() })
}

/// Decode a frame record.
///
/// # Errors
///
/// - `ProtoError::Decode` if `bytes` is not a well-formed `Frame`
pub fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    Frame::decode(bytes).map_err(|e| ProtoError::Decode { message: "Frame", reason: e.to_string() })
}
