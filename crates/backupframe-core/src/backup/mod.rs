//! Backup accumulator shared by every validator.
//!
//! A [`PartialBackup`] starts from a decoded header and absorbs one frame at a
//! time. Each frame is checked completely against the state built so far
//! before anything is recorded, so a rejected frame leaves the accumulator
//! exactly as it was. [`PartialBackup::finalize`] applies the checks that can
//! only be made once every frame has been seen.
//!
//! # Ordering
//!
//! References point backwards: a chat names a recipient that appeared
//! earlier, a chat item names a chat and an author that appeared earlier.

mod account;
mod chat;
mod chat_item;
mod recipient;
mod serialize;
mod sticker;
mod text;

use std::collections::{BTreeMap, BTreeSet};

use backupframe_proto::schema::{self as proto, frame::Item};
use serde::Serialize;

pub use self::{
    account::{AccountData, AccountDataError},
    chat::{Chat, ChatError},
    chat_item::{
        ChatItem, ChatItemContent, ChatItemError, Direction, MIN_REMOTE_EXPIRATION_MS, Reaction,
    },
    recipient::{Contact, Destination, Group, RecipientError},
    sticker::{StickerPack, StickerPackError},
    text::{MAX_BODY_LENGTH, MessageText, TextEffect, TextError, TextRange, TextStyle},
};
use self::serialize::as_hex;
use crate::error::ValidationError;

/// The only header version this validator understands
pub const SUPPORTED_VERSION: u64 = 1;

/// Media root backup key length
const MEDIA_ROOT_BACKUP_KEY_LEN: usize = 32;

/// Why a backup was produced. Some rules only apply to one purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Purpose {
    /// Direct transfer to a new device
    DeviceTransfer,
    /// Upload to remote storage
    RemoteBackup,
}

/// What the accumulator keeps after a frame is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep only what later frames are checked against
    ValidateOnly,
    /// Keep everything, for rendering
    Full,
}

/// Validated header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupMeta {
    /// Format version, always [`SUPPORTED_VERSION`]
    pub version: u64,
    /// Creation time
    pub backup_time_ms: u64,
    /// Root key for media encryption
    #[serde(serialize_with = "as_hex")]
    pub media_root_backup_key: [u8; MEDIA_ROOT_BACKUP_KEY_LEN],
    /// Writing app version
    pub current_app_version: String,
    /// Account-creating app version
    pub first_app_version: String,
    /// Purpose the backup was validated for
    pub purpose: Purpose,
}

impl BackupMeta {
    /// Validate a decoded header.
    ///
    /// # Errors
    ///
    /// - `ValidationError::UnsupportedVersion` unless the version is
    ///   [`SUPPORTED_VERSION`]
    /// - `ValidationError::InvalidMediaRootBackupKey` if the key is not 32
    ///   bytes
    pub fn validate(info: proto::BackupInfo, purpose: Purpose) -> Result<Self, ValidationError> {
        let proto::BackupInfo {
            version,
            backup_time_ms,
            media_root_backup_key,
            current_app_version,
            first_app_version,
        } = info;

        if version != SUPPORTED_VERSION {
            return Err(ValidationError::UnsupportedVersion(version));
        }

        let media_root_backup_key =
            <[u8; MEDIA_ROOT_BACKUP_KEY_LEN]>::try_from(media_root_backup_key.as_slice())
                .map_err(|_| {
                    ValidationError::InvalidMediaRootBackupKey(media_root_backup_key.len())
                })?;

        Ok(Self {
            version,
            backup_time_ms,
            media_root_backup_key,
            current_app_version,
            first_app_version,
            purpose,
        })
    }
}

/// Backup under construction.
///
/// # Invariants
///
/// - Every chat's recipient is in `recipients`
/// - Every retained chat item's chat is in `chats` and its author in
///   `recipients`
/// - `self_id` and `release_notes_id`, when set, name recipients of that kind
/// - A rejected frame changes nothing
#[derive(Debug, Clone)]
pub struct PartialBackup {
    meta: BackupMeta,
    retention: Retention,
    account_data: Option<AccountData>,
    recipients: BTreeMap<u64, Destination>,
    self_id: Option<u64>,
    release_notes_id: Option<u64>,
    chats: BTreeMap<u64, Chat>,
    chatted_recipients: BTreeSet<u64>,
    chat_items: Vec<ChatItem>,
    chat_item_count: usize,
    sticker_packs: BTreeMap<[u8; sticker::PACK_ID_LEN], StickerPack>,
}

/// Backup that passed every frame and closing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedBackup {
    /// Header
    pub meta: BackupMeta,
    /// Account-wide data
    pub account_data: AccountData,
    /// Recipients by id
    pub recipients: BTreeMap<u64, Destination>,
    /// Chats by id
    pub chats: BTreeMap<u64, Chat>,
    /// Chat items in backup order; empty unless retained
    pub chat_items: Vec<ChatItem>,
    /// Sticker packs by pack id
    pub sticker_packs: BTreeMap<[u8; sticker::PACK_ID_LEN], StickerPack>,
}

impl PartialBackup {
    /// Start a backup from its header.
    ///
    /// # Errors
    ///
    /// Header errors from [`BackupMeta::validate`].
    pub fn new(
        info: proto::BackupInfo,
        purpose: Purpose,
        retention: Retention,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            meta: BackupMeta::validate(info, purpose)?,
            retention,
            account_data: None,
            recipients: BTreeMap::new(),
            self_id: None,
            release_notes_id: None,
            chats: BTreeMap::new(),
            chatted_recipients: BTreeSet::new(),
            chat_items: Vec::new(),
            chat_item_count: 0,
            sticker_packs: BTreeMap::new(),
        })
    }

    /// Validated header.
    pub fn meta(&self) -> &BackupMeta {
        &self.meta
    }

    /// Number of chat items accepted so far, retained or not.
    pub fn chat_item_count(&self) -> usize {
        self.chat_item_count
    }

    /// Validate one frame and fold it in.
    ///
    /// # Errors
    ///
    /// The first problem found with the frame. State is unchanged on error.
    pub fn add_frame(&mut self, frame: proto::Frame) -> Result<(), ValidationError> {
        match frame.item.ok_or(ValidationError::FrameWithoutItem)? {
            Item::Account(account) => self.add_account_data(account),
            Item::Recipient(recipient) => self.add_recipient(recipient),
            Item::Chat(chat) => self.add_chat(chat),
            Item::ChatItem(item) => self.add_chat_item(item),
            Item::StickerPack(pack) => self.add_sticker_pack(pack),
        }
    }

    /// Apply closing checks.
    ///
    /// # Errors
    ///
    /// - `ValidationError::MissingAccountData` if no `AccountData` frame
    ///   arrived
    /// - `ValidationError::MissingSelfRecipient` if no Self recipient arrived
    pub fn finalize(self) -> Result<CompletedBackup, ValidationError> {
        let Self { meta, account_data, recipients, self_id, chats, chat_items, sticker_packs, .. } =
            self;

        let account_data = account_data.ok_or(ValidationError::MissingAccountData)?;
        if self_id.is_none() {
            return Err(ValidationError::MissingSelfRecipient);
        }

        Ok(CompletedBackup { meta, account_data, recipients, chats, chat_items, sticker_packs })
    }

    fn add_account_data(&mut self, account: proto::AccountData) -> Result<(), ValidationError> {
        if self.account_data.is_some() {
            return Err(AccountDataError::Duplicate.into());
        }
        self.account_data = Some(AccountData::try_from(account)?);
        Ok(())
    }

    fn add_recipient(&mut self, recipient: proto::Recipient) -> Result<(), ValidationError> {
        let id = recipient.id;
        let err = |source| ValidationError::Recipient { id, source };

        if self.recipients.contains_key(&id) {
            return Err(err(RecipientError::DuplicateId));
        }
        let destination = Destination::try_from(recipient).map_err(err)?;

        match destination {
            Destination::SelfRecipient => {
                if let Some(previous) = self.self_id {
                    return Err(err(RecipientError::DuplicateSelf(previous)));
                }
                self.self_id = Some(id);
            },
            Destination::ReleaseNotes => {
                if let Some(previous) = self.release_notes_id {
                    return Err(err(RecipientError::DuplicateReleaseNotes(previous)));
                }
                self.release_notes_id = Some(id);
            },
            Destination::Contact(_) | Destination::Group(_) => {},
        }

        self.recipients.insert(id, destination);
        Ok(())
    }

    fn add_chat(&mut self, chat: proto::Chat) -> Result<(), ValidationError> {
        let id = chat.id;
        let err = |source| ValidationError::Chat { id, source };

        if self.chats.contains_key(&id) {
            return Err(err(ChatError::DuplicateId));
        }
        let chat = Chat::validate(chat, &self.recipients).map_err(err)?;
        if self.chatted_recipients.contains(&chat.recipient_id) {
            return Err(err(ChatError::DuplicateRecipient(chat.recipient_id)));
        }

        self.chatted_recipients.insert(chat.recipient_id);
        self.chats.insert(id, chat);
        Ok(())
    }

    fn add_chat_item(&mut self, item: proto::ChatItem) -> Result<(), ValidationError> {
        let (chat_id, date_sent) = (item.chat_id, item.date_sent);

        let item = ChatItem::validate(item, &self.recipients, &self.chats, self.meta.purpose)
            .map_err(|source| ValidationError::ChatItem { chat_id, date_sent, source })?;

        self.chat_item_count += 1;
        if self.retention == Retention::Full {
            self.chat_items.push(item);
        }
        Ok(())
    }

    fn add_sticker_pack(&mut self, pack: proto::StickerPack) -> Result<(), ValidationError> {
        let pack = StickerPack::try_from(pack)?;
        if self.sticker_packs.contains_key(&pack.pack_id) {
            return Err(StickerPackError::DuplicateId(hex::encode(pack.pack_id)).into());
        }
        self.sticker_packs.insert(pack.pack_id, pack);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use backupframe_proto::schema::{Frame, recipient::Destination as ProtoDestination};

    use super::*;

    fn info() -> proto::BackupInfo {
        proto::BackupInfo {
            version: 1,
            backup_time_ms: 1_731_715_200_000,
            media_root_backup_key: vec![0x4d; 32],
            ..Default::default()
        }
    }

    fn frame(item: Item) -> Frame {
        Frame { item: Some(item) }
    }

    fn recipient(id: u64, destination: ProtoDestination) -> Frame {
        frame(Item::Recipient(proto::Recipient { id, destination: Some(destination) }))
    }

    fn self_recipient(id: u64) -> Frame {
        recipient(id, ProtoDestination::SelfRecipient(proto::SelfRecipient {}))
    }

    fn contact(id: u64) -> Frame {
        recipient(
            id,
            ProtoDestination::Contact(proto::Contact {
                aci: Some(vec![id as u8; 16]),
                ..Default::default()
            }),
        )
    }

    fn account() -> Frame {
        frame(Item::Account(proto::AccountData {
            profile_key: vec![0x5a; 32],
            ..Default::default()
        }))
    }

    fn chat(id: u64, recipient_id: u64) -> Frame {
        frame(Item::Chat(proto::Chat { id, recipient_id, ..Default::default() }))
    }

    fn partial() -> PartialBackup {
        PartialBackup::new(info(), Purpose::RemoteBackup, Retention::Full).expect("valid header")
    }

    #[test]
    fn header_version_checked() {
        let mut header = info();
        header.version = 2;
        assert!(matches!(
            PartialBackup::new(header, Purpose::RemoteBackup, Retention::Full),
            Err(ValidationError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn header_media_root_key_checked() {
        let mut header = info();
        header.media_root_backup_key = vec![0; 16];
        assert!(matches!(
            PartialBackup::new(header, Purpose::DeviceTransfer, Retention::ValidateOnly),
            Err(ValidationError::InvalidMediaRootBackupKey(16))
        ));
    }

    #[test]
    fn minimal_backup_completes() {
        let mut backup = partial();
        backup.add_frame(account()).expect("account");
        backup.add_frame(self_recipient(1)).expect("self");

        let completed = backup.finalize().expect("complete");
        assert_eq!(completed.recipients.len(), 1);
        assert_eq!(completed.meta.purpose, Purpose::RemoteBackup);
    }

    #[test]
    fn closing_checks() {
        assert!(matches!(partial().finalize(), Err(ValidationError::MissingAccountData)));

        let mut backup = partial();
        backup.add_frame(account()).expect("account");
        assert!(matches!(backup.finalize(), Err(ValidationError::MissingSelfRecipient)));
    }

    #[test]
    fn empty_frame_rejected() {
        assert!(matches!(
            partial().add_frame(Frame { item: None }),
            Err(ValidationError::FrameWithoutItem)
        ));
    }

    #[test]
    fn duplicates_rejected() {
        let mut backup = partial();
        backup.add_frame(account()).expect("account");
        backup.add_frame(self_recipient(1)).expect("self");
        backup.add_frame(contact(2)).expect("contact");
        backup.add_frame(chat(10, 2)).expect("chat");

        assert!(matches!(
            backup.add_frame(account()),
            Err(ValidationError::AccountData(AccountDataError::Duplicate))
        ));
        assert!(matches!(
            backup.add_frame(contact(2)),
            Err(ValidationError::Recipient { id: 2, source: RecipientError::DuplicateId })
        ));
        assert!(matches!(
            backup.add_frame(self_recipient(3)),
            Err(ValidationError::Recipient { id: 3, source: RecipientError::DuplicateSelf(1) })
        ));
        assert!(matches!(
            backup.add_frame(chat(10, 1)),
            Err(ValidationError::Chat { id: 10, source: ChatError::DuplicateId })
        ));
        assert!(matches!(
            backup.add_frame(chat(11, 2)),
            Err(ValidationError::Chat { id: 11, source: ChatError::DuplicateRecipient(2) })
        ));
    }

    #[test]
    fn rejected_frame_leaves_state_unchanged() {
        let mut backup = partial();
        backup.add_frame(self_recipient(1)).expect("self");

        assert!(backup.add_frame(self_recipient(2)).is_err());
        assert!(!backup.recipients.contains_key(&2));
        assert_eq!(backup.self_id, Some(1));

        assert!(backup.add_frame(chat(10, 99)).is_err());
        assert!(backup.chats.is_empty());
        assert!(backup.chatted_recipients.is_empty());
    }

    #[test]
    fn validate_only_counts_items_without_keeping_them() {
        let mut backup =
            PartialBackup::new(info(), Purpose::DeviceTransfer, Retention::ValidateOnly)
                .expect("header");
        backup.add_frame(account()).expect("account");
        backup.add_frame(self_recipient(1)).expect("self");
        backup.add_frame(contact(2)).expect("contact");
        backup.add_frame(chat(10, 2)).expect("chat");
        backup
            .add_frame(frame(Item::ChatItem(proto::ChatItem {
                chat_id: 10,
                author_id: 1,
                date_sent: 5,
                direction: Some(proto::chat_item::Direction::Outgoing(
                    proto::OutgoingMessageDetails {},
                )),
                item: Some(proto::chat_item::Item::RemoteDeletedMessage(
                    proto::RemoteDeletedMessage {},
                )),
                ..Default::default()
            })))
            .expect("item");

        assert_eq!(backup.chat_item_count(), 1);
        assert!(backup.finalize().expect("complete").chat_items.is_empty());
    }

    #[test]
    fn sticker_pack_ids_unique() {
        let pack = || {
            frame(Item::StickerPack(proto::StickerPack {
                pack_id: vec![0xee; 16],
                pack_key: vec![0x11; 32],
            }))
        };
        let mut backup = partial();
        backup.add_frame(pack()).expect("first pack");
        assert!(matches!(
            backup.add_frame(pack()),
            Err(ValidationError::StickerPack(StickerPackError::DuplicateId(_)))
        ));
    }
}
