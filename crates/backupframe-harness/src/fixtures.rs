//! Ready-made backups and keys.
//!
//! Everything here is deterministic: the same call always yields the same
//! bytes, and shuffled variants are driven by an explicit seed.

use backupframe_crypto::{AccountEntropyPool, Aci, MessageBackupKey, MessageBackupKeySource};
use backupframe_proto::schema::{
    AccountData, BackupInfo, BodyRange, Chat, ChatItem, Contact, DirectionlessMessageDetails,
    Frame, Group, IncomingMessageDetails, OutgoingMessageDetails, Reaction, Recipient,
    ReleaseNotes, RemoteDeletedMessage, SelfRecipient, StandardMessage, StickerPack, Text,
    body_range, chat_item, frame::Item, recipient::Destination,
};
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;

use crate::builder::BackupBuilder;

/// Entropy pool behind [`test_key`]
pub const TEST_ENTROPY_POOL: &str =
    "dtjs858asj6tv0jzsqrsmj0ubp335pisj98e9ssnss8myoc08drhtcktyawvx45l";

/// Account behind [`test_key`]
pub const TEST_ACI: Aci = Aci::from_uuid_bytes([
    0x65, 0x9a, 0xa5, 0xf4, 0xa2, 0x8d, 0xfc, 0xc1, 0x1e, 0xa1, 0xb9, 0x97, 0x53, 0x7a, 0x3d, 0x95,
]);

/// Id of the Self recipient in every fixture
pub const SELF_ID: u64 = 1;

/// Message backup key derived from [`TEST_ENTROPY_POOL`] and [`TEST_ACI`].
pub fn test_key() -> MessageBackupKey {
    let Ok(pool) = TEST_ENTROPY_POOL.parse::<AccountEntropyPool>() else {
        unreachable!("fixture pool is valid");
    };
    MessageBackupKey::from_source(
        &MessageBackupKeySource::AccountEntropy { pool, aci: TEST_ACI },
        None,
    )
}

/// Version 1 header with a well-formed media root key.
pub fn backup_info() -> BackupInfo {
    BackupInfo {
        version: 1,
        backup_time_ms: 1_731_715_200_000,
        media_root_backup_key: vec![0x4d; 32],
        current_app_version: "7.30.0".into(),
        first_app_version: "5.0.0".into(),
    }
}

/// Wrap a record variant in a frame.
pub fn frame(item: Item) -> Frame {
    Frame { item: Some(item) }
}

/// Account data frame with a valid profile key.
pub fn account_frame() -> Frame {
    frame(Item::Account(AccountData {
        profile_key: vec![0x5a; 32],
        username: Some("reader.42".into()),
        given_name: "Ada".into(),
        family_name: "Reader".into(),
        avatar_url_path: String::new(),
    }))
}

/// Recipient frame.
pub fn recipient_frame(id: u64, destination: Destination) -> Frame {
    frame(Item::Recipient(Recipient { id, destination: Some(destination) }))
}

/// Self recipient frame with [`SELF_ID`].
pub fn self_recipient_frame() -> Frame {
    recipient_frame(SELF_ID, Destination::SelfRecipient(SelfRecipient {}))
}

/// Contact addressed by ACI.
pub fn contact_frame(id: u64, aci_byte: u8) -> Frame {
    recipient_frame(
        id,
        Destination::Contact(Contact {
            aci: Some(vec![aci_byte; 16]),
            profile_given_name: Some(format!("Contact {id}")),
            ..Default::default()
        }),
    )
}

/// Chat frame.
pub fn chat_frame(id: u64, recipient_id: u64) -> Frame {
    frame(Item::Chat(Chat { id, recipient_id, ..Default::default() }))
}

/// Incoming text message.
pub fn incoming_text_frame(chat_id: u64, author_id: u64, date_sent: u64, body: &str) -> Frame {
    frame(Item::ChatItem(ChatItem {
        chat_id,
        author_id,
        date_sent,
        direction: Some(chat_item::Direction::Incoming(IncomingMessageDetails {
            date_received: date_sent + 500,
            date_server_sent: Some(date_sent + 100),
            read: true,
            sealed_sender: true,
        })),
        item: Some(chat_item::Item::StandardMessage(StandardMessage {
            text: Some(Text { body: body.into(), body_ranges: Vec::new() }),
            reactions: Vec::new(),
        })),
        ..Default::default()
    }))
}

/// Outgoing text message from Self.
pub fn outgoing_text_frame(chat_id: u64, date_sent: u64, body: &str) -> Frame {
    frame(Item::ChatItem(ChatItem {
        chat_id,
        author_id: SELF_ID,
        date_sent,
        direction: Some(chat_item::Direction::Outgoing(OutgoingMessageDetails {})),
        item: Some(chat_item::Item::StandardMessage(StandardMessage {
            text: Some(Text { body: body.into(), body_ranges: Vec::new() }),
            reactions: Vec::new(),
        })),
        ..Default::default()
    }))
}

/// Smallest valid backup: header, account data and the Self recipient.
pub fn minimal_backup() -> BackupBuilder {
    BackupBuilder::new(&backup_info()).frame(&account_frame()).frame(&self_recipient_frame())
}

/// A backup touching every record kind, split into sections whose frames may
/// be reordered freely among themselves.
///
/// Sections are emitted in dependency order: account, recipients, chats, chat
/// items, sticker packs.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBackup {
    /// Header
    pub info: BackupInfo,
    /// Account data
    pub account: Frame,
    /// Recipients
    pub recipients: Vec<Frame>,
    /// Chats
    pub chats: Vec<Frame>,
    /// Chat items
    pub chat_items: Vec<Frame>,
    /// Sticker packs
    pub sticker_packs: Vec<Frame>,
}

impl Default for SampleBackup {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBackup {
    /// The canonical sample.
    pub fn new() -> Self {
        let recipients = vec![
            self_recipient_frame(),
            contact_frame(2, 0xa2),
            recipient_frame(
                3,
                Destination::Contact(Contact {
                    e164: Some(16_505_550_103),
                    blocked: true,
                    ..Default::default()
                }),
            ),
            recipient_frame(
                4,
                Destination::Group(Group {
                    master_key: vec![0x67; 32],
                    whitelisted: true,
                    hide_story: false,
                }),
            ),
            recipient_frame(5, Destination::ReleaseNotes(ReleaseNotes {})),
        ];

        let chats = vec![
            chat_frame(10, 2),
            frame(Item::Chat(Chat {
                id: 11,
                recipient_id: 3,
                archived: true,
                expiration_timer_ms: Some(7 * 24 * 60 * 60 * 1000),
                ..Default::default()
            })),
            frame(Item::Chat(Chat {
                id: 12,
                recipient_id: 4,
                pinned_order: Some(1),
                ..Default::default()
            })),
            chat_frame(13, 5),
        ];

        let chat_items = vec![
            formatted_message_frame(),
            outgoing_text_frame(10, 1_700_000_002_000, "same to you"),
            frame(Item::ChatItem(ChatItem {
                chat_id: 11,
                author_id: 3,
                date_sent: 1_700_000_003_000,
                expire_start_date: Some(1_700_000_003_500),
                expires_in_ms: Some(7 * 24 * 60 * 60 * 1000),
                direction: Some(chat_item::Direction::Incoming(IncomingMessageDetails {
                    date_received: 1_700_000_003_400,
                    ..Default::default()
                })),
                item: Some(chat_item::Item::RemoteDeletedMessage(RemoteDeletedMessage {})),
                ..Default::default()
            })),
            incoming_text_frame(12, 2, 1_700_000_004_000, "group hello"),
            incoming_text_frame(12, 3, 1_700_000_004_000, "group hello"),
            outgoing_text_frame(12, 1_700_000_005_000, "hi all"),
            frame(Item::ChatItem(ChatItem {
                chat_id: 13,
                author_id: 5,
                date_sent: 1_700_000_006_000,
                direction: Some(chat_item::Direction::Directionless(
                    DirectionlessMessageDetails {},
                )),
                item: Some(chat_item::Item::StandardMessage(StandardMessage {
                    text: Some(Text { body: "What's new".into(), body_ranges: Vec::new() }),
                    reactions: Vec::new(),
                })),
                ..Default::default()
            })),
        ];

        let sticker_packs = [(0xe1, 0x11), (0xe2, 0x22)]
            .into_iter()
            .map(|(id, key)| {
                frame(Item::StickerPack(StickerPack {
                    pack_id: vec![id; 16],
                    pack_key: vec![key; 32],
                }))
            })
            .collect();

        Self {
            info: backup_info(),
            account: account_frame(),
            recipients,
            chats,
            chat_items,
            sticker_packs,
        }
    }

    /// Every frame in canonical order.
    pub fn frames(&self) -> Vec<Frame> {
        let mut frames = vec![self.account.clone()];
        frames.extend(self.recipients.iter().cloned());
        frames.extend(self.chats.iter().cloned());
        frames.extend(self.chat_items.iter().cloned());
        frames.extend(self.sticker_packs.iter().cloned());
        frames
    }

    /// Builder emitting the frames in canonical order.
    pub fn builder(&self) -> BackupBuilder {
        BackupBuilder::new(&self.info).frames(&self.frames())
    }

    /// Same content with every section, and every reaction and body range
    /// list, shuffled by `seed`.
    #[must_use]
    pub fn shuffled(&self, seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut shuffled = self.clone();

        shuffled.recipients.shuffle(&mut rng);
        shuffled.chats.shuffle(&mut rng);
        shuffled.chat_items.shuffle(&mut rng);
        shuffled.sticker_packs.shuffle(&mut rng);

        for frame in &mut shuffled.chat_items {
            let Some(Item::ChatItem(item)) = &mut frame.item else { continue };
            let Some(chat_item::Item::StandardMessage(message)) = &mut item.item else { continue };
            message.reactions.shuffle(&mut rng);
            if let Some(text) = &mut message.text {
                text.body_ranges.shuffle(&mut rng);
            }
        }

        shuffled
    }
}

/// Incoming message with a mention, styles and reactions from two people.
fn formatted_message_frame() -> Frame {
    let range = |start, length, value| BodyRange { start, length, associated_value: Some(value) };
    let style = |style: body_range::Style| body_range::AssociatedValue::Style(style as i32);

    frame(Item::ChatItem(ChatItem {
        chat_id: 10,
        author_id: 2,
        date_sent: 1_700_000_001_000,
        direction: Some(chat_item::Direction::Incoming(IncomingMessageDetails {
            date_received: 1_700_000_001_200,
            read: true,
            ..Default::default()
        })),
        item: Some(chat_item::Item::StandardMessage(StandardMessage {
            text: Some(Text {
                body: "hey @you, *great* news".into(),
                body_ranges: vec![
                    range(4, 4, body_range::AssociatedValue::MentionAci(vec![0xa1; 16])),
                    range(10, 7, style(body_range::Style::Bold)),
                    range(10, 7, style(body_range::Style::Italic)),
                    range(18, 4, style(body_range::Style::Spoiler)),
                ],
            }),
            reactions: vec![
                Reaction {
                    emoji: "🎉".into(),
                    author_id: SELF_ID,
                    sent_timestamp: 1_700_000_001_500,
                    sort_order: 1,
                },
                Reaction {
                    emoji: "👍".into(),
                    author_id: 3,
                    sent_timestamp: 1_700_000_001_600,
                    sort_order: 2,
                },
                Reaction {
                    emoji: "❤️".into(),
                    author_id: 2,
                    sent_timestamp: 1_700_000_001_700,
                    sort_order: 3,
                },
            ],
        })),
        ..Default::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable() {
        assert_eq!(test_key().hmac_key(), test_key().hmac_key());
        assert_ne!(test_key().hmac_key(), test_key().aes_key());
    }

    #[test]
    fn shuffling_keeps_content() {
        let sample = SampleBackup::new();
        let shuffled = sample.shuffled(3);

        assert_eq!(sample.account, shuffled.account);
        assert_eq!(sample.chat_items.len(), shuffled.chat_items.len());
        for (original, reordered) in [
            (&sample.recipients, &shuffled.recipients),
            (&sample.chats, &shuffled.chats),
            (&sample.sticker_packs, &shuffled.sticker_packs),
        ] {
            assert_eq!(original.len(), reordered.len());
            assert!(original.iter().all(|frame| reordered.contains(frame)));
        }
    }

    #[test]
    fn shuffling_is_seeded() {
        let sample = SampleBackup::new();
        assert_eq!(sample.shuffled(42), sample.shuffled(42));
    }
}
