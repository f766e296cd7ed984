//! Detection of fields the schema does not describe.
//!
//! Protobuf decoding silently skips unknown fields. A backup written by a
//! newer client may carry data this validator cannot check, which is worth
//! surfacing as a warning. This module walks the raw wire format against a
//! static description of [`crate::schema`] and reports every field number it
//! does not recognize, with the path of the message it appeared in.

use std::{collections::BTreeSet, fmt};

use crate::{
    error::{ProtoError, Result},
    varint::decode_varint,
};

/// Field number and path of a field absent from the schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnknownField {
    /// Dotted path of the enclosing message, e.g. `Frame.chat_item`
    pub path: String,
    /// Protobuf field number
    pub field: u32,
}

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: unknown field {}", self.path, self.field)
    }
}

/// Static description of one message type.
#[derive(Debug)]
pub struct MessageDescriptor {
    /// Message name used as the path root
    pub name: &'static str,
    /// Fields the schema declares
    pub fields: &'static [FieldDescriptor],
}

/// Static description of one field.
#[derive(Debug)]
pub struct FieldDescriptor {
    /// Protobuf field number
    pub number: u32,
    /// Field name used in paths
    pub name: &'static str,
    /// Message type, for fields that hold nested messages
    pub message: Option<&'static MessageDescriptor>,
}

const fn scalar(number: u32, name: &'static str) -> FieldDescriptor {
    FieldDescriptor { number, name, message: None }
}

const fn nested(
    number: u32,
    name: &'static str,
    message: &'static MessageDescriptor,
) -> FieldDescriptor {
    FieldDescriptor { number, name, message: Some(message) }
}

const fn empty(name: &'static str) -> MessageDescriptor {
    MessageDescriptor { name, fields: &[] }
}

/// `BackupInfo`
pub static BACKUP_INFO: MessageDescriptor = MessageDescriptor {
    name: "BackupInfo",
    fields: &[
        scalar(1, "version"),
        scalar(2, "backup_time_ms"),
        scalar(3, "media_root_backup_key"),
        scalar(4, "current_app_version"),
        scalar(5, "first_app_version"),
    ],
};

/// `Frame`
pub static FRAME: MessageDescriptor = MessageDescriptor {
    name: "Frame",
    fields: &[
        nested(1, "account", &ACCOUNT_DATA),
        nested(2, "recipient", &RECIPIENT),
        nested(3, "chat", &CHAT),
        nested(4, "chat_item", &CHAT_ITEM),
        nested(5, "sticker_pack", &STICKER_PACK),
    ],
};

static ACCOUNT_DATA: MessageDescriptor = MessageDescriptor {
    name: "AccountData",
    fields: &[
        scalar(1, "profile_key"),
        scalar(2, "username"),
        scalar(3, "given_name"),
        scalar(4, "family_name"),
        scalar(5, "avatar_url_path"),
    ],
};

static RECIPIENT: MessageDescriptor = MessageDescriptor {
    name: "Recipient",
    fields: &[
        scalar(1, "id"),
        nested(2, "contact", &CONTACT),
        nested(3, "group", &GROUP),
        nested(5, "self_recipient", &SELF_RECIPIENT),
        nested(6, "release_notes", &RELEASE_NOTES),
    ],
};

static CONTACT: MessageDescriptor = MessageDescriptor {
    name: "Contact",
    fields: &[
        scalar(1, "aci"),
        scalar(2, "pni"),
        scalar(3, "username"),
        scalar(4, "e164"),
        scalar(5, "blocked"),
        scalar(6, "profile_given_name"),
        scalar(7, "profile_family_name"),
    ],
};

static GROUP: MessageDescriptor = MessageDescriptor {
    name: "Group",
    fields: &[scalar(1, "master_key"), scalar(2, "whitelisted"), scalar(3, "hide_story")],
};

static SELF_RECIPIENT: MessageDescriptor = empty("SelfRecipient");
static RELEASE_NOTES: MessageDescriptor = empty("ReleaseNotes");

static CHAT: MessageDescriptor = MessageDescriptor {
    name: "Chat",
    fields: &[
        scalar(1, "id"),
        scalar(2, "recipient_id"),
        scalar(3, "archived"),
        scalar(4, "pinned_order"),
        scalar(5, "expiration_timer_ms"),
        scalar(6, "mute_until_ms"),
    ],
};

static CHAT_ITEM: MessageDescriptor = MessageDescriptor {
    name: "ChatItem",
    fields: &[
        scalar(1, "chat_id"),
        scalar(2, "author_id"),
        scalar(3, "date_sent"),
        scalar(4, "expire_start_date"),
        scalar(5, "expires_in_ms"),
        scalar(7, "sms"),
        nested(8, "incoming", &INCOMING),
        nested(9, "outgoing", &OUTGOING),
        nested(10, "directionless", &DIRECTIONLESS),
        nested(11, "standard_message", &STANDARD_MESSAGE),
        nested(12, "remote_deleted_message", &REMOTE_DELETED),
    ],
};

static INCOMING: MessageDescriptor = MessageDescriptor {
    name: "IncomingMessageDetails",
    fields: &[
        scalar(1, "date_received"),
        scalar(2, "date_server_sent"),
        scalar(3, "read"),
        scalar(4, "sealed_sender"),
    ],
};

static OUTGOING: MessageDescriptor = empty("OutgoingMessageDetails");
static DIRECTIONLESS: MessageDescriptor = empty("DirectionlessMessageDetails");
static REMOTE_DELETED: MessageDescriptor = empty("RemoteDeletedMessage");

static STANDARD_MESSAGE: MessageDescriptor = MessageDescriptor {
    name: "StandardMessage",
    fields: &[nested(1, "text", &TEXT), nested(5, "reactions", &REACTION)],
};

static TEXT: MessageDescriptor = MessageDescriptor {
    name: "Text",
    fields: &[scalar(1, "body"), nested(2, "body_ranges", &BODY_RANGE)],
};

static BODY_RANGE: MessageDescriptor = MessageDescriptor {
    name: "BodyRange",
    fields: &[scalar(1, "start"), scalar(2, "length"), scalar(3, "mention_aci"), scalar(4, "style")],
};

static REACTION: MessageDescriptor = MessageDescriptor {
    name: "Reaction",
    fields: &[
        scalar(1, "emoji"),
        scalar(2, "author_id"),
        scalar(3, "sent_timestamp"),
        scalar(4, "sort_order"),
    ],
};

static STICKER_PACK: MessageDescriptor = MessageDescriptor {
    name: "StickerPack",
    fields: &[scalar(1, "pack_id"), scalar(2, "pack_key")],
};

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_START_GROUP: u8 = 3;
const WIRE_END_GROUP: u8 = 4;
const WIRE_FIXED32: u8 = 5;

/// Deepest group nesting skipped before giving up
const MAX_GROUP_DEPTH: usize = 100;

/// Report every field in `bytes` that `descriptor` does not declare.
///
/// Results are sorted and deduplicated: a repeated message with the same
/// unknown field is reported once.
///
/// # Errors
///
/// - `ProtoError::Decode` on malformed wire data
/// - `ProtoError::UnsupportedWireType` for reserved wire types or an end-group
///   tag without a matching start
pub fn scan_unknown_fields(
    bytes: &[u8],
    descriptor: &'static MessageDescriptor,
) -> Result<Vec<UnknownField>> {
    let mut found = BTreeSet::new();
    scan_message(bytes, descriptor, descriptor.name, &mut found)?;
    Ok(found.into_iter().collect())
}

fn scan_message(
    mut bytes: &[u8],
    descriptor: &'static MessageDescriptor,
    path: &str,
    found: &mut BTreeSet<UnknownField>,
) -> Result<()> {
    while !bytes.is_empty() {
        let key = take_varint(&mut bytes, descriptor)?;
        let field = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;

        let known = descriptor.fields.iter().find(|f| f.number == field);
        if known.is_none() {
            found.insert(UnknownField { path: path.to_string(), field });
        }

        match wire_type {
            WIRE_VARINT => {
                take_varint(&mut bytes, descriptor)?;
            },
            WIRE_FIXED64 => take_bytes(&mut bytes, 8, descriptor).map(|_| ())?,
            WIRE_FIXED32 => take_bytes(&mut bytes, 4, descriptor).map(|_| ())?,
            WIRE_LEN => {
                let len = take_varint(&mut bytes, descriptor)?;
                let len = usize::try_from(len).map_err(|_| malformed(descriptor))?;
                let payload = take_bytes(&mut bytes, len, descriptor)?;

                if let Some(&FieldDescriptor { name, message: Some(nested), .. }) = known {
                    let nested_path = format!("{path}.{name}");
                    scan_message(payload, nested, &nested_path, found)?;
                }
            },
            WIRE_START_GROUP => skip_group(&mut bytes, field, descriptor, path, 1)?,
            other => return Err(unsupported(path, field, other)),
        }
    }

    Ok(())
}

/// Skip a group body up to the end-group tag for `field`.
///
/// Group contents are opaque: fields inside an unknown group are not
/// reported separately.
fn skip_group(
    bytes: &mut &[u8],
    field: u32,
    descriptor: &MessageDescriptor,
    path: &str,
    depth: usize,
) -> Result<()> {
    if depth > MAX_GROUP_DEPTH {
        return Err(ProtoError::Decode {
            message: descriptor.name,
            reason: "groups nested too deeply".to_string(),
        });
    }

    loop {
        if bytes.is_empty() {
            return Err(malformed(descriptor));
        }
        let key = take_varint(bytes, descriptor)?;
        let inner = (key >> 3) as u32;

        match (key & 0x7) as u8 {
            WIRE_VARINT => {
                take_varint(bytes, descriptor)?;
            },
            WIRE_FIXED64 => take_bytes(bytes, 8, descriptor).map(|_| ())?,
            WIRE_FIXED32 => take_bytes(bytes, 4, descriptor).map(|_| ())?,
            WIRE_LEN => {
                let len = take_varint(bytes, descriptor)?;
                let len = usize::try_from(len).map_err(|_| malformed(descriptor))?;
                take_bytes(bytes, len, descriptor)?;
            },
            WIRE_START_GROUP => skip_group(bytes, inner, descriptor, path, depth + 1)?,
            WIRE_END_GROUP if inner == field => return Ok(()),
            other => return Err(unsupported(path, inner, other)),
        }
    }
}

fn unsupported(path: &str, field: u32, wire_type: u8) -> ProtoError {
    ProtoError::UnsupportedWireType { path: path.to_string(), field, wire_type }
}

fn take_varint(bytes: &mut &[u8], descriptor: &MessageDescriptor) -> Result<u64> {
    let (value, consumed) = decode_varint(*bytes)?.ok_or_else(|| malformed(descriptor))?;
    *bytes = &bytes[consumed..];
    Ok(value)
}

fn take_bytes<'a>(
    bytes: &mut &'a [u8],
    len: usize,
    descriptor: &MessageDescriptor,
) -> Result<&'a [u8]> {
    if bytes.len() < len {
        return Err(malformed(descriptor));
    }
    let (head, tail) = bytes.split_at(len);
    *bytes = tail;
    Ok(head)
}

fn malformed(descriptor: &MessageDescriptor) -> ProtoError {
    ProtoError::Decode { message: descriptor.name, reason: "truncated field".to_string() }
}
