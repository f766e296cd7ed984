//! Message bodies and their formatting ranges.

use backupframe_proto::schema::{
    self as proto,
    body_range::{AssociatedValue, Style as ProtoStyle},
};
use serde::Serialize;
use thiserror::Error;

use super::{recipient::uuid, serialize::as_hex};

/// Longest accepted body, in bytes
pub const MAX_BODY_LENGTH: usize = 128 * 1024;

/// Validated [`proto::Text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageText {
    /// Body, between 1 and [`MAX_BODY_LENGTH`] bytes
    pub text: String,
    /// Formatting, in backup order
    pub ranges: Vec<TextRange>,
}

/// Validated [`proto::BodyRange`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TextRange {
    /// Start offset
    pub start: u32,
    /// Range length
    pub length: u32,
    /// What the range applies
    pub effect: TextEffect,
}

/// What a [`TextRange`] applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TextEffect {
    /// Mention of an account
    MentionAci(#[serde(serialize_with = "as_hex")] [u8; 16]),
    /// Text style
    Style(TextStyle),
}

/// Text styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TextStyle {
    /// No style
    None,
    /// Bold
    Bold,
    /// Italic
    Italic,
    /// Hidden until tapped
    Spoiler,
    /// Strikethrough
    Strikethrough,
    /// Fixed width
    Monospace,
}

/// Problems with a message body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    /// Body is empty
    #[error("body was empty")]
    EmptyBody,

    /// Body exceeds [`MAX_BODY_LENGTH`]
    #[error("body was {0} bytes (too long)")]
    TooLongBody(usize),

    /// Mention does not carry a UUID
    #[error("mention had invalid ACI")]
    MentionInvalidAci,

    /// Range without a style or mention
    #[error("BodyRange.associated_value is a oneof but has no value")]
    NoAssociatedValueForBodyRange,
}

impl From<ProtoStyle> for TextStyle {
    fn from(value: ProtoStyle) -> Self {
        match value {
            ProtoStyle::None => Self::None,
            ProtoStyle::Bold => Self::Bold,
            ProtoStyle::Italic => Self::Italic,
            ProtoStyle::Spoiler => Self::Spoiler,
            ProtoStyle::Strikethrough => Self::Strikethrough,
            ProtoStyle::Monospace => Self::Monospace,
        }
    }
}

impl TryFrom<proto::Text> for MessageText {
    type Error = TextError;

    fn try_from(value: proto::Text) -> Result<Self, Self::Error> {
        let proto::Text { body, body_ranges } = value;

        match body.len() {
            0 => return Err(TextError::EmptyBody),
            1..=MAX_BODY_LENGTH => {},
            len => return Err(TextError::TooLongBody(len)),
        }

        let ranges = body_ranges.into_iter().map(TextRange::try_from).collect::<Result<_, _>>()?;

        Ok(Self { text: body, ranges })
    }
}

impl TryFrom<proto::BodyRange> for TextRange {
    type Error = TextError;

    fn try_from(value: proto::BodyRange) -> Result<Self, Self::Error> {
        let proto::BodyRange { start, length, associated_value } = value;

        let effect = match associated_value.ok_or(TextError::NoAssociatedValueForBodyRange)? {
            AssociatedValue::MentionAci(aci) => {
                TextEffect::MentionAci(uuid(&aci).ok_or(TextError::MentionInvalidAci)?)
            },
            // Styles from newer clients degrade to no style
            AssociatedValue::Style(style) => {
                TextEffect::Style(ProtoStyle::try_from(style).unwrap_or(ProtoStyle::None).into())
            },
        };

        Ok(Self { start, length, effect })
    }
}

impl MessageText {
    /// Sort ranges so equivalent bodies compare equal regardless of the
    /// order ranges were written in.
    pub(crate) fn normalize(&mut self) {
        self.ranges.sort_unstable();
    }
}
