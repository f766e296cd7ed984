//! Conversation participants.
//!
//! Uniqueness of ids and of the Self and release notes recipients is a
//! property of the whole backup and is enforced by the accumulator; this
//! module only checks a single frame in isolation.

use backupframe_proto::schema::{self as proto, recipient::Destination as ProtoDestination};
use serde::Serialize;
use thiserror::Error;

use super::serialize::{as_hex, opt_as_hex};

/// UUID length for ACIs and PNIs
const UUID_LEN: usize = 16;

/// Group master key length
const GROUP_MASTER_KEY_LEN: usize = 32;

/// Validated recipient kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Destination {
    /// Another account
    Contact(Contact),
    /// Group conversation
    Group(Group),
    /// The backup owner
    #[serde(rename = "Self")]
    SelfRecipient,
    /// Release notes channel
    ReleaseNotes,
}

/// Validated [`proto::Contact`].
///
/// # Invariants
///
/// - At least one of `aci`, `pni`, `e164` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    /// ACI UUID
    #[serde(serialize_with = "opt_as_hex")]
    pub aci: Option<[u8; UUID_LEN]>,
    /// PNI UUID
    #[serde(serialize_with = "opt_as_hex")]
    pub pni: Option<[u8; UUID_LEN]>,
    /// Username
    pub username: Option<String>,
    /// Phone number
    pub e164: Option<u64>,
    /// Whether the contact is blocked
    pub blocked: bool,
    /// Profile given name
    pub profile_given_name: Option<String>,
    /// Profile family name
    pub profile_family_name: Option<String>,
}

/// Validated [`proto::Group`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Group master key
    #[serde(serialize_with = "as_hex")]
    pub master_key: [u8; GROUP_MASTER_KEY_LEN],
    /// Whether the group is on the profile sharing whitelist
    pub whitelisted: bool,
    /// Whether stories from this group are hidden
    pub hide_story: bool,
}

/// Problems with a `Recipient` frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipientError {
    /// Id already used by an earlier recipient
    #[error("duplicate recipient id")]
    DuplicateId,

    /// `destination` oneof is empty
    #[error("Recipient.destination is a oneof but has no value")]
    MissingDestination,

    /// A second Self recipient
    #[error("multiple Self recipients (previous id {0})")]
    DuplicateSelf(u64),

    /// A second release notes recipient
    #[error("multiple ReleaseNotes recipients (previous id {0})")]
    DuplicateReleaseNotes(u64),

    /// Contact with nothing to address it by
    #[error("contact has no ACI, PNI, or e164")]
    ContactWithoutIdentifier,

    /// ACI is not a UUID
    #[error("contact ACI was {0} bytes, expected 16")]
    InvalidAci(usize),

    /// PNI is not a UUID
    #[error("contact PNI was {0} bytes, expected 16")]
    InvalidPni(usize),

    /// Group master key has the wrong length
    #[error("group master key was {0} bytes, expected 32")]
    InvalidGroupMasterKey(usize),
}

impl Destination {
    /// Returns true for the backup owner.
    pub fn is_self(&self) -> bool {
        matches!(self, Self::SelfRecipient)
    }
}

impl TryFrom<proto::Recipient> for Destination {
    type Error = RecipientError;

    fn try_from(value: proto::Recipient) -> Result<Self, Self::Error> {
        match value.destination.ok_or(RecipientError::MissingDestination)? {
            ProtoDestination::Contact(contact) => Ok(Self::Contact(contact.try_into()?)),
            ProtoDestination::Group(group) => Ok(Self::Group(group.try_into()?)),
            ProtoDestination::SelfRecipient(proto::SelfRecipient {}) => Ok(Self::SelfRecipient),
            ProtoDestination::ReleaseNotes(proto::ReleaseNotes {}) => Ok(Self::ReleaseNotes),
        }
    }
}

impl TryFrom<proto::Contact> for Contact {
    type Error = RecipientError;

    fn try_from(value: proto::Contact) -> Result<Self, Self::Error> {
        let proto::Contact {
            aci,
            pni,
            username,
            e164,
            blocked,
            profile_given_name,
            profile_family_name,
        } = value;

        let aci = aci.map(|bytes| uuid(&bytes).ok_or(RecipientError::InvalidAci(bytes.len())));
        let aci = aci.transpose()?;
        let pni = pni.map(|bytes| uuid(&bytes).ok_or(RecipientError::InvalidPni(bytes.len())));
        let pni = pni.transpose()?;

        if aci.is_none() && pni.is_none() && e164.is_none() {
            return Err(RecipientError::ContactWithoutIdentifier);
        }

        Ok(Self { aci, pni, username, e164, blocked, profile_given_name, profile_family_name })
    }
}

impl TryFrom<proto::Group> for Group {
    type Error = RecipientError;

    fn try_from(value: proto::Group) -> Result<Self, Self::Error> {
        let proto::Group { master_key, whitelisted, hide_story } = value;
        let master_key = <[u8; GROUP_MASTER_KEY_LEN]>::try_from(master_key.as_slice())
            .map_err(|_| RecipientError::InvalidGroupMasterKey(master_key.len()))?;
        Ok(Self { master_key, whitelisted, hide_story })
    }
}

pub(crate) fn uuid(bytes: &[u8]) -> Option<[u8; UUID_LEN]> {
    bytes.try_into().ok()
}
