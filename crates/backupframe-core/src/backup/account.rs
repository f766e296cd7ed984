//! Account-wide data.

use backupframe_proto::schema as proto;
use serde::Serialize;
use thiserror::Error;

use super::serialize::as_hex;

/// Profile key length
const PROFILE_KEY_LEN: usize = 32;

/// Validated [`proto::AccountData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountData {
    /// Profile key
    #[serde(serialize_with = "as_hex")]
    pub profile_key: [u8; PROFILE_KEY_LEN],
    /// Registered username, never empty
    pub username: Option<String>,
    /// Profile given name
    pub given_name: String,
    /// Profile family name
    pub family_name: String,
    /// CDN path of the profile avatar
    pub avatar_url_path: String,
}

/// Problems with an `AccountData` frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountDataError {
    /// Profile key has the wrong length
    #[error("profile key was {0} bytes, expected 32")]
    InvalidProfileKey(usize),

    /// Username field present but empty
    #[error("username was present but empty")]
    EmptyUsername,

    /// A second `AccountData` frame
    #[error("multiple AccountData frames")]
    Duplicate,
}

impl TryFrom<proto::AccountData> for AccountData {
    type Error = AccountDataError;

    fn try_from(value: proto::AccountData) -> Result<Self, Self::Error> {
        let proto::AccountData { profile_key, username, given_name, family_name, avatar_url_path } =
            value;

        let profile_key = <[u8; PROFILE_KEY_LEN]>::try_from(profile_key.as_slice())
            .map_err(|_| AccountDataError::InvalidProfileKey(profile_key.len()))?;

        if username.as_deref() == Some("") {
            return Err(AccountDataError::EmptyUsername);
        }

        Ok(Self { profile_key, username, given_name, family_name, avatar_url_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> proto::AccountData {
        proto::AccountData {
            profile_key: vec![0x5a; 32],
            username: Some("reader.42".into()),
            given_name: "Ada".into(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_account_data() {
        let account = AccountData::try_from(account()).expect("valid");
        assert_eq!(account.profile_key, [0x5a; 32]);
        assert_eq!(account.username.as_deref(), Some("reader.42"));
    }

    #[test]
    fn short_profile_key_rejected() {
        let mut proto = account();
        proto.profile_key.truncate(31);
        assert_eq!(AccountData::try_from(proto), Err(AccountDataError::InvalidProfileKey(31)));
    }

    #[test]
    fn empty_username_rejected() {
        let mut proto = account();
        proto.username = Some(String::new());
        assert_eq!(AccountData::try_from(proto), Err(AccountDataError::EmptyUsername));
    }

    #[test]
    fn absent_username_accepted() {
        let mut proto = account();
        proto.username = None;
        assert!(AccountData::try_from(proto).is_ok());
    }
}
