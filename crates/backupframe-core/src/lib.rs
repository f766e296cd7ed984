//! Backupframe validation core
//!
//! Checks that a message backup is well formed and turns valid backups into
//! a canonical form for comparison.
//!
//! # Entry Points
//!
//! - [`validate`]: read, authenticate, decrypt and check a whole encrypted
//!   backup from a caller-supplied stream
//! - [`OnlineBackupValidator`]: check frames one at a time as they are
//!   produced, without any cryptography
//! - [`ComparableBackup`]: validate an unencrypted backup and render it as
//!   order-independent JSON
//!
//! All three feed the same accumulator ([`backup::PartialBackup`]), so a
//! frame is held to the same rules whichever path it takes.
//!
//! # Error Channels
//!
//! Stream faults ([`ReadError`]) and content findings ([`ValidationError`])
//! never mix. [`validate`] returns the first as `Err` and reports the second
//! in its [`ValidationOutcome`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backup;
pub mod comparable;
pub mod error;
mod frames;
pub mod online;
pub mod stream;
pub mod validator;

pub use backup::{CompletedBackup, PartialBackup, Purpose, Retention};
pub use comparable::{ComparableBackup, ComparableBackupError};
pub use error::{ReadError, ValidationError};
pub use online::OnlineBackupValidator;
pub use stream::{ReadLimits, StreamFactory};
pub use validator::{ValidationOutcome, validate, validate_with_limits};
