//! Test harness for backup validation.
//!
//! Deterministic building blocks for exercising the validators: byte-exact
//! backups assembled from records, a sample backup covering every record kind,
//! and streams that count their lifecycle or fail on demand.
//!
//! # Determinism
//!
//! Randomness only enters through explicit seeds (`ChaCha20Rng`), so a failing
//! property test reproduces from its seed alone.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
pub mod fixtures;
pub mod stream;

pub use builder::{BackupBuilder, gzip};
pub use fixtures::{SELF_ID, SampleBackup, minimal_backup, test_key};
pub use stream::{
    FaultyStream, InjectedFault, StreamCounters, TrackedStream, failing_factory, faulty_factory,
    is_injected, tracked_factory,
};

use tracing_subscriber::{EnvFilter, fmt};

/// Route `tracing` output to the test writer.
///
/// Honors `RUST_LOG` and defaults to `debug` for the backupframe crates. Safe
/// to call from every test; only the first call installs a subscriber.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("backupframe_core=debug,backupframe_proto=debug"));

    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}
