//! Integration tests for streaming validation of encrypted backups.
//!
//! # Oracle Pattern
//!
//! Every test that touches a stream ends by checking the factory counters:
//! exactly one stream opened, and every opened stream closed, whatever the
//! outcome.

use backupframe_core::{Purpose, ReadError, ReadLimits, validate, validate_with_limits};
use backupframe_crypto::{
    AccountEntropyPool, BackupForwardSecrecyToken, BackupKey, MIN_CONTAINER_LEN, MessageBackupKey,
    MessageBackupKeySource, seal_container,
};
use backupframe_harness::{
    SampleBackup, StreamCounters, failing_factory, faulty_factory, fixtures, gzip,
    init_test_logging, is_injected, minimal_backup, test_key, tracked_factory,
};

fn assert_closed_once(counters: &StreamCounters) {
    assert_eq!(counters.opened(), 1, "exactly one stream opened");
    assert_eq!(counters.closed(), 1, "opened stream closed");
}

#[tokio::test]
async fn minimal_backup_is_valid() {
    init_test_logging();
    let encrypted = minimal_backup().to_encrypted_seeded(&test_key(), 1);
    let len = encrypted.len() as u64;
    let (factory, counters) = tracked_factory(encrypted);

    let outcome =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");

    assert_eq!(outcome.error_message, None);
    assert!(outcome.warnings.is_empty());
    assert!(outcome.is_valid());
    assert_closed_once(&counters);
}

#[tokio::test]
async fn sample_backup_is_valid_for_both_purposes() {
    let encrypted = SampleBackup::new().builder().to_encrypted_seeded(&test_key(), 2);
    let len = encrypted.len() as u64;

    for purpose in [Purpose::DeviceTransfer, Purpose::RemoteBackup] {
        let (factory, counters) = tracked_factory(encrypted.clone());
        let outcome = validate(&test_key(), purpose, factory, len).await.expect("stream readable");

        assert_eq!(outcome.error_message, None, "{purpose:?}");
        assert_closed_once(&counters);
    }
}

#[tokio::test]
async fn empty_stream_is_unexpected_eof() {
    let (factory, counters) = tracked_factory(Vec::new());

    let result = validate(&test_key(), Purpose::RemoteBackup, factory, 128).await;

    assert!(matches!(result, Err(ReadError::UnexpectedEof)));
    assert_closed_once(&counters);
}

#[tokio::test]
async fn stream_shorter_than_declared_is_unexpected_eof() {
    let encrypted = minimal_backup().to_encrypted_seeded(&test_key(), 3);
    let len = encrypted.len() as u64;
    let (factory, counters) = tracked_factory(encrypted);

    let result = validate(&test_key(), Purpose::RemoteBackup, factory, len + 1).await;

    assert!(matches!(result, Err(ReadError::UnexpectedEof)));
    assert_closed_once(&counters);
}

#[tokio::test]
async fn declared_length_below_container_minimum_is_unexpected_eof() {
    let encrypted = minimal_backup().to_encrypted_seeded(&test_key(), 4);
    let (factory, counters) = tracked_factory(encrypted);

    let result =
        validate(&test_key(), Purpose::RemoteBackup, factory, (MIN_CONTAINER_LEN - 1) as u64)
            .await;

    assert!(matches!(result, Err(ReadError::UnexpectedEof)));
    assert_closed_once(&counters);
}

#[tokio::test]
async fn stream_fault_is_returned_unchanged() {
    let encrypted = minimal_backup().to_encrypted_seeded(&test_key(), 5);
    let len = encrypted.len() as u64;
    let (factory, counters) = faulty_factory(encrypted[..20].to_vec());

    let result = validate(&test_key(), Purpose::RemoteBackup, factory, len).await;

    match result {
        Err(ReadError::Io(err)) => assert!(is_injected(&err), "unexpected error: {err}"),
        other => panic!("expected injected fault, got {other:?}"),
    }
    assert_closed_once(&counters);
}

#[tokio::test]
async fn open_failure_is_returned_unchanged() {
    let result = validate(&test_key(), Purpose::RemoteBackup, failing_factory(), 128).await;

    match result {
        Err(ReadError::Io(err)) => assert!(is_injected(&err)),
        other => panic!("expected injected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn bytes_past_declared_length_are_never_requested() {
    let mut encrypted = minimal_backup().to_encrypted_seeded(&test_key(), 6);
    let len = encrypted.len() as u64;
    encrypted.extend_from_slice(b"trailing junk the validator must not read");
    let (factory, counters) = tracked_factory(encrypted);

    let outcome =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");

    assert!(outcome.is_valid());
    assert_closed_once(&counters);
}

#[tokio::test]
async fn wrong_key_reports_mac_mismatch() {
    let encrypted = minimal_backup().to_encrypted_seeded(&test_key(), 7);
    let len = encrypted.len() as u64;
    let wrong_key = MessageBackupKey::derive(
        &BackupKey::from_bytes([9; 32]),
        &backupframe_crypto::BackupId::from_bytes([9; 16]),
        None,
    );
    let (factory, counters) = tracked_factory(encrypted);

    let outcome =
        validate(&wrong_key, Purpose::RemoteBackup, factory, len).await.expect("stream readable");

    assert_eq!(outcome.error_message.as_deref(), Some("HMAC doesn't match"));
    assert_closed_once(&counters);
}

#[tokio::test]
async fn key_entry_points_agree() {
    let Ok(pool) = fixtures::TEST_ENTROPY_POOL.parse::<AccountEntropyPool>() else {
        panic!("fixture pool is valid");
    };
    let backup_key = BackupKey::derive_from_account_entropy_pool(&pool);
    let backup_id = backup_key.derive_backup_id(&fixtures::TEST_ACI);
    let token = BackupForwardSecrecyToken::from_bytes([0x70; 32]);

    let from_pool = MessageBackupKey::from_source(
        &MessageBackupKeySource::AccountEntropy { pool, aci: fixtures::TEST_ACI },
        Some(&token),
    );
    let from_key = MessageBackupKey::from_source(
        &MessageBackupKeySource::BackupKey { key: backup_key, id: backup_id },
        Some(&token),
    );

    let encrypted = minimal_backup().to_encrypted_seeded(&from_pool, 8);
    let len = encrypted.len() as u64;

    let (factory, _) = tracked_factory(encrypted.clone());
    let outcome =
        validate(&from_key, Purpose::RemoteBackup, factory, len).await.expect("stream readable");
    assert!(outcome.is_valid(), "{:?}", outcome.error_message);

    // Without the token the keys differ.
    let (factory, _) = tracked_factory(encrypted);
    let outcome =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");
    assert_eq!(outcome.error_message.as_deref(), Some("HMAC doesn't match"));
}

#[tokio::test]
async fn payload_that_is_not_gzip_is_a_finding() {
    let encrypted = seal_container(&test_key(), [3; 16], &minimal_backup().to_plaintext());
    let len = encrypted.len() as u64;
    let (factory, counters) = tracked_factory(encrypted);

    let outcome =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");

    let message = outcome.error_message.expect("not gzip");
    assert!(message.starts_with("failed to decompress backup"), "{message}");
    assert_closed_once(&counters);
}

#[tokio::test]
async fn oversized_payload_is_a_finding() {
    let plaintext = SampleBackup::new().builder().to_plaintext();
    let encrypted = seal_container(&test_key(), [4; 16], &gzip(&plaintext));
    let len = encrypted.len() as u64;
    let limits = ReadLimits { max_plaintext_len: plaintext.len() - 1, ..ReadLimits::default() };
    let (factory, _) = tracked_factory(encrypted);

    let outcome = validate_with_limits(&test_key(), Purpose::RemoteBackup, factory, len, limits)
        .await
        .expect("stream readable");

    let message = outcome.error_message.expect("over limit");
    assert!(message.starts_with("decompressed backup exceeds"), "{message}");
}

#[tokio::test]
async fn bytes_after_gzip_stream_are_a_finding() {
    let mut payload = gzip(&minimal_backup().to_plaintext());
    payload.extend_from_slice(b"trailing junk");
    let encrypted = seal_container(&test_key(), [5; 16], &payload);
    let len = encrypted.len() as u64;
    let (factory, counters) = tracked_factory(encrypted);

    let outcome =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");

    assert_eq!(
        outcome.error_message.as_deref(),
        Some("13 bytes of trailing data after compressed backup")
    );
    assert_closed_once(&counters);
}

#[tokio::test]
async fn declared_length_over_container_limit_is_a_finding() {
    let encrypted = minimal_backup().to_encrypted_seeded(&test_key(), 6);
    let len = encrypted.len() as u64;
    let limits = ReadLimits { max_container_len: len - 1, ..ReadLimits::default() };
    let (factory, counters) = tracked_factory(encrypted);

    let outcome = validate_with_limits(&test_key(), Purpose::RemoteBackup, factory, len, limits)
        .await
        .expect("nothing read");

    let message = outcome.error_message.expect("over limit");
    assert!(message.starts_with(&format!("backup of {len} bytes exceeds")), "{message}");
    assert_eq!((counters.opened(), counters.closed()), (0, 0));

    // At the limit it is read as usual
    let limits = ReadLimits { max_container_len: len, ..ReadLimits::default() };
    let (factory, counters) = tracked_factory(minimal_backup().to_encrypted_seeded(&test_key(), 6));
    let outcome = validate_with_limits(&test_key(), Purpose::RemoteBackup, factory, len, limits)
        .await
        .expect("stream readable");
    assert!(outcome.is_valid(), "{:?}", outcome.error_message);
    assert_closed_once(&counters);
}

#[tokio::test]
async fn missing_self_recipient_is_a_finding() {
    let builder = backupframe_harness::BackupBuilder::new(&fixtures::backup_info())
        .frame(&fixtures::account_frame());
    let encrypted = builder.to_encrypted_seeded(&test_key(), 9);
    let len = encrypted.len() as u64;
    let (factory, _) = tracked_factory(encrypted);

    let outcome =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");

    assert_eq!(outcome.error_message.as_deref(), Some("no Self recipient found"));
}

#[tokio::test]
async fn short_timer_is_rejected_only_for_remote_backups() {
    let mut item = fixtures::outgoing_text_frame(10, 1_700_000_000_000, "bye soon");
    if let Some(backupframe_proto::schema::frame::Item::ChatItem(chat_item)) = &mut item.item {
        chat_item.expires_in_ms = Some(60 * 60 * 1000);
    }
    let encrypted = minimal_backup()
        .frame(&fixtures::contact_frame(2, 0xa2))
        .frame(&fixtures::chat_frame(10, 2))
        .frame(&item)
        .to_encrypted_seeded(&test_key(), 10);
    let len = encrypted.len() as u64;

    let (factory, _) = tracked_factory(encrypted.clone());
    let transfer = validate(&test_key(), Purpose::DeviceTransfer, factory, len)
        .await
        .expect("stream readable");
    assert!(transfer.is_valid(), "{:?}", transfer.error_message);

    let (factory, _) = tracked_factory(encrypted);
    let remote =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");
    assert!(!remote.is_valid());
}

#[tokio::test]
async fn unknown_fields_are_warnings() {
    // Field 99, varint, value 1
    let mut account = prost::Message::encode_to_vec(&fixtures::account_frame());
    account.extend_from_slice(&[0x98, 0x06, 0x01]);

    let encrypted = backupframe_harness::BackupBuilder::new(&fixtures::backup_info())
        .raw_frame(account)
        .frame(&fixtures::self_recipient_frame())
        .to_encrypted_seeded(&test_key(), 11);
    let len = encrypted.len() as u64;
    let (factory, _) = tracked_factory(encrypted);

    let outcome =
        validate(&test_key(), Purpose::RemoteBackup, factory, len).await.expect("stream readable");

    assert!(outcome.is_valid());
    assert_eq!(outcome.warnings, vec!["Frame: unknown field 99".to_string()]);
}
