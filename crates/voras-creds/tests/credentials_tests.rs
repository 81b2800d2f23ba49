use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use parking_lot::Mutex;
use std::sync::Arc;
use voras_kvstore::WatchEvent;
use voras_creds::prelude::*;
use voras_cps::PropertyStore;
use voras_test_utils::{store_with, temp_store, TEST_FALLBACK_KEY, TEST_KEY};

fn encrypter() -> Encrypter {
    Encrypter::new(EncryptionKey::from_bytes(TEST_KEY))
}

#[test]
fn encrypted_round_trip_with_metadata() {
    let (_dir, store) = temp_store();
    let creds = CredentialsService::new(store.clone()).with_encrypter(encrypter());
    let when = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    let metadata = CredentialsMetadata::default()
        .with_description("plex admin")
        .with_last_updated_user("alice")
        .with_last_updated_time(when);
    let secret = Credentials::UsernamePassword {
        username: "IBMUSER".into(),
        password: "SYS1".into(),
    };

    creds.set("PLEX1", &secret, &metadata).unwrap();

    let raw = store.get("secure.credentials.PLEX1.password").unwrap().unwrap();
    assert!(raw.starts_with("aes:"));
    assert!(!raw.contains("SYS1"));

    let got = creds.get("PLEX1").unwrap().unwrap();
    assert_eq!(got.credentials, secret);
    assert_eq!(got.metadata, metadata);
}

#[test]
fn reads_plain_and_base64_values() {
    let (_dir, store) = store_with([
        ("secure.credentials.A.username", "plainuser"),
        ("secure.credentials.A.token", "base64:dG9r"),
        ("secure.credentials.B.token", "raw-token"),
    ]);
    let creds = CredentialsService::new(store);

    assert_eq!(
        creds.get("A").unwrap().unwrap().credentials,
        Credentials::UsernameToken {
            username: "plainuser".into(),
            token: "tok".into(),
        }
    );
    assert_eq!(
        creds.get("B").unwrap().unwrap().credentials,
        Credentials::Token {
            token: "raw-token".into()
        }
    );
    assert_eq!(creds.get("C").unwrap(), None);
}

#[test]
fn changing_kind_removes_stale_secret_fields() {
    let (_dir, store) = temp_store();
    let creds = CredentialsService::new(store.clone());
    let meta = CredentialsMetadata::default();

    creds
        .set(
            "X",
            &Credentials::UsernamePassword {
                username: "u".into(),
                password: "p".into(),
            },
            &meta,
        )
        .unwrap();
    creds
        .set("X", &Credentials::Token { token: "t".into() }, &meta)
        .unwrap();

    assert_eq!(store.get("secure.credentials.X.password").unwrap(), None);
    assert_eq!(
        creds.get("X").unwrap().unwrap().credentials,
        Credentials::Token { token: "t".into() }
    );
}

#[test]
fn rotated_keys_still_decrypt() {
    let (_dir, store) = temp_store();
    let old = Encrypter::new(EncryptionKey::from_bytes(TEST_FALLBACK_KEY));
    CredentialsService::new(store.clone())
        .with_encrypter(old)
        .set(
            "OLD",
            &Credentials::Username {
                username: "legacy".into(),
            },
            &CredentialsMetadata::default(),
        )
        .unwrap();

    let without_fallback = CredentialsService::new(store.clone()).with_encrypter(encrypter());
    let err = without_fallback.get("OLD").unwrap_err();
    assert!(err.is_decode_failure());

    let rotated = CredentialsService::new(store).with_encrypter(
        encrypter().with_fallback(EncryptionKey::from_bytes(TEST_FALLBACK_KEY)),
    );
    assert_eq!(
        rotated.get("OLD").unwrap().unwrap().credentials.username(),
        Some("legacy")
    );
}

#[test]
fn list_and_delete() {
    let (_dir, store) = store_with([
        ("secure.credentials.A.username", "a"),
        ("secure.credentials.B.token", "b"),
        ("secure.other.C", "c"),
    ]);
    let creds = CredentialsService::new(Arc::clone(&store) as Arc<dyn PropertyStore>);

    let ids: Vec<String> = creds.list().unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["A", "B"]);

    creds.delete("A").unwrap();
    assert_eq!(creds.ids().unwrap().into_iter().collect::<Vec<_>>(), vec!["B"]);
    assert_eq!(store.get("secure.other.C").unwrap().as_deref(), Some("c"));
}

#[test]
fn incomplete_and_invalid_ids() {
    let (_dir, store) = store_with([("secure.credentials.P.password", "orphan")]);
    let creds = CredentialsService::new(store);

    assert!(matches!(creds.get("P"), Err(CredentialsError::Incomplete { .. })));
    assert!(matches!(creds.get("a.b"), Err(CredentialsError::InvalidId(_))));
    assert!(matches!(creds.get(""), Err(CredentialsError::InvalidId(_))));
}

#[test]
fn readers_never_see_a_half_written_entry() {
    let (_dir, store) = temp_store();
    let creds = CredentialsService::new(store.clone());
    creds
        .set("A", &Credentials::Token { token: "t0".into() }, &CredentialsMetadata::default())
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (reader, sink) = (creds.clone(), Arc::clone(&seen));
    store.watch(
        Arc::new(move |_: &str, _: WatchEvent, _: Option<&str>, _: Option<&str>| {
            let kind = reader
                .get("A")
                .ok()
                .flatten()
                .map(|c| c.credentials.kind());
            sink.lock().push(kind);
        }),
        "secure.credentials.A.username",
    );

    creds
        .set(
            "A",
            &Credentials::UsernamePassword {
                username: "u".into(),
                password: "p".into(),
            },
            &CredentialsMetadata::default(),
        )
        .unwrap();

    assert_eq!(*seen.lock(), vec![Some("UsernamePassword")]);
    assert_eq!(store.get("secure.credentials.A.token").unwrap(), None);
}

#[test]
fn description_is_stored_verbatim() {
    let (_dir, store) = temp_store();
    let creds = CredentialsService::new(store).with_encrypter(encrypter());
    let metadata = CredentialsMetadata::default().with_description("base64:see wiki");
    creds
        .set("B", &Credentials::Username { username: "u".into() }, &metadata)
        .unwrap();
    creds
        .set(
            "C",
            &Credentials::Username { username: "v".into() },
            &CredentialsMetadata::default().with_description("aes:not a secret"),
        )
        .unwrap();

    assert_eq!(creds.get("B").unwrap().unwrap().metadata, metadata);
    let descriptions: Vec<Option<String>> = creds
        .list()
        .unwrap()
        .into_iter()
        .map(|c| c.metadata.description)
        .collect();
    assert_eq!(
        descriptions,
        vec![Some("base64:see wiki".to_string()), Some("aes:not a secret".to_string())]
    );
}

#[test]
fn rewrite_replaces_metadata() {
    let (_dir, store) = temp_store();
    let creds = CredentialsService::new(store.clone());
    let user = Credentials::Username { username: "u".into() };
    creds
        .set(
            "M",
            &user,
            &CredentialsMetadata::default()
                .with_description("old")
                .with_last_updated_user("alice")
                .with_last_updated_time(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        )
        .unwrap();
    creds.set("M", &user, &CredentialsMetadata::default()).unwrap();

    let got = creds.get("M").unwrap().unwrap();
    assert_eq!(got.metadata, CredentialsMetadata::default());
    assert_eq!(store.get("secure.credentials.M.lastUpdated.user").unwrap(), None);
}
