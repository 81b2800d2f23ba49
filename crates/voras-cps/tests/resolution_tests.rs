use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use voras_cps::prelude::*;
use voras_cps::{AccessRecord, AccessSource};
use voras_test_utils::store_with;

const NO_INFIXES: [&str; 0] = [];

fn plexma() -> (tempfile::TempDir, ConfigurationPropertyStore) {
    let (dir, store) = store_with([
        ("zos.image.PLEXMA.credentialid", "Waddup"),
        ("zos.image.PLEXMA.MVMA.credentialid", "Spoon"),
    ]);
    (dir, ConfigurationPropertyStore::new(store))
}

#[test]
fn most_specific_infix_wins() {
    let (_dir, cps) = plexma();
    let zos = cps.namespace("zos").unwrap();

    assert_eq!(
        zos.get_property("image", "credentialid", &["PLEXMA", "MVMA"])
            .unwrap()
            .as_deref(),
        Some("Spoon")
    );
    assert_eq!(
        zos.get_property("image", "credentialid", &["PLEXMA", "MVMB"])
            .unwrap()
            .as_deref(),
        Some("Waddup")
    );
    assert_eq!(zos.get_property("image", "credentialid", &NO_INFIXES).unwrap(), None);
}

#[test]
fn bare_key_used_when_present() {
    let (_dir, cps) = plexma();
    cps.store().set("zos.image.credentialid", "Bare").unwrap();
    let zos = cps.namespace("zos").unwrap();

    assert_eq!(
        zos.get_property("image", "credentialid", &NO_INFIXES)
            .unwrap()
            .as_deref(),
        Some("Bare")
    );
    assert_eq!(
        zos.get_property("image", "credentialid", &["OTHER"])
            .unwrap()
            .as_deref(),
        Some("Bare")
    );
}

#[test]
fn overrides_beat_store_for_same_key() {
    let (_dir, cps) = plexma();
    cps.overrides().set("zos.image.PLEXMA.MVMA.credentialid", "Fork");
    let zos = cps.namespace("zos").unwrap();

    assert_eq!(
        zos.get_property("image", "credentialid", &["PLEXMA", "MVMA"])
            .unwrap()
            .as_deref(),
        Some("Fork")
    );
}

#[test]
fn less_specific_override_does_not_shadow_specific_store_value() {
    let (_dir, cps) = plexma();
    cps.overrides().set("zos.image.PLEXMA.credentialid", "Knife");
    let zos = cps.namespace("zos").unwrap();

    assert_eq!(
        zos.get_property("image", "credentialid", &["PLEXMA", "MVMA"])
            .unwrap()
            .as_deref(),
        Some("Spoon")
    );
}

#[test]
fn access_log_records_sources() {
    let (_dir, cps) = plexma();
    cps.overrides().set("zos.image.X.credentialid", "Over");
    let zos = cps.namespace("zos").unwrap();

    zos.get_property("image", "credentialid", &["PLEXMA"]).unwrap();
    zos.get_property("image", "credentialid", &["X"]).unwrap();
    zos.get_property("image", "credentialid", &["Y", "Z"]).unwrap();

    assert_eq!(
        cps.access_log().records(),
        vec![
            AccessRecord {
                key: "zos.image.PLEXMA.credentialid".into(),
                value: Some("Waddup".into()),
                source: AccessSource::Cps,
            },
            AccessRecord {
                key: "zos.image.X.credentialid".into(),
                value: Some("Over".into()),
                source: AccessSource::Overrides,
            },
            AccessRecord {
                key: "zos.image.Y.Z.credentialid".into(),
                value: None,
                source: AccessSource::Missing,
            },
        ]
    );
}

#[test]
fn prefixed_properties_merge_with_overrides_winning() {
    let (_dir, store) = store_with([
        ("zos.cluster.A.images", "MV1"),
        ("zos.cluster.B.images", "MV2"),
        ("zos.image.MV1.ip", "1.2.3.4"),
        ("zosx.cluster.A.images", "nope"),
    ]);
    let overrides = Arc::new(OverridesLayer::new());
    overrides.set("zos.cluster.B.images", "MV3");
    overrides.set("zos.cluster.C.images", "MV4");
    let cps = ConfigurationPropertyStore::new(store).with_overrides(overrides);

    let got = cps.namespace("zos").unwrap().get_prefixed_properties("cluster.").unwrap();
    let got: Vec<(&str, &str)> = got.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(
        got,
        vec![
            ("cluster.A.images", "MV1"),
            ("cluster.B.images", "MV3"),
            ("cluster.C.images", "MV4"),
        ]
    );
}

#[test]
fn variants_string_lists_every_candidate() {
    let (_dir, cps) = plexma();
    let zos = cps.namespace("zos").unwrap();
    assert_eq!(
        zos.report_property_variants_string("image", "credentialid", &["PLEXMA", "MVMA"])
            .unwrap(),
        "zos.image.PLEXMA.MVMA.credentialid, zos.image.PLEXMA.credentialid, zos.image.credentialid"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn resolution_returns_first_present_candidate(
        present in proptest::collection::vec(any::<bool>(), 4),
    ) {
        let infixes = ["A", "B", "C"];
        let (_dir, store) = store_with([]);
        let cps = ConfigurationPropertyStore::new(store);
        let zos = cps.namespace("zos").unwrap();
        let variants = zos.report_property_variants("p", "s", &infixes).unwrap();

        for (key, on) in variants.iter().zip(&present) {
            if *on {
                cps.store().set(key, key).unwrap();
            }
        }

        let expected = variants.iter().zip(&present).find(|(_, on)| **on).map(|(k, _)| k.clone());
        prop_assert_eq!(zos.get_property("p", "s", &infixes).unwrap(), expected);
    }
}
