use vistagraph_core::error::VistagraphError;
use vistagraph_core::model::snapshot::{
    FileIdentity, GlobalIdentity, IdentitySnapshot, LabelIdentity, PackageIdentity,
    RoutineIdentity,
};
use vistagraph_core::resolver::IdentityCache;

fn snapshot() -> IdentitySnapshot {
    IdentitySnapshot {
        routines: vec![RoutineIdentity {
            name: "DG10".to_string(),
            id: "r1".to_string(),
        }],
        labels: vec![
            LabelIdentity {
                routine_name: "DG10".to_string(),
                name: "EN".to_string(),
                line_number: 3,
                id: "l1".to_string(),
            },
            LabelIdentity {
                routine_name: "DG10".to_string(),
                name: "EXIT".to_string(),
                line_number: 40,
                id: "l2".to_string(),
            },
        ],
        files: vec![FileIdentity {
            number: "2".to_string(),
            global_root: Some("^DPT(".to_string()),
            id: "f1".to_string(),
        }],
        packages: vec![PackageIdentity {
            name: "Registration".to_string(),
            prefixes: vec!["DG".to_string(), "DGRP".to_string()],
            id: "p1".to_string(),
        }],
        globals: Vec::new(),
    }
}

#[test]
fn natural_keys_resolve_to_identities() {
    let cache = IdentityCache::from_snapshot(&snapshot());

    assert_eq!(cache.resolve_routine("DG10"), Some(&"r1".to_string()));
    assert_eq!(cache.resolve_label("DG10", "EN"), Some(&"l1".to_string()));
    assert_eq!(cache.resolve_label_by_line("DG10", 40), Some(&"l2".to_string()));
    assert_eq!(cache.resolve_package("Registration"), Some(&"p1".to_string()));
    assert_eq!(cache.resolve_package_by_prefix("DGRP"), Some(&"p1".to_string()));
    assert!(cache.resolve_label("DG10", "MISSING").is_none());
    assert!(cache.resolve_routine("XUS").is_none());
}

#[test]
fn file_resolution_carries_the_storage_root() {
    let cache = IdentityCache::from_snapshot(&snapshot());
    let (id, root) = cache.resolve_file("2").unwrap();
    assert_eq!(id, "f1");
    assert_eq!(root, Some("^DPT("));
    assert_eq!(cache.resolve_file_by_global("DPT"), Some(("2", &"f1".to_string())));
    assert!(cache.resolve_file_by_global("XTMP").is_none());
}

#[test]
fn reload_replaces_the_global_index_wholesale() {
    let mut cache = IdentityCache::from_snapshot(&snapshot());
    assert!(cache.resolve_global("DPT").is_none());

    cache.reload_globals(&[GlobalIdentity {
        name: "DPT".to_string(),
        id: "g1".to_string(),
    }]);
    assert_eq!(cache.resolve_global("DPT"), Some(&"g1".to_string()));

    cache.reload_globals(&[GlobalIdentity {
        name: "VA".to_string(),
        id: "g2".to_string(),
    }]);
    assert!(cache.resolve_global("DPT").is_none());
    assert_eq!(cache.stats().globals, 1);
}

#[test]
fn labels_in_routine_enumerates_only_that_routine() {
    let cache = IdentityCache::from_snapshot(&snapshot());
    let mut labels: Vec<&str> = cache.labels_in_routine("DG10").map(|(name, _)| name).collect();
    labels.sort_unstable();
    assert_eq!(labels, vec!["EN", "EXIT"]);
    assert_eq!(cache.labels_in_routine("XUS").count(), 0);
}

#[test]
fn validation_passes_on_a_fully_seeded_cache() {
    let cache = IdentityCache::from_snapshot(&snapshot());
    assert!(cache.validate().is_ok());
}

#[test]
fn validation_names_every_empty_primary_index() {
    let cache = IdentityCache::from_snapshot(&IdentitySnapshot::default());
    let err = cache.validate().unwrap_err();
    match err {
        VistagraphError::Precondition(message) => {
            for index in ["labels", "routines", "files", "packages"] {
                assert!(message.contains(index), "missing {index} in: {message}");
            }
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
