//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the codec, namespace and pagination rules over
//! generated inputs.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::cache::{page_window, EntityCodec, EnumField, KeyNamespace, Schema, TYPE_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl EnumField for Tier {
    const MEMBERS: &'static [(&'static str, Self)] = &[
        ("Free", Tier::Free),
        ("Pro", Tier::Pro),
        ("Enterprise", Tier::Enterprise),
    ];
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct Account {
    id: i64,
    owner: String,
    balance: f64,
    verified: bool,
    referrer: Option<u32>,
    tier: Tier,
    labels: Vec<String>,
}

fn codec() -> EntityCodec<Account> {
    let schema = Schema::<Account>::builder("Account")
        .field("Id", |a| &a.id, |a| &mut a.id)
        .text("Owner", |a| &a.owner, |a| &mut a.owner)
        .field("Balance", |a| &a.balance, |a| &mut a.balance)
        .field("Verified", |a| &a.verified, |a| &mut a.verified)
        .field("Referrer", |a| &a.referrer, |a| &mut a.referrer)
        .enumeration("Tier", |a| &a.tier, |a| &mut a.tier)
        .structured("Labels", |a| &a.labels, |a| &mut a.labels)
        .build()
        .unwrap();
    EntityCodec::new(schema)
}

// == Strategies ==
fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Free), Just(Tier::Pro), Just(Tier::Enterprise)]
}

/// Accounts whose text fields are non-blank; blank text decodes to the default.
fn account_strategy() -> impl Strategy<Value = Account> {
    (
        any::<i64>(),
        "[a-zA-Z][a-zA-Z0-9 ]{0,31}",
        -1.0e12f64..1.0e12f64,
        any::<bool>(),
        proptest::option::of(any::<u32>()),
        tier_strategy(),
        prop::collection::vec("[a-z]{0,8}", 0..5),
    )
        .prop_map(|(id, owner, balance, verified, referrer, tier, labels)| Account {
            id,
            owner,
            balance,
            verified,
            referrer,
            tier,
            labels,
        })
}

fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Decoding an encoded account yields the same account.
    #[test]
    fn prop_hash_roundtrip(account in account_strategy()) {
        let codec = codec();
        let fields = codec.encode(&account).unwrap();
        prop_assert_eq!(codec.decode(&fields).unwrap(), Some(account));
    }

    // Any tag other than the codec's kind decodes to absence.
    #[test]
    fn prop_foreign_tag_is_none(account in account_strategy(), tag in "[A-Za-z]{1,12}") {
        prop_assume!(tag != "Account");
        let codec = codec();
        let mut fields = codec.encode(&account).unwrap();
        for (name, value) in fields.iter_mut() {
            if name == TYPE_FIELD {
                *value = tag.clone();
            }
        }
        prop_assert_eq!(codec.decode(&fields).unwrap(), None);
    }

    // Encoded field names are unique and end with the type tag.
    #[test]
    fn prop_encoded_names_unique(account in account_strategy()) {
        let fields = codec().encode(&account).unwrap();
        let names: HashSet<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        prop_assert_eq!(names.len(), fields.len());
        prop_assert_eq!(fields.last().map(|(name, _)| name.as_str()), Some(TYPE_FIELD));
    }

    // The blob form restores the full account.
    #[test]
    fn prop_blob_roundtrip(account in account_strategy()) {
        let codec = codec();
        let bytes = codec.encode_blob(&account).unwrap();
        prop_assert_eq!(codec.decode_blob(&bytes).unwrap(), account);
    }

    // Completed keys are exactly system:contract:key and match the namespace glob.
    #[test]
    fn prop_namespace_format(
        system in segment_strategy(),
        contract in segment_strategy(),
        key in "[a-zA-Z0-9:_-]{0,24}",
    ) {
        let namespace = KeyNamespace::new(&system, &contract);
        let full = namespace.complete(&key);
        prop_assert_eq!(&full, &format!("{}:{}:{}", system, contract, key));
        prop_assert!(full.starts_with(&namespace.prefix()));
        prop_assert!(crate::store::glob_match(&namespace.pattern(""), &full));
    }

    // Pages of one listing never overlap and together cover it exactly once.
    #[test]
    fn prop_pages_disjoint(total in 0usize..200, page_size in 1usize..30) {
        let items: Vec<usize> = (0..total).collect();
        let mut seen = HashSet::new();
        let mut page = 0;
        loop {
            let window = page_window(items.clone(), page, page_size);
            if window.is_empty() {
                break;
            }
            prop_assert!(window.len() <= page_size);
            for item in window {
                prop_assert!(seen.insert(item), "item {} appeared twice", item);
            }
            page += 1;
        }
        prop_assert_eq!(seen.len(), total);
    }
}
