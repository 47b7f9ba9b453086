//! Integration tests for quill-document
//!
//! These exercise the public surface the way the extraction tools use it:
//! a document built up by patches and explored through queries.

use proptest::prelude::*;
use quill_document::pointer::{format, parse};
use quill_document::{
    apply_patches, inspect, read, search, NodeSummary, PatchOutcome, ReadLimits, SearchOptions,
};
use serde_json::{json, Value};

fn invoice_doc() -> Value {
    json!({
        "invoices": [
            {"number": "INV-001", "client": {"name": "Client X Corp"}, "total": 1200},
            {"number": "INV-002", "client": {"name": "Acme"}, "total": 80}
        ],
        "currency": "EUR"
    })
}

#[test]
fn test_build_document_then_query() {
    let outcome = apply_patches(
        &json!({}),
        &[
            json!({"op": "add", "path": "/invoices", "value": []}),
            json!({"op": "add", "path": "/invoices/-", "value": {"number": "INV-001"}}),
            json!({"op": "add", "path": "/invoices/0/client", "value": {"name": "Client X Corp"}}),
        ],
    );
    let doc = outcome.into_document().unwrap();

    let found = search(&doc, &SearchOptions::values("client x").fuzzy());
    assert_eq!(found.matches[0].pointer(), "/invoices/0/client/name");

    let pointer = found.matches[0].pointer().to_string();
    let value = read(&doc, &pointer, &ReadLimits::default());
    assert_eq!(value.body().unwrap().value, json!("Client X Corp"));
}

#[test]
fn test_failed_patch_leaves_document_untouched() {
    let doc = invoice_doc();
    let before = doc.clone();
    let outcome = apply_patches(
        &doc,
        &[
            json!({"op": "replace", "path": "/currency", "value": "USD"}),
            json!({"op": "remove", "path": "/invoices/5"}),
        ],
    );
    match outcome {
        PatchOutcome::Failed { failed_at_index, .. } => assert_eq!(failed_at_index, 1),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(doc, before);
}

#[test]
fn test_inspect_reports_document_order() {
    let doc = json!({"zeta": 1, "alpha": 2, "mid": 3});
    match inspect(&doc, "").body() {
        Some(NodeSummary::Object { keys, count, .. }) => {
            assert_eq!(keys, &vec!["zeta", "alpha", "mid"]);
            assert_eq!(*count, 3);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_search_limit_on_deep_document() {
    let mut doc = json!("leaf");
    for i in 0..200 {
        doc = json!({ format!("level{}", i): doc, "tag": "hit" });
    }
    let outcome = search(&doc, &SearchOptions::values("hit").with_limit(5));
    assert_eq!(outcome.count, 5);
    assert!(outcome.truncated);
}

#[test]
fn test_key_search_on_invoices() {
    let outcome = search(&invoice_doc(), &SearchOptions::keys("name"));
    let pointers: Vec<_> = outcome.matches.iter().map(|m| m.pointer()).collect();
    assert_eq!(pointers, vec!["/invoices/0/client/name", "/invoices/1/client/name"]);
}

fn token() -> impl Strategy<Value = String> {
    "[a-z~/0-9]{0,6}"
}

proptest! {
    #[test]
    fn prop_pointer_round_trip(tokens in prop::collection::vec(token(), 0..6)) {
        let pointer = format(&tokens);
        prop_assert_eq!(parse(&pointer).unwrap(), tokens);
    }

    #[test]
    fn prop_read_bounds_strings(text in ".{0,300}", max in 1usize..80) {
        let doc = json!({"text": text.clone()});
        let limits = ReadLimits { max_string_length: max, ..ReadLimits::default() };
        let body = read(&doc, "/text", &limits);
        let shown = body.body().unwrap().value.as_str().unwrap().to_string();
        let total = text.chars().count();
        if total > max {
            let suffix = format!("... ({} chars total)", total);
            prop_assert!(shown.ends_with(&suffix));
            prop_assert_eq!(shown.chars().count(), max + suffix.chars().count());
        } else {
            prop_assert_eq!(shown, text);
        }
    }

    #[test]
    fn prop_add_then_remove_restores(key in "[a-z]{1,8}", value in any::<i64>()) {
        let doc = invoice_doc();
        prop_assume!(doc.get(&key).is_none());
        let path = format!("/{}", key);
        let outcome = apply_patches(
            &doc,
            &[
                json!({"op": "add", "path": path, "value": value}),
                json!({"op": "remove", "path": path}),
            ],
        );
        prop_assert_eq!(outcome.document(), Some(&doc));
    }

    #[test]
    fn prop_search_never_exceeds_limit(limit in 0usize..10) {
        let outcome = search(&invoice_doc(), &SearchOptions::values("").with_limit(limit));
        prop_assert!(outcome.count <= limit);
        prop_assert_eq!(outcome.count, outcome.matches.len());
    }
}
