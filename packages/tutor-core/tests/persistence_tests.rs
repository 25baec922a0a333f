//! File-backed store behaviour across sessions.

mod common;

use std::sync::Arc;

use calc_tutor_core::knowledge::{load_graph, FileKnowledgeStore, KnowledgeStore};
use calc_tutor_core::{SessionConfig, Tutor, TutorSession};

use common::*;

fn open(store: &Arc<FileKnowledgeStore>, key: &str, oracle: ScriptedOracle) -> Tutor<ScriptedOracle> {
    let store: Arc<dyn KnowledgeStore> = store.clone();
    Tutor::new(TutorSession::open(store, key, SessionConfig::default()), oracle, frame_settings())
}

#[tokio::test]
async fn test_graph_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileKnowledgeStore::new(dir.path()));

    let oracle = ScriptedOracle::new();
    oracle.push_record(record("limits", "SIGN_ERROR", -10));
    oracle.push_record(record("derivatives", "NONE", 15));
    let mut tutor = open(&store, "alice", oracle);
    tutor.submit("first").await.unwrap();
    tutor.submit("second").await.unwrap();
    let before = tutor.session().graph().clone();
    drop(tutor);

    let tutor = open(&store, "alice", ScriptedOracle::new());
    assert_eq!(tutor.session().graph(), &before);
    assert_eq!(tutor.session().graph().topic("derivatives").unwrap().confidence_score, 65);
    // conversation is per process, only the graph is durable
    assert!(tutor.session().conversation().is_empty());
}

#[tokio::test]
async fn test_keys_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileKnowledgeStore::new(dir.path()));

    let oracle = ScriptedOracle::new();
    oracle.push_record(record("limits", "SIGN_ERROR", -10));
    let mut alice = open(&store, "alice", oracle);
    alice.submit("hi").await.unwrap();

    let bob = open(&store, "bob", ScriptedOracle::new());
    assert!(bob.session().graph().is_empty());
    assert!(!load_graph(store.as_ref(), "alice").is_empty());
}

#[test]
fn test_corrupt_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKnowledgeStore::new(dir.path());
    std::fs::write(store.path_for("carol"), "{\"topics\": [1, 2").unwrap();
    assert!(load_graph(&store, "carol").is_empty());

    std::fs::write(store.path_for("carol"), "null").unwrap();
    assert!(load_graph(&store, "carol").is_empty());
}

#[test]
fn test_out_of_range_file_is_repaired() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKnowledgeStore::new(dir.path());
    let raw = r#"{
        "topics": {
            "limits": { "mastered": true, "confidenceScore": 250, "attempts": 3, "lastErrors": [] }
        },
        "weakNodes": ["limits", "factoring"],
        "errorHistory": [
            { "errorKind": "NONE", "topic": "limits", "timestamp": 1 },
            { "errorKind": "SIGN_ERROR", "topic": "limits", "timestamp": 2 }
        ]
    }"#;
    std::fs::write(store.path_for("dave"), raw).unwrap();

    let graph = load_graph(&store, "dave");
    assert_eq!(graph.topic("limits").unwrap().confidence_score, 100);
    assert_eq!(graph.weak_nodes.len(), 1);
    assert!(graph.weak_nodes.contains("factoring"));
    assert_eq!(graph.error_history.len(), 1);
}

#[tokio::test]
async fn test_reset_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileKnowledgeStore::new(dir.path()));

    let oracle = ScriptedOracle::new();
    oracle.push_record(record("limits", "SIGN_ERROR", -10));
    let mut tutor = open(&store, "erin", oracle);
    tutor.submit("x").await.unwrap();
    assert!(store.path_for("erin").exists());

    tutor.reset();
    assert!(!store.path_for("erin").exists());
    assert!(load_graph(store.as_ref(), "erin").is_empty());
}
