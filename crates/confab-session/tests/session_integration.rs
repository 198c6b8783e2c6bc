#![allow(clippy::unwrap_used, clippy::expect_used)]

use confab_core::{ConfabError, Identity, ModelMessage, ModelRequest, ModelResponse};
use confab_session::{SessionStore, SqliteSessionStore};
use std::time::Duration;

/// Helper: open a SqliteSessionStore in a temp directory.
async fn temp_store() -> (SqliteSessionStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = SqliteSessionStore::open(tmp.path().join("data").join("confab.sqlite"))
        .await
        .unwrap();
    (store, tmp)
}

fn payload(text: &str) -> String {
    ModelMessage::encode_list(&[
        ModelRequest::user_prompt(text).into(),
        ModelResponse::text("echo", format!("re: {text}")).into(),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_alice_search_scenario() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");
    let bob = Identity::new("bob");
    let turn1 = payload("first question");

    store
        .append_turn("s1", &alice, "search", turn1.clone())
        .await
        .unwrap();

    let sessions = store.list_sessions(&alice).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "s1");
    assert_eq!(sessions[0].agent_name, "search");
    assert_eq!(sessions[0].owner, alice);

    let transcript = store.get_transcript("s1", &alice).await.unwrap();
    let payloads: Vec<_> = transcript.into_iter().map(|t| t.payload).collect();
    assert_eq!(payloads, vec![turn1]);

    assert!(store.get_transcript("s1", &bob).await.unwrap().is_empty());
    assert!(store.list_sessions(&bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transcript_preserves_append_order() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");

    let expected: Vec<String> = (0..10).map(|i| payload(&format!("q{i}"))).collect();
    for p in &expected {
        store
            .append_turn("s1", &alice, "search", p.clone())
            .await
            .unwrap();
    }

    let turns = store.get_transcript("s1", &alice).await.unwrap();
    let payloads: Vec<_> = turns.iter().map(|t| t.payload.clone()).collect();
    assert_eq!(payloads, expected);
    assert!(turns.windows(2).all(|w| w[0].seq < w[1].seq));

    // Decoded history is the concatenation of every turn's messages.
    let messages = store.get_messages("s1", &alice).await.unwrap();
    assert_eq!(messages.len(), 20);
}

#[tokio::test]
async fn test_agent_is_fixed_on_first_append() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");

    store
        .append_turn("s1", &alice, "search", payload("a"))
        .await
        .unwrap();
    store
        .append_turn("s1", &alice, "databot", payload("b"))
        .await
        .unwrap();

    assert_eq!(store.get_agent_for("s1", &alice).await.unwrap(), "search");
    assert_eq!(store.get_transcript("s1", &alice).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_ensure_session_is_idempotent() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");

    let first = store.ensure_session("s1", &alice, "search").await.unwrap();
    let second = store.ensure_session("s1", &alice, "databot").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(
        first.created_at.timestamp_micros(),
        second.created_at.timestamp_micros()
    );
    assert_eq!(second.agent_name, "search");
    assert!(second.title.starts_with("search "));
    assert_eq!(store.list_sessions(&alice).await.unwrap().len(), 1);
    assert!(store.get_transcript("s1", &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_session_is_not_visible() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");
    let bob = Identity::new("bob");

    store
        .append_turn("s1", &alice, "search", payload("secret"))
        .await
        .unwrap();

    assert!(matches!(
        store.get_agent_for("s1", &bob).await,
        Err(ConfabError::NotFound(_))
    ));
    assert!(matches!(
        store.get_agent_for("missing", &alice).await,
        Err(ConfabError::NotFound(_))
    ));
    assert!(matches!(
        store.ensure_session("s1", &bob, "search").await,
        Err(ConfabError::NotFound(_))
    ));

    // Appending as another owner writes nothing.
    assert!(matches!(
        store.append_turn("s1", &bob, "search", payload("hijack")).await,
        Err(ConfabError::NotFound(_))
    ));
    assert_eq!(store.get_transcript("s1", &alice).await.unwrap().len(), 1);
    assert!(store.list_sessions(&bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_requires_owner() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");
    let bob = Identity::new("bob");

    store
        .append_turn("s1", &alice, "search", payload("a"))
        .await
        .unwrap();
    store
        .append_turn("s1", &alice, "search", payload("b"))
        .await
        .unwrap();

    assert!(!store.delete_session("s1", &bob).await.unwrap());
    assert_eq!(store.get_transcript("s1", &alice).await.unwrap().len(), 2);
    assert_eq!(store.list_sessions(&alice).await.unwrap().len(), 1);

    assert!(store.delete_session("s1", &alice).await.unwrap());
    assert!(store.get_transcript("s1", &alice).await.unwrap().is_empty());
    assert!(store.list_sessions(&alice).await.unwrap().is_empty());
    assert!(matches!(
        store.get_agent_for("s1", &alice).await,
        Err(ConfabError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_nonexistent_returns_false() {
    let (store, _tmp) = temp_store().await;
    assert!(!store
        .delete_session("nope", &Identity::new("alice"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_recreate_after_delete_starts_fresh() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");

    store
        .append_turn("s1", &alice, "search", payload("old"))
        .await
        .unwrap();
    assert!(store.delete_session("s1", &alice).await.unwrap());

    store
        .append_turn("s1", &alice, "databot", payload("new"))
        .await
        .unwrap();
    assert_eq!(store.get_agent_for("s1", &alice).await.unwrap(), "databot");
    assert_eq!(store.get_transcript("s1", &alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_sessions_most_recent_first() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");

    for id in ["s1", "s2", "s3"] {
        store
            .append_turn(id, &alice, "search", payload(id))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // Activity on s1 moves it to the front.
    store
        .append_turn("s1", &alice, "search", payload("again"))
        .await
        .unwrap();

    let ids: Vec<_> = store
        .list_sessions(&alice)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["s1", "s3", "s2"]);
}

#[tokio::test]
async fn test_concurrent_appends_keep_submission_order() {
    let (store, _tmp) = temp_store().await;
    let alice = Identity::new("alice");
    let a = payload("A");
    let b = payload("B");

    let (ra, rb) = tokio::join!(
        store.append_turn("s1", &alice, "search", a.clone()),
        store.append_turn("s1", &alice, "search", b.clone()),
    );
    let (ta, tb) = (ra.unwrap(), rb.unwrap());
    assert!(ta.seq < tb.seq);

    let payloads: Vec<_> = store
        .get_transcript("s1", &alice)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.payload)
        .collect();
    assert_eq!(payloads, vec![a, b]);
}

#[tokio::test]
async fn test_data_persists_across_store_instances() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("confab.sqlite");
    let alice = Identity::new("alice");

    {
        let store = SqliteSessionStore::open(&path).await.unwrap();
        store
            .append_turn("s1", &alice, "search", payload("persist me"))
            .await
            .unwrap();
    }

    let store = SqliteSessionStore::open(&path).await.unwrap();
    let transcript = store.get_transcript("s1", &alice).await.unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(ModelMessage::decode_list(&transcript[0].payload).unwrap().len(), 2);
}

#[tokio::test]
async fn test_undecodable_payload_surfaces_on_get_messages() {
    let store = SqliteSessionStore::open_in_memory().await.unwrap();
    let alice = Identity::new("alice");
    store
        .append_turn("s1", &alice, "search", "not json".to_string())
        .await
        .unwrap();

    // Raw transcript is opaque; decoding is where the error shows.
    assert_eq!(store.get_transcript("s1", &alice).await.unwrap().len(), 1);
    assert!(matches!(
        store.get_messages("s1", &alice).await,
        Err(ConfabError::Json(_))
    ));
}
