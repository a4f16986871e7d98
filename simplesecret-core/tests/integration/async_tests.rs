//! Integration tests for the async wrapper
//!
//! The blocking facade runs on tokio's blocking pool; these tests check that
//! results, cancellation and timeouts come back to the async caller.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use simplesecret_core::testing::PromptResponse;
use simplesecret_core::{AsyncSimpleCollection, CancellationToken, spawn_operation};

use super::{attrs, default_collection};

fn async_collection() -> (
    std::sync::Arc<simplesecret_core::testing::MockSecretService>,
    AsyncSimpleCollection,
) {
    let (mock, collection) = default_collection();
    (mock, AsyncSimpleCollection::new(collection))
}

#[tokio::test]
async fn test_store_search_and_delete() {
    let (mock, collection) = async_collection();

    let item = collection
        .create_item(
            "api-token".to_string(),
            SecretString::from("t0ken"),
            Some(attrs(&[("service", "ci")])),
        )
        .await
        .unwrap()
        .unwrap();

    let found = collection
        .get_items(attrs(&[("service", "ci")]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, vec![item.clone()]);

    let secret = collection.get_secret(item.clone()).await.unwrap().unwrap();
    assert_eq!(secret.expose_secret(), "t0ken");

    assert!(collection.delete_item(item).await.unwrap());
    assert_eq!(mock.item_count(simplesecret_core::DEFAULT_COLLECTION), 0);
}

#[tokio::test]
async fn test_clones_share_one_facade() {
    let (mock, collection) = async_collection();
    let other = collection.clone();

    collection.unlock_with_user_permission().await.unwrap();
    other.get_secrets().await.unwrap();

    assert_eq!(mock.unlock_count(), 1);
    assert_eq!(mock.open_session_count(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (mock, collection) = async_collection();
    let token = CancellationToken::new();
    token.cancel();

    let result = collection
        .run_with_cancellation(|c| c.create_item("x", "y", None), &token)
        .await;
    assert!(result.is_cancelled());
    assert_eq!(mock.item_count(simplesecret_core::DEFAULT_COLLECTION), 0);
}

#[tokio::test]
async fn test_timeout_while_prompt_is_unanswered() {
    let (mock, collection) = async_collection();
    mock.set_prompt_response(PromptResponse::Ignore);
    collection
        .run(|c| {
            c.set_timeout(Duration::from_millis(200));
            Ok(())
        })
        .await
        .unwrap();

    let result = collection
        .run_with_timeout(|c| c.get_secrets(), Duration::from_millis(20))
        .await;
    assert!(result.is_timeout());
}

#[tokio::test]
async fn test_spawned_operation_can_be_cancelled() {
    let (mock, collection) = async_collection();
    mock.set_prompt_response(PromptResponse::Ignore);
    collection
        .run(|c| {
            c.set_timeout(Duration::from_millis(300));
            Ok(())
        })
        .await
        .unwrap();

    let pending = spawn_operation(collection, |c| c.get_secrets(), None);
    pending.cancel();
    assert!(pending.is_cancelled());
    assert!(pending.await_result().await.is_cancelled());
}

#[tokio::test]
async fn test_close_releases_session() {
    let (mock, collection) = async_collection();
    collection.close().await;
    collection.close().await;
    assert_eq!(mock.open_session_count(), 0);
}
