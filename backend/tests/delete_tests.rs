mod common;

use chrono::Utc;
use common::*;
use http::StatusCode;
use project_store::AssetMetadata;

async fn committed_asset(setup: &TestContext, project_id: &str) -> String {
    let asset_id = random_asset_id();

    let upload = setup
        .send_put_bytes(
            &format!("/api/upload/{project_id}/{asset_id}/original"),
            vec![1, 2, 3, 4],
            Some("image/png"),
        )
        .await
        .unwrap();
    assert_eq!(upload.status(), StatusCode::OK);

    let thumb = setup
        .send_put_bytes(
            &format!("/api/upload/{project_id}/{asset_id}/thumb"),
            vec![9, 9],
            Some("image/webp"),
        )
        .await
        .unwrap();
    assert_eq!(thumb.status(), StatusCode::OK);

    let commit = setup
        .send_post_request(
            &format!("/api/projects/{project_id}/assets/commit"),
            serde_json::json!({
                "assetId": asset_id,
                "contentType": "image/png",
                "byteSize": 4,
                "fileName": "a.png",
            }),
        )
        .await
        .unwrap();
    assert_eq!(commit.status(), StatusCode::OK);

    asset_id
}

/// Seeds an asset entry directly into the document, bypassing the API
async fn seed_asset(setup: &TestContext, project_id: &str, asset: AssetMetadata) {
    let mut project = setup
        .project_store
        .get(project_id)
        .await
        .unwrap()
        .unwrap();
    project.data.upsert_asset(asset).unwrap();
    setup
        .project_store
        .update_data(project_id, &project.data)
        .await
        .unwrap();
}

fn asset_with_keys(asset_id: &str, original_key: &str, thumb_key: &str) -> AssetMetadata {
    AssetMetadata {
        asset_id: asset_id.to_string(),
        original_key: original_key.to_string(),
        thumb_key: thumb_key.to_string(),
        content_type: "image/png".to_string(),
        byte_size: 4,
        width: None,
        height: None,
        file_name: "seeded.png".to_string(),
        created_at: Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
async fn delete_asset_removes_blobs_then_metadata() {
    let setup = TestContext::new().await;
    let project_id = setup.create_project("Delete me").await;
    let asset_id = committed_asset(&setup, &project_id).await;

    assert_eq!(setup.blob_store.object_count(), 2);

    let response = setup
        .send_delete_request(&format!("/api/projects/{project_id}/assets/{asset_id}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(setup.blob_store.object_count(), 0);
    let stored = setup.project_store.get(&project_id).await.unwrap().unwrap();
    assert!(stored.data.assets.is_empty());
}

#[tokio::test]
async fn delete_missing_asset_is_not_found_and_changes_nothing() {
    let setup = TestContext::new().await;
    let project_id = setup.create_project("Keep me").await;
    let kept_asset = committed_asset(&setup, &project_id).await;

    let response = setup
        .send_delete_request(&format!(
            "/api/projects/{project_id}/assets/{}",
            random_asset_id()
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = setup.parse_response_body(response).await.unwrap();
    assert_eq!(body["error"]["code"], "asset_not_found");

    let stored = setup.project_store.get(&project_id).await.unwrap().unwrap();
    assert_eq!(stored.data.assets.len(), 1);
    assert_eq!(stored.data.assets[0].asset_id, kept_asset);
    assert_eq!(setup.blob_store.object_count(), 2);
}

#[tokio::test]
async fn delete_asset_from_missing_project_is_not_found() {
    let setup = TestContext::new().await;

    let response = setup
        .send_delete_request(&format!(
            "/api/projects/{}/assets/{}",
            random_asset_id(),
            random_asset_id()
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_asset_refuses_corrupted_key_pair() {
    let setup = TestContext::new().await;
    let project_id = setup.create_project("Corrupted").await;
    let asset_id = random_asset_id();
    let other_project = random_asset_id();

    // Metadata pointing at another project's objects
    seed_asset(
        &setup,
        &project_id,
        asset_with_keys(
            &asset_id,
            &format!("{other_project}/{asset_id}/original"),
            &format!("{other_project}/{asset_id}/thumb"),
        ),
    )
    .await;

    let response = setup
        .send_delete_request(&format!("/api/projects/{project_id}/assets/{asset_id}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was deleted: not the blobs, not the metadata
    assert_eq!(setup.blob_store.delete_calls(), 0);
    let stored = setup.project_store.get(&project_id).await.unwrap().unwrap();
    assert_eq!(stored.data.assets.len(), 1);
}

#[tokio::test]
async fn delete_asset_accepts_legacy_keys() {
    let setup = TestContext::new().await;
    let project_id = setup.create_project("Legacy").await;
    let asset_id = random_asset_id();

    // Keys written under the older naming convention still contain both ids
    let original_key = format!("assets/{project_id}/{asset_id}/original");
    let thumb_key = format!("assets/{project_id}/{asset_id}/thumb");
    setup.blob_store.insert_raw(&original_key, vec![1], "image/png");
    setup.blob_store.insert_raw(&thumb_key, vec![2], "image/png");
    seed_asset(
        &setup,
        &project_id,
        asset_with_keys(&asset_id, &original_key, &thumb_key),
    )
    .await;

    let response = setup
        .send_delete_request(&format!("/api/projects/{project_id}/assets/{asset_id}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(setup.blob_store.object_count(), 0);
}

#[tokio::test]
async fn delete_asset_tolerates_absent_blobs() {
    let setup = TestContext::new().await;
    let project_id = setup.create_project("Half gone").await;
    let asset_id = random_asset_id();

    // Committed metadata but the blobs never landed
    seed_asset(
        &setup,
        &project_id,
        asset_with_keys(
            &asset_id,
            &format!("{project_id}/{asset_id}/original"),
            &format!("{project_id}/{asset_id}/thumb"),
        ),
    )
    .await;

    let response = setup
        .send_delete_request(&format!("/api/projects/{project_id}/assets/{asset_id}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = setup.project_store.get(&project_id).await.unwrap().unwrap();
    assert!(stored.data.assets.is_empty());
}

#[tokio::test]
async fn delete_project_cascades_blob_cleanup() {
    let setup = TestContext::new().await;
    let project_id = setup.create_project("Cascade").await;
    committed_asset(&setup, &project_id).await;
    committed_asset(&setup, &project_id).await;

    assert_eq!(setup.blob_store.object_count(), 4);

    let response = setup
        .send_delete_request(&format!("/api/projects/{project_id}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(setup.blob_store.object_count(), 0);
    assert!(setup.project_store.get(&project_id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_project_fails_closed_on_any_bad_key_pair() {
    let setup = TestContext::new().await;
    let project_id = setup.create_project("Fail closed").await;
    committed_asset(&setup, &project_id).await;

    // One corrupt entry poisons the whole delete
    let rogue_asset = random_asset_id();
    seed_asset(
        &setup,
        &project_id,
        asset_with_keys(&rogue_asset, "someone/elses/original", "someone/elses/thumb"),
    )
    .await;

    let response = setup
        .send_delete_request(&format!("/api/projects/{project_id}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Fail-closed: zero deletes reached the store, the row survives
    assert_eq!(setup.blob_store.delete_calls(), 0);
    assert_eq!(setup.blob_store.object_count(), 2);
    assert!(setup.project_store.get(&project_id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_missing_project_is_not_found() {
    let setup = TestContext::new().await;

    let response = setup
        .send_delete_request(&format!("/api/projects/{}", random_asset_id()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_project_rejects_invalid_id() {
    let setup = TestContext::new().await;

    let response = setup
        .send_delete_request("/api/projects/not-a-valid-id")
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
