mod common;

use common::{USER_BEARER, config_for, user_context};
use folio::types::SearchRequest;
use folio::service::CredentialResolver;
use folio::{CredentialError, FolioContext, FolioError, RequestContext};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILES: &str = "/drive/v3/files";

fn pdf(id: &str, name: &str, parent: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": "application/pdf",
        "parents": [parent],
        "webViewLink": format!("https://drive.google.com/file/d/{id}/view"),
        "hasThumbnail": false
    })
}

async fn mount_list(server: &MockServer, q: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(FILES))
        .and(header("authorization", USER_BEARER))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_size(server: &MockServer, id: &str, size: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{FILES}/{id}")))
        .and(query_param("fields", "size"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "size": size })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn folder_crawl_classifies_and_filters() {
    let server = MockServer::start().await;

    mount_list(
        &server,
        "trashed = false and 'F' in parents and mimeType = 'application/pdf'",
        json!({ "files": [pdf("A", "A.pdf", "F")] }),
    )
    .await;
    mount_list(
        &server,
        "trashed = false and 'F' in parents and mimeType = 'application/vnd.google-apps.folder'",
        json!({ "files": [{ "id": "G", "name": "G" }] }),
    )
    .await;
    mount_list(
        &server,
        "trashed = false and 'G' in parents and mimeType = 'application/pdf'",
        json!({ "files": [pdf("B", "B.pdf", "G")] }),
    )
    .await;
    mount_list(
        &server,
        "trashed = false and 'G' in parents and mimeType = 'application/vnd.google-apps.folder'",
        json!({ "files": [] }),
    )
    .await;
    mount_size(&server, "A", "10000").await;
    mount_size(&server, "B", "200").await;
    mount_list(
        &server,
        "trashed = false and name = 'A.pdf' and fullText contains 'a'",
        json!({ "files": [{ "id": "A" }] }),
    )
    .await;

    let ctx = FolioContext::new(config_for(&server)).unwrap();
    let request = SearchRequest::new(20).in_folder("F");
    let mut files = ctx.search(&user_context(), &request).await.unwrap();
    files.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].id, "A");
    assert!(!files[0].is_scanned);
    assert_eq!(files[0].size, Some(10000));
    assert_eq!(files[1].id, "B");
    assert!(files[1].is_scanned);
    assert_eq!(files[1].parent_ids, vec!["G".to_string()]);
}

#[tokio::test]
async fn flat_text_search_sets_all_drives_flags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FILES))
        .and(query_param(
            "q",
            "trashed = false and (name contains 'O\\'Brien' or fullText contains 'O\\'Brien')",
        ))
        .and(query_param("pageSize", "5"))
        .and(query_param("includeItemsFromAllDrives", "true"))
        .and(query_param("supportsAllDrives", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [pdf("P", "O'Brien letter.pdf", "X")],
            "nextPageToken": "ignored-in-flat-mode"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = FolioContext::new(config_for(&server)).unwrap();
    let request = SearchRequest::new(5).with_text("O'Brien");
    let files = ctx.search(&user_context(), &request).await.unwrap();

    assert_eq!(files.len(), 1);
    assert!(files[0].has_readable_text);
    assert_eq!(files[0].matched_query, "O'Brien");
}

#[tokio::test]
async fn listing_failure_aborts_the_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FILES))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "The user does not have sufficient permissions", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let ctx = FolioContext::new(config_for(&server)).unwrap();
    let err = ctx
        .search(&user_context(), &SearchRequest::new(10).in_folder("F"))
        .await
        .unwrap_err();

    match err {
        FolioError::Backend(e) => {
            assert_eq!(e.operation, "drive.files.list");
            assert_eq!(e.status().map(|s| s.as_u16()), Some(403));
            assert!(e.to_string().contains("sufficient permissions"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn search_without_any_credential_fails() {
    let server = MockServer::start().await;
    let cfg = config_for(&server);
    let ctx = FolioContext::from_parts(
        cfg,
        reqwest::Client::new(),
        CredentialResolver::new(Vec::new()),
        None,
    );
    let err = ctx
        .search(&RequestContext::anonymous(), &SearchRequest::new(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FolioError::Credential(CredentialError::NoneConfigured)
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_request_fails_before_credential_resolution() {
    let server = MockServer::start().await;
    let ctx = FolioContext::from_parts(
        config_for(&server),
        reqwest::Client::new(),
        CredentialResolver::new(Vec::new()),
        None,
    );
    let err = ctx
        .search(&RequestContext::anonymous(), &SearchRequest::new(0))
        .await
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation(v) if v.field == "page_size"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
