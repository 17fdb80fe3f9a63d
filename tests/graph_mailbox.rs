//! Integration tests for `GraphMailbox` against a mock Graph server.
//!
//! Each test stands up a `wiremock` server that plays both the identity
//! platform token endpoint and the Graph v1.0 API.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inbox_harvester::mailbox::{Attachment, Mailbox};

use common::*;

// ── Listing ────────────────────────────────────────────────────────────

#[tokio::test]
async fn lists_unread_messages_across_pages() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders/inbox/messages")))
        .and(query_param("$filter", "isRead eq false and hasAttachments eq true"))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "m1",
                "subject": "Resume A",
                "attachments": [
                    {"id": "a1", "name": "cv.pdf"},
                    {"id": "a2", "name": "photo.jpg"}
                ]
            }],
            "@odata.nextLink": format!("{}/v1.0/page-2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "m2",
                "subject": "Resume B",
                "attachments": [{"id": "b1", "name": "cv.docx"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    let messages = mailbox.list_unread_with_attachments().await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[0].subject, "Resume A");
    assert_eq!(
        messages[0].attachments,
        vec![Attachment::new("a1", "cv.pdf"), Attachment::new("a2", "photo.jpg")]
    );
    assert_eq!(messages[1].id, "m2");
}

#[tokio::test]
async fn listing_failure_yields_no_messages() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders/inbox/messages")))
        .respond_with(ResponseTemplate::new(503).set_body_string("throttled"))
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    assert!(mailbox.list_unread_with_attachments().await.is_empty());
    assert!(mailbox.fetch_unread().await.is_err());
}

#[tokio::test]
async fn failing_later_page_discards_whole_listing() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders/inbox/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "m1", "subject": "x", "attachments": []}],
            "@odata.nextLink": format!("{}/v1.0/page-2", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/page-2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    assert!(mailbox.list_unread_with_attachments().await.is_empty());
}

#[tokio::test]
async fn endless_paging_discards_whole_listing() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders/inbox/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "m0", "subject": "x", "attachments": []}],
            "@odata.nextLink": format!("{}/v1.0/loop", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Every later page points back at itself.
    Mock::given(method("GET"))
        .and(path("/v1.0/loop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "m1", "subject": "x", "attachments": []}],
            "@odata.nextLink": format!("{}/v1.0/loop", server.uri())
        })))
        .expect(49)
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    assert!(mailbox.list_unread_with_attachments().await.is_empty());
}

#[tokio::test]
async fn token_failure_skips_api_calls() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders/inbox/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(0)
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    assert!(mailbox.list_unread_with_attachments().await.is_empty());
}

#[tokio::test]
async fn token_is_reused_between_calls() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": 3600,
            "access_token": TOKEN
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders/inbox/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(2)
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    mailbox.list_unread_with_attachments().await;
    mailbox.list_unread_with_attachments().await;
}

// ── Attachment text ────────────────────────────────────────────────────

#[tokio::test]
async fn extracts_docx_text_and_removes_temp_file() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    let docx = docx_bytes(&["Senior Java Engineer", "Ten years of JVM work"]);
    Mock::given(method("GET"))
        .and(path(user_path("/messages/m1/attachments/a1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_attachment("a1", "cv.docx", &docx)),
        )
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    let text = mailbox.get_attachment_text("m1", "a1").await;

    assert!(text.contains("Senior Java Engineer"), "got {text:?}");
    assert!(text.contains("JVM"));
    assert!(dir_is_empty(scratch.path()));
}

#[tokio::test]
async fn corrupt_document_yields_empty_text_and_no_temp_file() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/messages/m1/attachments/a1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_attachment(
            "a1",
            "cv.PDF",
            b"definitely not a pdf",
        )))
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    assert_eq!(mailbox.get_attachment_text("m1", "a1").await, "");
    assert!(mailbox.attachment_text("m1", "a1").await.is_err());
    assert!(dir_is_empty(scratch.path()));
}

#[tokio::test]
async fn unsupported_attachment_yields_empty_text() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/messages/m1/attachments/a1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_attachment(
            "a1",
            "notes.txt",
            b"java java java",
        )))
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    assert_eq!(mailbox.get_attachment_text("m1", "a1").await, "");
    assert!(dir_is_empty(scratch.path()));
}

#[tokio::test]
async fn attachment_fetch_failure_yields_empty_text() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/messages/m1/attachments/a1")))
        .respond_with(ResponseTemplate::new(404).set_body_string("ErrorItemNotFound"))
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    assert_eq!(mailbox.get_attachment_text("m1", "a1").await, "");
}

// ── Download ───────────────────────────────────────────────────────────

#[tokio::test]
async fn download_creates_directories_and_overwrites() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/messages/m1/attachments/a1")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(file_attachment("a1", "cv.pdf", b"%PDF-1.4 fake bytes")),
        )
        .mount(&server)
        .await;

    let destination = downloads.path().join("nested/dir/cv.pdf");
    std::fs::create_dir_all(destination.parent().unwrap()).unwrap();
    std::fs::write(&destination, b"stale").unwrap();

    let mailbox = graph_mailbox(&server, scratch.path());
    mailbox.download_attachment("m1", "a1", &destination).await;
    assert_eq!(std::fs::read(&destination).unwrap(), b"%PDF-1.4 fake bytes");

    let fresh = downloads.path().join("other/cv.pdf");
    mailbox.download_attachment("m1", "a1", &fresh).await;
    assert_eq!(std::fs::read(&fresh).unwrap(), b"%PDF-1.4 fake bytes");
}

#[tokio::test]
async fn item_attachment_is_not_downloaded() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/messages/m1/attachments/a1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.type": "#microsoft.graph.itemAttachment",
            "id": "a1",
            "name": "Forwarded message"
        })))
        .mount(&server)
        .await;

    let destination = downloads.path().join("forwarded.pdf");
    let mailbox = graph_mailbox(&server, scratch.path());
    mailbox.download_attachment("m1", "a1", &destination).await;

    assert!(!destination.exists());
}

// ── Mark read / move ───────────────────────────────────────────────────

#[tokio::test]
async fn mark_as_read_patches_flag() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("PATCH"))
        .and(path(user_path("/messages/m1")))
        .and(body_json(json!({"isRead": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
        .expect(1)
        .mount(&server)
        .await;

    graph_mailbox(&server, scratch.path()).mark_as_read("m1").await;
}

#[tokio::test]
async fn mark_as_read_failure_is_swallowed() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("PATCH"))
        .and(path(user_path("/messages/m1")))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    mailbox.mark_as_read("m1").await;
    assert!(mailbox.set_read("m1").await.is_err());
}

#[tokio::test]
async fn move_resolves_folder_name_once() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"id": "f-inbox", "displayName": "Inbox"},
                {"id": "f-proc", "displayName": "Processed"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(user_path("/messages/m1/move")))
        .and(body_json(json!({"destinationId": "f-proc"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m1-moved"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(user_path("/messages/m2/move")))
        .and(body_json(json!({"destinationId": "f-proc"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m2-moved"})))
        .expect(1)
        .mount(&server)
        .await;

    let mailbox = graph_mailbox(&server, scratch.path());
    mailbox.move_message("m1", "Processed").await;
    mailbox.move_message("m2", "processed").await;
}

#[tokio::test]
async fn move_creates_missing_folder() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(user_path("/mailFolders")))
        .and(body_json(json!({"displayName": "Processed"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "f-new",
            "displayName": "Processed"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(user_path("/messages/m1/move")))
        .and(body_json(json!({"destinationId": "f-new"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m1-moved"})))
        .expect(1)
        .mount(&server)
        .await;

    graph_mailbox(&server, scratch.path())
        .move_message("m1", "Processed")
        .await;
}

#[tokio::test]
async fn move_to_well_known_folder_skips_lookup() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(user_path("/mailFolders")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(user_path("/messages/m1/move")))
        .and(body_json(json!({"destinationId": "archive"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "m1-moved"})))
        .expect(1)
        .mount(&server)
        .await;

    graph_mailbox(&server, scratch.path())
        .move_message("m1", "archive")
        .await;
}
