//! Shared fixtures for the Graph integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use docx_rs::{Docx, Paragraph, Run};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inbox_harvester::extract::OfficeExtractor;
use inbox_harvester::mailbox::{GraphConfig, GraphMailbox};

pub const TENANT: &str = "tenant-1";
pub const MAILBOX: &str = "jobs@example.com";
pub const TOKEN: &str = "tok-123";

/// Path prefix for the test mailbox under the mock Graph base.
pub fn user_path(rest: &str) -> String {
    format!("/v1.0/users/{MAILBOX}{rest}")
}

pub fn graph_config(server: &MockServer, scratch: &Path) -> GraphConfig {
    GraphConfig {
        tenant_id: TENANT.into(),
        client_id: "client-1".into(),
        client_secret: SecretString::from("s3cret".to_string()),
        mailbox: MAILBOX.into(),
        folder: "inbox".into(),
        graph_url: format!("{}/v1.0", server.uri()),
        authority_url: server.uri(),
        scratch_dir: scratch.to_path_buf(),
    }
}

pub fn graph_mailbox(server: &MockServer, scratch: &Path) -> GraphMailbox {
    GraphMailbox::new(graph_config(server, scratch), Arc::new(OfficeExtractor::new()))
}

/// Token endpoint that always succeeds.
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": TOKEN
        })))
        .mount(server)
        .await;
}

/// A DOCX with one paragraph per entry.
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let doc = paragraphs.iter().fold(Docx::new(), |doc, text| {
        doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)))
    });
    let mut buf = Cursor::new(Vec::new());
    doc.build().pack(&mut buf).unwrap();
    buf.into_inner()
}

/// Graph `fileAttachment` JSON body.
pub fn file_attachment(id: &str, name: &str, bytes: &[u8]) -> serde_json::Value {
    json!({
        "@odata.type": "#microsoft.graph.fileAttachment",
        "id": id,
        "name": name,
        "contentBytes": base64::engine::general_purpose::STANDARD.encode(bytes)
    })
}

pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}
