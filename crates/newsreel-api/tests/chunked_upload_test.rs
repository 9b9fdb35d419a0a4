#[path = "helpers/mod.rs"]
mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use helpers::{journalist, setup_test_app, storage_key_of};
use newsreel_core::models::SessionStatus;
use uuid::Uuid;

const MB: usize = 1024 * 1024;

fn chunk_form(
    upload_id: &str,
    chunk_index: i32,
    total_chunks: i32,
    total_size: usize,
    content_type: &str,
    data: Vec<u8>,
) -> MultipartForm {
    MultipartForm::new()
        .add_text("upload_id", upload_id.to_string())
        .add_text("chunk_index", chunk_index.to_string())
        .add_text("total_chunks", total_chunks.to_string())
        .add_text("total_size", total_size.to_string())
        .add_text("content_type", content_type.to_string())
        .add_part("chunk", Part::bytes(data).file_name("blob.part"))
}

async fn post_chunk(
    client: &TestServer,
    user: (Uuid, &str),
    form: MultipartForm,
) -> axum_test::TestResponse {
    client
        .post("/api/v0/media/chunk")
        .add_header("x-user-id", user.0.to_string())
        .add_header("x-user-role", user.1)
        .multipart(form)
        .await
}

#[tokio::test]
async fn chunk_larger_than_two_megabytes_is_accepted() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = journalist();

    // 3MB is over axum's built-in extractor default but well within the
    // 5MB chunk policy; it must reach validation and be acknowledged.
    let total_size = 3 * MB + MB;
    let response = post_chunk(
        client,
        user,
        chunk_form("upl-3mb", 0, 2, total_size, "video/mp4", vec![0x5A; 3 * MB]),
    )
    .await;

    assert_eq!(response.status_code(), 200);
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["upload_id"], "upl-3mb");
    assert_eq!(ack["received_chunks"], 1);
    assert_eq!(ack["total_chunks"], 2);
    assert_eq!(ack["assembled"], false);
}

#[tokio::test]
async fn direct_upload_over_two_megabytes_is_accepted() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = journalist();

    let png = vec![0x89; 3 * MB];
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(png).file_name("large.png").mime_type("image/png"),
    );

    let response = client
        .post("/api/v0/media")
        .add_header("x-user-id", user.0.to_string())
        .add_header("x-user-role", user.1)
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    assert_eq!(body["media_type"], "image");
    assert_eq!(body["file_size"], (3 * MB) as i64);
    assert_eq!(body["processing_status"], "completed");
}

#[tokio::test]
async fn out_of_order_chunks_assemble_byte_identical() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = journalist();

    let upload_id = "upl-out-of-order";
    let parts: Vec<Vec<u8>> = vec![vec![0xA0; 2 * MB], vec![0xB1; 2 * MB], vec![0xC2; 2 * MB]];
    let total_size = 6 * MB;

    // Deliver in the order [1, 0, 2]; only the last completes the set.
    for (sent, index) in [1, 0].iter().enumerate() {
        let response = post_chunk(
            client,
            user,
            chunk_form(
                upload_id,
                *index,
                3,
                total_size,
                "video/mp4",
                parts[*index as usize].clone(),
            ),
        )
        .await;
        assert_eq!(response.status_code(), 200);
        let ack: serde_json::Value = response.json();
        assert_eq!(ack["assembled"], false);
        assert_eq!(ack["received_chunks"], (sent + 1) as i64);
    }

    let response = post_chunk(
        client,
        user,
        chunk_form(upload_id, 2, 3, total_size, "video/mp4", parts[2].clone()),
    )
    .await;
    assert_eq!(response.status_code(), 200);
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["assembled"], true);

    let media = &ack["media"];
    assert_eq!(media["media_type"], "video");
    assert_eq!(media["processing_status"], "pending");
    assert_eq!(media["file_size"], total_size as i64);

    // The assembled file is the chunks concatenated in index order, not
    // delivery order.
    let url = media["url"].as_str().expect("media url");
    let assembled = std::fs::read(app.storage_root.join(storage_key_of(url)))
        .expect("assembled file readable");
    let expected: Vec<u8> = parts.concat();
    assert_eq!(assembled.len(), total_size);
    assert_eq!(assembled, expected);

    // The session is gone, so the upload is settled.
    assert!(app.sessions.get(upload_id).await.unwrap().is_none());

    // The poller sees the freshly registered asset as pending.
    let poll = client
        .get("/api/v0/media/status")
        .add_query_param("url", url)
        .add_header("x-user-id", user.0.to_string())
        .add_header("x-user-role", user.1)
        .await;
    assert_eq!(poll.status_code(), 200);
    let poll_body: serde_json::Value = poll.json();
    assert_eq!(poll_body["exists"], true);
    assert_eq!(poll_body["status"], "pending");
}

#[tokio::test]
async fn failed_assembly_flags_session_and_retry_recovers() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = journalist();

    let upload_id = "upl-short-chunk";
    let total_size = 300;

    let response = post_chunk(
        client,
        user,
        chunk_form(upload_id, 0, 2, total_size, "video/mp4", vec![1u8; 100]),
    )
    .await;
    assert_eq!(response.status_code(), 200);

    // The second chunk is 50 bytes short, so assembly cannot verify.
    let response = post_chunk(
        client,
        user,
        chunk_form(upload_id, 1, 2, total_size, "video/mp4", vec![2u8; 150]),
    )
    .await;
    assert_eq!(response.status_code(), 400);

    let session = app
        .sessions
        .get(upload_id)
        .await
        .unwrap()
        .expect("session survives a failed assembly");
    assert_eq!(session.status, SessionStatus::FailedAssembly);

    // No asset was registered.
    let (_, total) = app
        .repository
        .list(1, 10, user.0, true)
        .await
        .expect("list");
    assert_eq!(total, 0);

    // Re-sending the bad chunk with the right bytes reopens the session and
    // the retried assembly succeeds.
    let response = post_chunk(
        client,
        user,
        chunk_form(upload_id, 1, 2, total_size, "video/mp4", vec![2u8; 200]),
    )
    .await;
    assert_eq!(response.status_code(), 200);
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["assembled"], true);
    assert_eq!(ack["media"]["file_size"], total_size as i64);

    assert!(app.sessions.get(upload_id).await.unwrap().is_none());
}
