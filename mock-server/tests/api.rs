use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{
    app, app_with, Credentials, INVALID_CLIENT, INVALID_URL, NOT_FOUND, VALIDATION_FAILED,
};
use serde_json::Value;
use tower::ServiceExt;

const AUTH: &str = "clientName=web&clientId=client-id&clientSecret=client-secret";
const BOUNDARY: &str = "test-boundary";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str)>,
) -> Request<String> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    if let Some((name, content)) = file {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"upload.tmp\"\r\n\
             Content-Type: text/plain\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

fn credentials() -> Vec<(&'static str, &'static str)> {
    vec![
        ("clientName", "web"),
        ("clientId", "client-id"),
        ("clientSecret", "client-secret"),
    ]
}

async fn store_asset(app: &Router, filepath: &str, content: &str) -> Value {
    let mut fields = credentials();
    fields.push(("filepath", filepath));
    let resp = app
        .clone()
        .oneshot(multipart_request("/asset/store", &fields, Some(("asset", content))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

async fn store_doc(app: &Router, docpath: &str, content: &str) {
    let mut fields = credentials();
    fields.push(("docpath", docpath));
    let resp = app
        .clone()
        .oneshot(multipart_request("/doc/store", &fields, Some(("doc", content))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- assets ---

#[tokio::test]
async fn store_asset_reports_success() {
    let app = app();
    let body = store_asset(&app, "/img/logo.txt", "hello").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["code"], 200);
    assert_eq!(body["xdata"]["filepath"], "img/logo.txt");
    assert_eq!(body["xdata"]["size"], 5);
}

#[tokio::test]
async fn store_asset_rejects_bad_credentials() {
    let app = app();
    let fields = [
        ("clientName", "web"),
        ("clientId", "client-id"),
        ("clientSecret", "wrong"),
        ("filepath", "a.txt"),
    ];
    let resp = app
        .oneshot(multipart_request("/asset/store", &fields, Some(("asset", "x"))))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], INVALID_CLIENT);
}

#[tokio::test]
async fn store_asset_without_file_fails_validation() {
    let app = app();
    let mut fields = credentials();
    fields.push(("filepath", "a.txt"));
    let resp = app
        .oneshot(multipart_request("/asset/store", &fields, None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["errorCode"], VALIDATION_FAILED);
    assert_eq!(body["validations"]["asset"][0], "required");
}

#[tokio::test]
async fn stored_asset_is_served_at_its_public_url() {
    let app = app();
    store_asset(&app, "img/logo.txt", "hello").await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/asset/public-key/img/logo.txt")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain");
    assert_eq!(&body_bytes(resp).await[..], b"hello");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/asset/other-key/img/logo.txt")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn check_asset_filepath_requires_client_key() {
    let app = app();
    store_asset(&app, "a.txt", "x").await;

    let resp = app
        .clone()
        .oneshot(form_request("/asset/check-filepath", &format!("{AUTH}&filepath=a.txt")))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["errorCode"], INVALID_CLIENT);

    let resp = app
        .oneshot(form_request(
            "/asset/check-filepath",
            &format!("{AUTH}&clientKey=public-key&filepath=a.txt"),
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["xdata"]["filepath"], "a.txt");
}

#[tokio::test]
async fn check_asset_url_resolves_asset_links() {
    let app = app();
    store_asset(&app, "img/a.png", "x").await;

    let resp = app
        .clone()
        .oneshot(form_request(
            "/asset/check-url",
            &format!(
                "{AUTH}&clientKey=public-key&url=http%3A%2F%2Flocalhost%2Fasset%2Fpublic-key%2Fimg%2Fa.png"
            ),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], true);

    let resp = app
        .oneshot(form_request(
            "/asset/check-url",
            &format!("{AUTH}&clientKey=public-key&url=http%3A%2F%2Fexample.com%2Fa.png"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["errorCode"], INVALID_URL);
}

#[tokio::test]
async fn remove_asset_then_missing() {
    let app = app();
    store_asset(&app, "a.txt", "x").await;

    let resp = app
        .clone()
        .oneshot(form_request("/asset/remove", &format!("{AUTH}&filepath=a.txt")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(form_request("/asset/remove", &format!("{AUTH}&filepath=a.txt")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["code"], 404);
    assert_eq!(body["errorCode"], NOT_FOUND);
}

#[tokio::test]
async fn remove_asset_without_filepath_fails_validation() {
    let app = app();
    let resp = app
        .oneshot(form_request("/asset/remove", AUTH))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["validations"]["filepath"][0], "required");
}

// --- documents ---

#[tokio::test]
async fn retrieve_doc_returns_raw_bytes() {
    let app = app();
    store_doc(&app, "notes/a.md", "# hello").await;

    let resp = app
        .oneshot(form_request("/doc/retrieve", &format!("{AUTH}&docpath=notes%2Fa.md")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"# hello");
}

#[tokio::test]
async fn retrieve_missing_doc_is_empty_404() {
    let app = app();
    let resp = app
        .oneshot(form_request("/doc/retrieve", &format!("{AUTH}&docpath=missing.md")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn check_and_remove_doc() {
    let app = app();
    store_doc(&app, "a.md", "x").await;

    let resp = app
        .clone()
        .oneshot(form_request("/doc/check-docpath", &format!("{AUTH}&docpath=a.md")))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["title"], "Document Checked");

    let resp = app
        .clone()
        .oneshot(form_request("/doc/remove", &format!("{AUTH}&docpath=a.md")))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["title"], "Document Removed");

    let resp = app
        .oneshot(form_request("/doc/check-docpath", &format!("{AUTH}&docpath=a.md")))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["errorCode"], NOT_FOUND);
}

#[tokio::test]
async fn custom_credentials_are_enforced() {
    let app = app_with(Credentials {
        client_name: "cms".to_string(),
        client_id: "id-2".to_string(),
        client_secret: "secret-2".to_string(),
        client_key: "key-2".to_string(),
    });

    let resp = app
        .clone()
        .oneshot(form_request("/doc/check-docpath", &format!("{AUTH}&docpath=a.md")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(form_request(
            "/doc/check-docpath",
            "clientName=cms&clientId=id-2&clientSecret=secret-2&docpath=a.md",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
