use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

pub const INVALID_CLIENT: &str = "app.auth.invalid_client";
pub const NOT_FOUND: &str = "app.storage.not_found";
pub const INVALID_URL: &str = "app.storage.invalid_url";
pub const VALIDATION_FAILED: &str = "app.request.validation";
pub const MALFORMED_REQUEST: &str = "app.request.malformed";

/// Client identity the server accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub client_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub client_key: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            client_name: "web".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            client_key: "public-key".to_string(),
        }
    }
}

impl Credentials {
    /// Read `STORAGE_CLIENT_*` variables, keeping defaults for unset ones.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, fallback: String| std::env::var(name).unwrap_or(fallback);
        Self {
            client_name: var("STORAGE_CLIENT_NAME", defaults.client_name),
            client_id: var("STORAGE_CLIENT_ID", defaults.client_id),
            client_secret: var("STORAGE_CLIENT_SECRET", defaults.client_secret),
            client_key: var("STORAGE_CLIENT_KEY", defaults.client_key),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub type Db = Arc<RwLock<HashMap<String, StoredObject>>>;

#[derive(Clone)]
pub struct AppState {
    credentials: Arc<Credentials>,
    assets: Db,
    docs: Db,
}

/// Form fields sent with every command.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandForm {
    pub client_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub client_key: Option<String>,
    pub filepath: Option<String>,
    pub docpath: Option<String>,
    pub url: Option<String>,
}

pub fn app() -> Router {
    app_with(Credentials::default())
}

pub fn app_with(credentials: Credentials) -> Router {
    let state = AppState {
        credentials: Arc::new(credentials),
        assets: Db::default(),
        docs: Db::default(),
    };
    Router::new()
        .route("/asset/store", post(store_asset))
        .route("/asset/remove", post(remove_asset))
        .route("/asset/check-url", post(check_asset_url))
        .route("/asset/check-filepath", post(check_asset_filepath))
        .route("/asset/{client_key}/{*filepath}", get(serve_asset))
        .route("/doc/store", post(store_doc))
        .route("/doc/retrieve", post(retrieve_doc))
        .route("/doc/remove", post(remove_doc))
        .route("/doc/check-docpath", post(check_docpath))
        .with_state(state)
}

pub async fn run(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(credentials)).await
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

fn success(title: &str, msg: &str, xdata: Value) -> Response {
    let body = json!({
        "success": true,
        "code": 200,
        "title": title,
        "msg": msg,
        "xdata": xdata,
    });
    (StatusCode::OK, Json(body)).into_response()
}

fn failure(status: StatusCode, error_code: &str, title: &str, msg: &str) -> Response {
    let body = json!({
        "success": false,
        "code": status.as_u16(),
        "errorCode": error_code,
        "title": title,
        "msg": msg,
    });
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    failure(
        StatusCode::UNAUTHORIZED,
        INVALID_CLIENT,
        "Unauthorized",
        "Invalid client credentials",
    )
}

fn not_found(what: &str, path: &str) -> Response {
    failure(
        StatusCode::NOT_FOUND,
        NOT_FOUND,
        "Not Found",
        &format!("{what} {path} does not exist"),
    )
}

fn required(field: &str) -> Response {
    let mut validations = Map::new();
    validations.insert(field.to_string(), json!(["required"]));
    let body = json!({
        "success": false,
        "code": 422,
        "errorCode": VALIDATION_FAILED,
        "title": "Validation Failed",
        "msg": format!("{field} is required"),
        "validations": validations,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}

fn malformed(err: MultipartError) -> Response {
    failure(
        StatusCode::BAD_REQUEST,
        MALFORMED_REQUEST,
        "Bad Request",
        &err.body_text(),
    )
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

impl AppState {
    fn authorized(&self, name: &str, id: &str, secret: &str) -> bool {
        let c = &self.credentials;
        name == c.client_name && id == c.client_id && secret == c.client_secret
    }

    fn authorized_form(&self, form: &CommandForm) -> bool {
        self.authorized(&form.client_name, &form.client_id, &form.client_secret)
    }

    fn authorized_with_key(&self, form: &CommandForm) -> bool {
        self.authorized_form(form)
            && form.client_key.as_deref() == Some(self.credentials.client_key.as_str())
    }
}

/// Stored objects are keyed without leading slashes, matching asset links.
fn object_key(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

fn required_path(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(object_key)
        .filter(|key| !key.is_empty())
}

#[derive(Default)]
struct Upload {
    fields: HashMap<String, String>,
    file: Option<(String, Bytes)>,
}

impl Upload {
    fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

async fn read_upload(mut multipart: Multipart, file_field: &str) -> Result<Upload, MultipartError> {
    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            upload.file = Some((content_type, field.bytes().await?));
        } else {
            upload.fields.insert(name, field.text().await?);
        }
    }
    Ok(upload)
}

async fn store(
    state: &AppState,
    db: &Db,
    multipart: Multipart,
    path_field: &str,
    file_field: &str,
) -> Response {
    let upload = match read_upload(multipart, file_field).await {
        Ok(upload) => upload,
        Err(err) => return malformed(err),
    };
    if !state.authorized(
        upload.field("clientName"),
        upload.field("clientId"),
        upload.field("clientSecret"),
    ) {
        return unauthorized();
    }
    let key = object_key(upload.field(path_field));
    if key.is_empty() {
        return required(path_field);
    }
    let Some((content_type, bytes)) = upload.file else {
        return required(file_field);
    };

    let size = bytes.len();
    info!(%key, size, "stored object");
    db.write().await.insert(
        key.clone(),
        StoredObject {
            content_type,
            bytes: bytes.to_vec(),
        },
    );
    success(
        "Success",
        &format!("{key} stored"),
        json!({ path_field: key, "size": size }),
    )
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

async fn store_asset(State(state): State<AppState>, multipart: Multipart) -> Response {
    store(&state, &state.assets, multipart, "filepath", "asset").await
}

async fn remove_asset(State(state): State<AppState>, Form(form): Form<CommandForm>) -> Response {
    if !state.authorized_form(&form) {
        return unauthorized();
    }
    let Some(key) = required_path(&form.filepath) else {
        return required("filepath");
    };
    match state.assets.write().await.remove(&key) {
        Some(_) => {
            info!(%key, "removed asset");
            success("Success", &format!("{key} removed"), json!({ "filepath": key }))
        }
        None => not_found("Asset", &key),
    }
}

async fn check_asset_url(State(state): State<AppState>, Form(form): Form<CommandForm>) -> Response {
    if !state.authorized_with_key(&form) {
        return unauthorized();
    }
    let Some(url) = form.url.as_deref().filter(|u| !u.is_empty()) else {
        return required("url");
    };
    let marker = format!("/asset/{}/", state.credentials.client_key);
    let Some(key) = url
        .find(&marker)
        .map(|at| object_key(&url[at + marker.len()..]))
        .filter(|key| !key.is_empty())
    else {
        return failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_URL,
            "Invalid URL",
            &format!("{url} is not an asset URL"),
        );
    };
    if state.assets.read().await.contains_key(&key) {
        success("Success", "Asset exists", json!({ "filepath": key, "url": url }))
    } else {
        not_found("Asset", &key)
    }
}

async fn check_asset_filepath(
    State(state): State<AppState>,
    Form(form): Form<CommandForm>,
) -> Response {
    if !state.authorized_with_key(&form) {
        return unauthorized();
    }
    let Some(key) = required_path(&form.filepath) else {
        return required("filepath");
    };
    if state.assets.read().await.contains_key(&key) {
        success("Success", "Asset exists", json!({ "filepath": key }))
    } else {
        not_found("Asset", &key)
    }
}

async fn serve_asset(
    State(state): State<AppState>,
    Path((client_key, filepath)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    if client_key != state.credentials.client_key {
        return Err(StatusCode::NOT_FOUND);
    }
    let assets = state.assets.read().await;
    let object = assets.get(&object_key(&filepath)).ok_or(StatusCode::NOT_FOUND)?;
    Ok((
        [(header::CONTENT_TYPE, object.content_type.clone())],
        object.bytes.clone(),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

async fn store_doc(State(state): State<AppState>, multipart: Multipart) -> Response {
    store(&state, &state.docs, multipart, "docpath", "doc").await
}

/// Raw document bytes; failures carry an empty body.
async fn retrieve_doc(State(state): State<AppState>, Form(form): Form<CommandForm>) -> Response {
    if !state.authorized_form(&form) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(key) = required_path(&form.docpath) else {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    };
    match state.docs.read().await.get(&key) {
        Some(object) => (
            [(header::CONTENT_TYPE, object.content_type.clone())],
            object.bytes.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn remove_doc(State(state): State<AppState>, Form(form): Form<CommandForm>) -> Response {
    if !state.authorized_form(&form) {
        return unauthorized();
    }
    let Some(key) = required_path(&form.docpath) else {
        return required("docpath");
    };
    match state.docs.write().await.remove(&key) {
        Some(_) => {
            info!(%key, "removed document");
            success("Document Removed", &format!("{key} removed"), json!({ "docpath": key }))
        }
        None => not_found("Document", &key),
    }
}

async fn check_docpath(State(state): State<AppState>, Form(form): Form<CommandForm>) -> Response {
    if !state.authorized_form(&form) {
        return unauthorized();
    }
    let Some(key) = required_path(&form.docpath) else {
        return required("docpath");
    };
    if state.docs.read().await.contains_key(&key) {
        success("Document Checked", "Document exists", json!({ "docpath": key }))
    } else {
        not_found("Document", &key)
    }
}
