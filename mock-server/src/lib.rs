use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{
        header::{AUTHORIZATION, LOCATION},
        StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_KEY: &str = "test-key";
pub const DEFAULT_SECRET: &str = "test-secret";

/// Length of every generated entity id.
pub const ID_LENGTH: usize = 15;

/// A stored entity: its form fields plus `id`.
pub type Entity = Map<String, Value>;

/// Bucket name (`user`, `object/<collection>`, `mailbox`) to entities by id.
pub type Db = Arc<RwLock<HashMap<String, BTreeMap<String, Entity>>>>;

type Fields = HashMap<String, String>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    credentials: Arc<str>,
    redirect_hits: Arc<AtomicUsize>,
}

/// `{"error": message}` with a status code.
pub struct ApiError(StatusCode, &'static str);

impl ApiError {
    fn not_found() -> Self {
        ApiError(StatusCode::NOT_FOUND, "not found")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

pub fn app() -> Router {
    app_with_credentials(DEFAULT_KEY, DEFAULT_SECRET)
}

/// Router that only accepts Basic auth for `key:secret`.
pub fn app_with_credentials(key: &str, secret: &str) -> Router {
    let state = AppState {
        db: Db::default(),
        credentials: Arc::from(format!("{key}:{secret}")),
        redirect_hits: Arc::default(),
    };
    Router::new()
        .route("/v1/user", get(search_users).post(create_user))
        .route("/v1/user/login", post(login))
        .route("/v1/user/forgot", post(forgot))
        .route("/v1/user/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/v1/user/{id}/resend", post(resend))
        .route(
            "/v1/object/{collection}",
            get(search_objects).post(create_object),
        )
        .route(
            "/v1/object/{collection}/{id}",
            get(get_object).put(update_object).delete(delete_object),
        )
        .route("/v1/geo/{ip}", get(geo_info))
        .route("/v1/mailbox", get(list_mailboxes).post(create_mailbox))
        .route(
            "/v1/mailbox/{address}",
            get(get_mailbox).put(update_mailbox).delete(delete_mailbox),
        )
        .route("/v1/job", get(list_jobs))
        .route("/v1/job/{id}", get(get_job))
        .route("/v1/stat", get(stat_info))
        .route("/v1/email", post(send_email))
        .route("/v1/redirect", get(redirect))
        .route("/v1/redirect/target", get(redirect_target))
        .route("/v1/redirect/hits", get(redirect_hits))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_credentials(
    listener: TcpListener,
    key: &str,
    secret: &str,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_credentials(key, secret)).await
}

async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|v| STANDARD.decode(v).ok())
        .is_some_and(|pair| pair == state.credentials.as_bytes());

    info!(method = %req.method(), uri = %req.uri(), authorized, "request");
    if !authorized {
        return ApiError(StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }
    next.run(req).await
}

fn new_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(ID_LENGTH);
    id
}

/// Entity as returned to clients: never echoes passwords.
fn public(entity: &Entity) -> Value {
    let mut shown = entity.clone();
    shown.remove("password");
    Value::Object(shown)
}

fn matches(entity: &Entity, filter: &Fields) -> bool {
    filter
        .iter()
        .all(|(k, v)| entity.get(k).and_then(Value::as_str) == Some(v.as_str()))
}

async fn insert(db: &Db, bucket: String, id: String, fields: Fields) -> Value {
    let mut entity: Entity = fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    entity.insert("id".to_string(), Value::String(id.clone()));
    let shown = public(&entity);
    db.write().await.entry(bucket).or_default().insert(id, entity);
    shown
}

async fn fetch(db: &Db, bucket: &str, id: &str) -> Result<Json<Value>, ApiError> {
    let db = db.read().await;
    db.get(bucket)
        .and_then(|b| b.get(id))
        .map(|e| Json(public(e)))
        .ok_or_else(ApiError::not_found)
}

async fn search(db: &Db, bucket: &str, filter: &Fields) -> Json<Value> {
    let db = db.read().await;
    let found = db
        .get(bucket)
        .map(|b| b.values().filter(|e| matches(e, filter)).map(public).collect())
        .unwrap_or_default();
    Json(Value::Array(found))
}

async fn merge(db: &Db, bucket: &str, id: &str, fields: Fields) -> Result<Json<Value>, ApiError> {
    let mut db = db.write().await;
    let entity = db
        .get_mut(bucket)
        .and_then(|b| b.get_mut(id))
        .ok_or_else(ApiError::not_found)?;
    for (k, v) in fields {
        if k != "id" {
            entity.insert(k, Value::String(v));
        }
    }
    Ok(Json(public(entity)))
}

async fn remove(db: &Db, bucket: &str, id: &str) -> Result<Json<Value>, ApiError> {
    let mut db = db.write().await;
    db.get_mut(bucket)
        .and_then(|b| b.remove(id))
        .map(|_| Json(json!({ "deleted": id })))
        .ok_or_else(ApiError::not_found)
}

fn object_bucket(collection: &str) -> String {
    format!("object/{collection}")
}

// --- user ---

async fn create_user(
    State(state): State<AppState>,
    Form(fields): Form<Fields>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let has = |k: &str| fields.get(k).is_some_and(|v| !v.is_empty());
    if !has("username") && !has("email") {
        return Err(ApiError(StatusCode::BAD_REQUEST, "username and/or email required"));
    }
    if !has("password") {
        return Err(ApiError(StatusCode::BAD_REQUEST, "password required"));
    }
    let user = insert(&state.db, "user".to_string(), new_id(), fields).await;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn search_users(State(state): State<AppState>, Query(filter): Query<Fields>) -> Json<Value> {
    search(&state.db, "user", &filter).await
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    fetch(&state.db, "user", &id).await
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(fields): Form<Fields>,
) -> Result<Json<Value>, ApiError> {
    merge(&state.db, "user", &id, fields).await
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    remove(&state.db, "user", &id).await
}

async fn login(State(state): State<AppState>, Form(fields): Form<Fields>) -> Result<Json<Value>, ApiError> {
    let db = state.db.read().await;
    let password = fields.get("password").map(String::as_str);
    let identity = ["username", "email"]
        .into_iter()
        .filter_map(|k| fields.get(k).filter(|v| !v.is_empty()).map(|v| (k, v.as_str())))
        .next();

    let user = match identity {
        Some((field, value)) => db.get("user").and_then(|users| {
            users.values().find(|u| {
                u.get(field).and_then(Value::as_str) == Some(value)
                    && u.get("password").and_then(Value::as_str) == password
            })
        }),
        None => None,
    };
    match user {
        Some(user) => Ok(Json(json!({
            "id": user.get("id").cloned().unwrap_or(Value::Null),
            "token": Uuid::new_v4().simple().to_string(),
        }))),
        None => Err(ApiError(StatusCode::UNAUTHORIZED, "invalid login")),
    }
}

async fn forgot(Form(fields): Form<Fields>) -> Result<Json<Value>, ApiError> {
    let has = |k: &str| fields.get(k).is_some_and(|v| !v.is_empty());
    if !has("username") && !has("email") {
        return Err(ApiError(StatusCode::BAD_REQUEST, "username and/or email required"));
    }
    Ok(Json(json!({ "sent": true })))
}

async fn resend(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    fetch(&state.db, "user", &id).await?;
    Ok(Json(json!({ "sent": true })))
}

// --- object ---

async fn create_object(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Form(fields): Form<Fields>,
) -> (StatusCode, Json<Value>) {
    let object = insert(&state.db, object_bucket(&collection), new_id(), fields).await;
    (StatusCode::CREATED, Json(object))
}

async fn search_objects(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(filter): Query<Fields>,
) -> Json<Value> {
    search(&state.db, &object_bucket(&collection), &filter).await
}

async fn get_object(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    fetch(&state.db, &object_bucket(&collection), &id).await
}

async fn update_object(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Form(fields): Form<Fields>,
) -> Result<Json<Value>, ApiError> {
    merge(&state.db, &object_bucket(&collection), &id, fields).await
}

async fn delete_object(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    remove(&state.db, &object_bucket(&collection), &id).await
}

// --- geo ---

async fn geo_info(Path(ip): Path<String>) -> Json<Value> {
    Json(json!({ "ip": ip, "country": "US" }))
}

// --- mailbox ---

async fn create_mailbox(
    State(state): State<AppState>,
    Form(fields): Form<Fields>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let address = match fields.get("mailbox") {
        Some(address) if address.contains('@') => address.clone(),
        _ => return Err(ApiError(StatusCode::BAD_REQUEST, "invalid mailbox")),
    };
    let mailbox = insert(&state.db, "mailbox".to_string(), address, fields).await;
    Ok((StatusCode::CREATED, Json(mailbox)))
}

async fn list_mailboxes(State(state): State<AppState>, Query(filter): Query<Fields>) -> Json<Value> {
    search(&state.db, "mailbox", &filter).await
}

async fn get_mailbox(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Value>, ApiError> {
    fetch(&state.db, "mailbox", &address).await
}

async fn update_mailbox(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Form(fields): Form<Fields>,
) -> Result<Json<Value>, ApiError> {
    merge(&state.db, "mailbox", &address, fields).await
}

async fn delete_mailbox(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Value>, ApiError> {
    remove(&state.db, "mailbox", &address).await
}

// --- job, stat, email ---

async fn list_jobs() -> Json<Value> {
    Json(json!([]))
}

async fn get_job(Path(_id): Path<String>) -> ApiError {
    ApiError::not_found()
}

async fn stat_info(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    let counts: Map<String, Value> = db
        .iter()
        .map(|(bucket, entities)| (bucket.clone(), json!(entities.len())))
        .collect();
    Json(Value::Object(counts))
}

async fn send_email(Form(fields): Form<Fields>) -> Result<Json<Value>, ApiError> {
    for key in ["to", "from", "subject", "message"] {
        if fields.get(key).map_or(true, |v| v.is_empty()) {
            return Err(ApiError(StatusCode::BAD_REQUEST, "missing email field"));
        }
    }
    Ok(Json(json!({ "queued": true })))
}

// --- redirect ---

const REDIRECT_TARGET: &str = "/v1/redirect/target";

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, REDIRECT_TARGET)])
}

async fn redirect_target(State(state): State<AppState>) -> Json<Value> {
    let hits = state.redirect_hits.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "hits": hits }))
}

/// How often `REDIRECT_TARGET` was reached, without counting this call.
async fn redirect_hits(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "hits": state.redirect_hits.load(Ordering::SeqCst) }))
}
