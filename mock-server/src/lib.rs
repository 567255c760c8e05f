use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    routing::{any, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Index {
    pub started: bool,
    pub public_search: bool,
    pub size: usize,
    #[serde(skip)]
    pub docs: HashMap<String, HashMap<String, String>>,
}

#[derive(Deserialize)]
pub struct CreateIndex {
    #[serde(default)]
    pub public_search: bool,
}

#[derive(Deserialize)]
pub struct AddDocument {
    pub docid: String,
    pub fields: HashMap<String, String>,
}

#[derive(Deserialize)]
pub struct DeleteDocument {
    pub docid: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
}

pub type Db = Arc<RwLock<BTreeMap<String, Index>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(BTreeMap::new()));
    Router::new()
        .route("/v1/indexes", get(list_indexes))
        .route(
            "/v1/indexes/{name}",
            get(get_index).put(create_index).delete(delete_index),
        )
        .route("/v1/indexes/{name}/docs", put(add_document).delete(delete_document))
        .route("/v1/indexes/{name}/search", get(search))
        .route("/v1/echo", any(echo))
        .route("/fetch", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock index API listening");
    }
    axum::serve(listener, app()).await
}

async fn list_indexes(State(db): State<Db>) -> Json<BTreeMap<String, Index>> {
    Json(db.read().await.clone())
}

async fn get_index(
    State(db): State<Db>,
    Path(name): Path<String>,
) -> Result<Json<Index>, StatusCode> {
    let indexes = db.read().await;
    indexes.get(&name).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// 201 with the new index, or 204 when the name is taken.
async fn create_index(
    State(db): State<Db>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Index>), StatusCode> {
    let input: CreateIndex = if body.is_empty() {
        CreateIndex {
            public_search: false,
        }
    } else {
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?
    };

    let mut indexes = db.write().await;
    if indexes.contains_key(&name) {
        return Err(StatusCode::NO_CONTENT);
    }
    let index = Index {
        started: true,
        public_search: input.public_search,
        ..Index::default()
    };
    indexes.insert(name.clone(), index.clone());
    tracing::debug!(%name, "index created");
    Ok((StatusCode::CREATED, Json(index)))
}

async fn delete_index(State(db): State<Db>, Path(name): Path<String>) -> StatusCode {
    match db.write().await.remove(&name) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

async fn add_document(
    State(db): State<Db>,
    Path(name): Path<String>,
    Json(input): Json<AddDocument>,
) -> Result<Json<Value>, StatusCode> {
    let mut indexes = db.write().await;
    let index = indexes.get_mut(&name).ok_or(StatusCode::NOT_FOUND)?;
    index.docs.insert(input.docid, input.fields);
    index.size = index.docs.len();
    Ok(Json(json!({ "added": true })))
}

async fn delete_document(
    State(db): State<Db>,
    Path(name): Path<String>,
    Json(input): Json<DeleteDocument>,
) -> Result<Json<Value>, StatusCode> {
    let mut indexes = db.write().await;
    let index = indexes.get_mut(&name).ok_or(StatusCode::NOT_FOUND)?;
    let deleted = index.docs.remove(&input.docid).is_some();
    index.size = index.docs.len();
    Ok(Json(json!({ "deleted": deleted })))
}

/// Matches documents whose `text` field contains every whitespace-separated term.
async fn search(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, StatusCode> {
    let indexes = db.read().await;
    let index = indexes.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    let terms: Vec<&str> = params.q.split_whitespace().collect();

    let mut results: Vec<&String> = index
        .docs
        .iter()
        .filter(|(_, fields)| {
            let text = fields.get("text").map(String::as_str).unwrap_or_default();
            terms.iter().all(|t| text.contains(*t))
        })
        .map(|(docid, _)| docid)
        .collect();
    results.sort();

    let results: Vec<Value> = results.into_iter().map(|docid| json!({ "docid": docid })).collect();
    Ok(Json(json!({
        "query": params.q,
        "matches": results.len(),
        "results": results,
    })))
}

/// Describes the request it received; used to check what clients put on the
/// wire. Mounted at `/fetch` it stands in for a hosted fetch-proxy endpoint.
async fn echo(
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let get_header = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "content_type": get_header(header::CONTENT_TYPE),
        "content_length": get_header(header::CONTENT_LENGTH),
        "user_agent": get_header(header::USER_AGENT),
        "fetch_url": get_header(header::HeaderName::from_static("x-fetch-url")),
        "fetch_context": get_header(header::HeaderName::from_static("x-fetch-context")),
        "body_length": body.len(),
        "body": serde_json::from_slice::<Value>(&body).ok(),
    }))
}
