//! JSON HTTP API for the archive front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check (version, search index state) |
//! | `GET` | `/api/stats` | Corpus statistics |
//! | `GET` | `/api/documents` | Filtered, sorted document list (`language`, `topic`, `sort`) |
//! | `GET` | `/api/documents/{id}` | One document with its quotes |
//! | `GET` | `/api/documents/{id}/text` | Full text |
//! | `GET` | `/api/documents/{id}/translation` | English translation |
//! | `GET` | `/api/decades` | Decade summaries |
//! | `GET` | `/api/decades/{decade}` | Documents of a decade (`1850` or `1850s`) |
//! | `GET` | `/api/topics` | Topic summaries |
//! | `GET` | `/api/topics/{topic}` | Documents with a topic |
//! | `GET` | `/api/languages` | Language summaries |
//! | `GET` | `/api/languages/{code}` | Documents in a language |
//! | `GET` | `/api/quotes` | Quote browser (`tags=a,b`, `sort`) |
//! | `GET` | `/api/search` | Full-text search (`q`, `decade`, `topic`, `language`, `session`) |
//! | `GET` | `/api/search/facets` | Search facet values and counts |
//! | `GET` | `/api/drift` | Terms in the semantic drift report |
//! | `GET` | `/api/drift/{term}` | Drift chart for a term (`width`, `height`, `selected`) |
//! | `GET` | `/api/biography` | Author biography (`name`) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no document with identifier: x" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `text_unavailable`
//! (502), `search_unavailable` (503), `internal` (500).
//!
//! # Search sessions
//!
//! A search box passes a stable `session` value with every keystroke. When a
//! newer request for the same session arrives before an older one finishes,
//! the older response comes back with `"superseded": true` and no results.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use gemi_core::drift::{line_path, ChartLayout, DriftChart, DriftExample, PlotPoint};
use gemi_core::models::{decade_of, Document};
use gemi_core::quotes::{filter_and_sort, quote_cards, tag_counts, QuoteCard, QuoteSort, TagCount, TagSelection};
use gemi_core::search::{FacetCounts, Facets, SearchResult};
use gemi_core::stats::{decade_summaries, language_summaries, topic_summaries};
use gemi_core::view::{
    derive_view, documents_in_decade, documents_in_language, documents_with_topic, find_document,
    DocumentFilters, SortMode,
};

use crate::biography::{Biography, BiographyClient};
use crate::config::Config;
use crate::repository::Archive;
use crate::search_client::{SearchIndexClient, SearchOutcome, SearchSession};
use crate::search_index::AssetIndex;
use crate::texts::{TextError, TextStore};

/// Sessions kept before idle ones are evicted.
const SESSION_LIMIT: usize = 1024;

type Sessions = Mutex<HashMap<String, Arc<SearchSession<AssetIndex>>>>;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    archive: Arc<Archive>,
    search: Arc<SearchIndexClient<AssetIndex>>,
    sessions: Arc<Sessions>,
    texts: Arc<TextStore>,
    biography: Arc<BiographyClient>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            archive: Arc::new(Archive::new(&config.data)),
            search: Arc::new(SearchIndexClient::from_config(
                AssetIndex::new(config.search.index.clone()),
                &config.search,
            )),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            texts: Arc::new(TextStore::from_config(config)),
            biography: Arc::new(BiographyClient::new(&config.biography)),
        }
    }

    pub fn archive(&self) -> &Arc<Archive> {
        &self.archive
    }

    pub fn search(&self) -> &Arc<SearchIndexClient<AssetIndex>> {
        &self.search
    }

    /// The session for `key`, created on first use. When the table is full,
    /// idle sessions are evicted; a session with a search in flight is kept
    /// so its stale results are still recognised as superseded.
    fn session(&self, key: &str) -> Arc<SearchSession<AssetIndex>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if sessions.len() >= SESSION_LIMIT && !sessions.contains_key(key) {
            sessions.retain(|_, session| Arc::strong_count(session) > 1);
        }
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(SearchSession::new(self.search.clone())))
            .clone()
    }
}

/// All routes, with permissive CORS.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/stats", get(handle_stats))
        .route("/api/documents", get(handle_documents))
        .route("/api/documents/{id}", get(handle_document))
        .route("/api/documents/{id}/text", get(handle_document_text))
        .route("/api/documents/{id}/translation", get(handle_document_translation))
        .route("/api/decades", get(handle_decades))
        .route("/api/decades/{decade}", get(handle_decade))
        .route("/api/topics", get(handle_topics))
        .route("/api/topics/{topic}", get(handle_topic))
        .route("/api/languages", get(handle_languages))
        .route("/api/languages/{code}", get(handle_language))
        .route("/api/quotes", get(handle_quotes))
        .route("/api/search", get(handle_search))
        .route("/api/search/facets", get(handle_search_facets))
        .route("/api/drift", get(handle_drift_terms))
        .route("/api/drift/{term}", get(handle_drift))
        .route("/api/biography", get(handle_biography))
        .layer(cors)
        .with_state(state)
}

/// Start the server on `[server].bind`. Runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::new(config);

    // Load the search index in the background so the first search does not
    // pay for it.
    let search = state.search.clone();
    tokio::spawn(async move {
        if let Err(e) = search.ensure_loaded().await {
            error!("{}", e);
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("GEMI archive API listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Asset load failures (e.g. a malformed corpus file) stop at the handler.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        error!("{:#}", err);
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: format!("{:#}", err),
        }
    }
}

impl From<TextError> for AppError {
    fn from(err: TextError) -> Self {
        match err {
            TextError::Missing(_) => not_found(err.to_string()),
            TextError::InvalidFilename(_) => bad_request(err.to_string()),
            TextError::Unavailable(_) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "text_unavailable",
                message: err.to_string(),
            },
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn search_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "search_unavailable",
        message: message.into(),
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    search: &'static str,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        search: state.search.state().as_str(),
    })
}

// ============ Corpus ============

async fn handle_stats(State(state): State<AppState>) -> Result<Response, AppError> {
    let stats = state.archive.stats().await?;
    Ok(Json(&*stats).into_response())
}

#[derive(Deserialize)]
struct DocumentsParams {
    language: Option<String>,
    topic: Option<String>,
    sort: Option<String>,
}

#[derive(Serialize)]
struct DocumentList {
    count: usize,
    documents: Vec<Document>,
}

impl From<Vec<Document>> for DocumentList {
    fn from(documents: Vec<Document>) -> Self {
        Self {
            count: documents.len(),
            documents,
        }
    }
}

async fn handle_documents(
    State(state): State<AppState>,
    Query(params): Query<DocumentsParams>,
) -> ApiResult<DocumentList> {
    let sort: SortMode = match params.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(|e: anyhow::Error| bad_request(e.to_string()))?,
        None => SortMode::default(),
    };
    let filters = DocumentFilters {
        language: params.language,
        topic: params.topic,
    };
    let documents = state.archive.documents().await?;
    Ok(Json(derive_view(&documents, &filters, sort).into()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentDetail {
    #[serde(flatten)]
    document: Document,
    decade: i32,
    century: i32,
    topic_label: String,
    language_name: String,
    quotes: Vec<QuoteCard>,
}

async fn lookup_document(state: &AppState, id: &str) -> Result<Document, AppError> {
    let documents = state.archive.documents().await?;
    find_document(&documents, id)
        .cloned()
        .ok_or_else(|| not_found(format!("no document with identifier: {}", id)))
}

async fn handle_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DocumentDetail> {
    let document = lookup_document(&state, &id).await?;
    let documents = state.archive.documents().await?;
    let quotes = state.archive.quotes().await?;
    let own: Vec<_> = quotes.iter().filter(|q| q.doc_id == id).cloned().collect();
    let own = filter_and_sort(&own, &TagSelection::new(), QuoteSort::Oldest);

    Ok(Json(DocumentDetail {
        decade: document.decade(),
        century: document.century(),
        topic_label: document.topic_label().to_string(),
        language_name: document.language_name().to_string(),
        quotes: quote_cards(&own, &documents),
        document,
    }))
}

#[derive(Serialize)]
struct TextResponse {
    identifier: String,
    text: String,
}

async fn handle_document_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TextResponse> {
    let document = lookup_document(&state, &id).await?;
    let text = state.texts.document_text(&document).await?;
    Ok(Json(TextResponse {
        identifier: document.identifier,
        text,
    }))
}

async fn handle_document_translation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TextResponse> {
    let document = lookup_document(&state, &id).await?;
    let text = state.texts.translation_text(&document).await?;
    Ok(Json(TextResponse {
        identifier: document.identifier,
        text,
    }))
}

// ============ Browse ============

async fn handle_decades(State(state): State<AppState>) -> Result<Response, AppError> {
    let documents = state.archive.documents().await?;
    Ok(Json(decade_summaries(&documents)).into_response())
}

/// `"1850"`, `"1850s"` and `"1857"` all name the 1850s.
fn parse_decade(raw: &str) -> Option<i32> {
    raw.trim_end_matches('s').parse::<i32>().ok().map(decade_of)
}

#[derive(Serialize)]
struct DecadePage {
    decade: i32,
    #[serde(flatten)]
    list: DocumentList,
}

async fn handle_decade(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<DecadePage> {
    let decade = parse_decade(&raw).ok_or_else(|| bad_request(format!("invalid decade: {}", raw)))?;
    let documents = state.archive.documents().await?;
    let list = documents_in_decade(&documents, decade);
    if list.is_empty() {
        return Err(not_found(format!("no documents from the {}s", decade)));
    }
    Ok(Json(DecadePage {
        decade,
        list: list.into(),
    }))
}

async fn handle_topics(State(state): State<AppState>) -> Result<Response, AppError> {
    let documents = state.archive.documents().await?;
    Ok(Json(topic_summaries(&documents)).into_response())
}

#[derive(Serialize)]
struct LabeledPage {
    code: String,
    label: String,
    #[serde(flatten)]
    list: DocumentList,
}

async fn handle_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> ApiResult<LabeledPage> {
    let documents = state.archive.documents().await?;
    let list = documents_with_topic(&documents, &topic);
    if list.is_empty() {
        return Err(not_found(format!("no documents with topic: {}", topic)));
    }
    Ok(Json(LabeledPage {
        label: gemi_core::models::topic_label(&topic).to_string(),
        code: topic,
        list: list.into(),
    }))
}

async fn handle_languages(State(state): State<AppState>) -> Result<Response, AppError> {
    let documents = state.archive.documents().await?;
    Ok(Json(language_summaries(&documents)).into_response())
}

async fn handle_language(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<LabeledPage> {
    let documents = state.archive.documents().await?;
    let list = documents_in_language(&documents, &code);
    if list.is_empty() {
        return Err(not_found(format!("no documents in language: {}", code)));
    }
    Ok(Json(LabeledPage {
        label: gemi_core::models::language_name(&code).to_string(),
        code,
        list: list.into(),
    }))
}

// ============ Quotes ============

#[derive(Deserialize)]
struct QuotesParams {
    /// Comma-separated tags.
    tags: Option<String>,
    sort: Option<String>,
}

#[derive(Serialize)]
struct QuotesResponse {
    count: usize,
    selected: Vec<String>,
    tags: Vec<TagCount>,
    quotes: Vec<QuoteCard>,
}

async fn handle_quotes(
    State(state): State<AppState>,
    Query(params): Query<QuotesParams>,
) -> ApiResult<QuotesResponse> {
    let sort: QuoteSort = match params.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(|e: anyhow::Error| bad_request(e.to_string()))?,
        None => QuoteSort::default(),
    };
    let selected: TagSelection = params
        .tags
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .collect();

    let quotes = state.archive.quotes().await?;
    let documents = state.archive.documents().await?;
    let shown = filter_and_sort(&quotes, &selected, sort);

    Ok(Json(QuotesResponse {
        count: shown.len(),
        selected: selected.iter().map(str::to_string).collect(),
        tags: tag_counts(&quotes),
        quotes: quote_cards(&shown, &documents),
    }))
}

// ============ Search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    decade: Option<String>,
    topic: Option<String>,
    language: Option<String>,
    session: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    superseded: bool,
    count: usize,
    results: Vec<SearchResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    state
        .search
        .ensure_loaded()
        .await
        .map_err(|e| search_unavailable(e.to_string()))?;

    let facets = Facets {
        decade: params.decade,
        topic: params.topic,
        language: params.language,
    };
    let known = state.archive.identifiers().await?;
    let known = (!known.is_empty()).then_some(known);

    let (superseded, results) = match params.session.as_deref().filter(|s| !s.is_empty()) {
        Some(key) => {
            let session = state.session(key);
            match session.search(&params.q, &facets, known.as_deref()).await? {
                SearchOutcome::Applied(results) => (false, results),
                SearchOutcome::Superseded => (true, Vec::new()),
            }
        }
        None => (
            false,
            state
                .search
                .query(&params.q, &facets, known.as_deref())
                .await?,
        ),
    };

    Ok(Json(SearchResponse {
        query: params.q,
        superseded,
        count: results.len(),
        results,
    }))
}

#[derive(Serialize)]
struct FacetsResponse {
    state: &'static str,
    facets: FacetCounts,
}

async fn handle_search_facets(State(state): State<AppState>) -> ApiResult<FacetsResponse> {
    let facets = state
        .search
        .ensure_loaded()
        .await
        .map_err(|e| search_unavailable(e.to_string()))?
        .clone();
    Ok(Json(FacetsResponse {
        state: state.search.state().as_str(),
        facets,
    }))
}

// ============ Semantic drift ============

#[derive(Serialize)]
struct DriftTerms {
    model: Option<String>,
    timeline: Vec<String>,
    terms: Vec<String>,
}

async fn handle_drift_terms(State(state): State<AppState>) -> ApiResult<DriftTerms> {
    let report = state.archive.drift().await?;
    Ok(Json(DriftTerms {
        model: report.model.clone(),
        timeline: report.timeline.clone(),
        terms: report.terms.keys().cloned().collect(),
    }))
}

#[derive(Deserialize)]
struct DriftParams {
    width: Option<f64>,
    height: Option<f64>,
    selected: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DriftResponse {
    term: String,
    variants: Vec<String>,
    total_contexts: usize,
    decades_covered: usize,
    layout: ChartLayout,
    points: Vec<PlotPoint>,
    path: String,
    selected: Option<String>,
    examples: Vec<DriftExample>,
}

async fn handle_drift(
    State(state): State<AppState>,
    Path(term): Path<String>,
    Query(params): Query<DriftParams>,
) -> ApiResult<DriftResponse> {
    let mut layout = ChartLayout::default();
    for (name, value, slot) in [
        ("width", params.width, &mut layout.width),
        ("height", params.height, &mut layout.height),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v <= 0.0 {
                return Err(bad_request(format!("{} must be a positive number", name)));
            }
            *slot = v;
        }
    }

    let report = state.archive.drift().await?;
    let series = report
        .term(&term)
        .ok_or_else(|| not_found(format!("no drift data for term: {}", term)))?;

    let mut chart = DriftChart::new(term.clone(), series, layout);
    if let Some(decade) = params.selected.as_deref() {
        chart.select(decade);
    }
    let points = chart.points();

    Ok(Json(DriftResponse {
        term,
        variants: series.variants.clone(),
        total_contexts: series.total_contexts,
        decades_covered: series.decades_covered,
        layout,
        path: line_path(&points),
        points,
        selected: chart.selected().map(str::to_string),
        examples: chart.selected_examples().to_vec(),
    }))
}

// ============ Biography ============

#[derive(Deserialize)]
struct BiographyParams {
    #[serde(default)]
    name: String,
}

async fn handle_biography(
    State(state): State<AppState>,
    Query(params): Query<BiographyParams>,
) -> ApiResult<Biography> {
    if params.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    state
        .biography
        .lookup(&params.name)
        .await
        .map(Json)
        .ok_or_else(|| not_found(format!("no biography found for: {}", params.name)))
}
