mod cache;
mod config;
mod metrics;
mod pipeline;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use cache::{CachedEmbedder, EmbeddingCache};
use config::AppConfig;
use metrics::Metrics;
use pipeline::{IngestOutcome, IngestRequest, IngestionPipeline, PipelineError};

use extract::{Extractor, OllamaChatClient};
use index::{
    document_content_key, DocumentStore, Embedder, GraphStore, ObjectStore, OllamaEmbeddingClient,
    QdrantIndex, S3Config, S3ObjectStore, VectorIndex,
};
use query::{graph_view, GraphView, SearchError, SearchMatch, SearchService};

struct AppState {
    pipeline: IngestionPipeline,
    search: SearchService,
    documents: DocumentStore,
    graph: GraphStore,
    objects: Arc<dyn ObjectStore>,
    metrics: Arc<Metrics>,
    qdrant_url: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    // Relational store
    let pool = index::connect(&config.database_url)
        .await
        .expect("Failed to connect to relational store");
    index::init_schema(&pool)
        .await
        .expect("Failed to initialize schema");

    let documents = DocumentStore::new(pool.clone());
    let graph = GraphStore::new(pool);

    // Embedding collaborator; probe its dimension for the vector collection
    let embedder = Arc::new(OllamaEmbeddingClient::new(
        config.ollama_url.clone(),
        config.embedding_model.clone(),
    ));
    let dimension = embedder
        .dimension()
        .await
        .expect("Failed to probe embedding dimension");

    // Vector index collaborator
    let qdrant = QdrantIndex::new(config.qdrant_url.clone(), config.collection.clone());
    qdrant
        .ensure_collection(dimension)
        .await
        .expect("Failed to initialize vector collection");
    let vectors: Arc<dyn VectorIndex> = Arc::new(qdrant);

    // Object storage collaborator
    let objects: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
        S3Config::from_env().expect("Object storage credentials missing"),
    ));

    // Generative collaborator
    let extractor = Extractor::new(Arc::new(OllamaChatClient::new(
        config.ollama_url.clone(),
        config.chat_model.clone(),
    )));

    let metrics = Metrics::new();

    let pipeline = IngestionPipeline::new(
        ingest::Chunker::default(),
        documents.clone(),
        graph.clone(),
        objects.clone(),
        embedder.clone(),
        vectors.clone(),
        extractor,
        metrics.clone(),
    );

    // Search embeds through a bounded cache; ingestion does not.
    let cached_embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
        embedder,
        Arc::new(EmbeddingCache::new(config.cache_max_entries)),
    ));
    let search = SearchService::new(cached_embedder, vectors);

    let state = Arc::new(AppState {
        pipeline,
        search,
        documents,
        graph,
        objects,
        metrics,
        qdrant_url: config.qdrant_url.clone(),
    });

    let app = Router::new()
        .route("/documents", post(ingest_document))
        .route("/documents", get(list_documents))
        .route("/documents/:id", get(get_document))
        .route("/documents/:id", delete(delete_document))
        .route("/search", post(search_documents))
        .route("/graph", get(read_graph))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_snapshot))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app).await.expect("Server failed");
}

// ---------------------------------------------------------------- errors

struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = match e {
            PipelineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: e.to_string(),
        }
    }
}

impl From<index::StoreError> for ApiError {
    fn from(e: index::StoreError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<index::ObjectStoreError> for ApiError {
    fn from(e: index::ObjectStoreError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: e.to_string(),
        }
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: format!("{} not found", what),
    }
}

fn caller_id(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

// -------------------------------------------------------------- handlers

async fn ingest_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestOutcome>, ApiError> {
    let user_id = caller_id(&headers);
    let outcome = state.pipeline.ingest(&user_id, request).await?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<ingest::Document>,
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state.documents.list(50).await?;
    Ok(Json(DocumentListResponse { documents }))
}

#[derive(Serialize)]
struct DocumentResponse {
    #[serde(flatten)]
    document: ingest::Document,
    /// Full content from object storage, when still present there.
    content: Option<String>,
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state
        .documents
        .get(&id)
        .await?
        .ok_or_else(|| not_found("document"))?;

    let key = document_content_key(&caller_id(&headers), &id);
    let content = state
        .objects
        .get(&key)
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

    Ok(Json(DocumentResponse { document, content }))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existed = state.documents.delete(&id).await?;
    if !existed {
        return Err(not_found("document"));
    }

    let key = document_content_key(&caller_id(&headers), &id);
    state.objects.delete(&key).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SearchRequestBody {
    query: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponseBody {
    results: Vec<SearchMatch>,
}

async fn search_documents(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequestBody>,
) -> Result<Json<SearchResponseBody>, ApiError> {
    let started = Instant::now();
    let results = state.search.search(&request.query, request.top_k).await?;
    state.metrics.record_search(started.elapsed());

    Ok(Json(SearchResponseBody { results }))
}

async fn read_graph(State(state): State<Arc<AppState>>) -> Result<Json<GraphView>, ApiError> {
    let view = graph_view(&state.graph).await?;
    Ok(Json(view))
}

#[derive(Serialize)]
struct HealthResponse {
    relational_store: String,
    vector_index: String,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let relational_store = match state.documents.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let vector_index = match reqwest::get(&state.qdrant_url).await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        relational_store,
        vector_index,
    })
}

async fn metrics_snapshot(State(state): State<Arc<AppState>>) -> Json<metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
