//! ThaiDoc API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Prompt forwarding to the local Ollama server
//! - PDF upload, page correction, and chapter mapping
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::future::ready;
use std::net::SocketAddr;
use std::sync::Arc;
use thaidoc_common::{
    config::AppConfig,
    llm::{self, TextGenerator},
    metrics,
};
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub generator: Arc<dyn TextGenerator>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    init_tracing(&config);

    info!("Starting ThaiDoc API Gateway v{}", thaidoc_common::VERSION);

    // Initialize metrics
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    metrics::register_metrics();

    // Initialize the generation client
    let generator = llm::create_generator(&config.ollama);
    info!(
        model = %generator.model_name(),
        base_url = %config.ollama.base_url,
        "Generation client ready"
    );

    // Create app state
    let state = AppState {
        config: Arc::new(config),
        generator,
    };

    // Build the router
    let app = create_router(state.clone(), metrics_handle);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router =
        Router::new().route("/metrics", get(move || ready(metrics_handle.render())));

    Router::new().merge(api_router(state)).merge(metrics_router)
}

/// API routes with the middleware stack (split out for testing)
fn api_router(state: AppState) -> Router {
    // CORS configuration: the service fronts a local browser client
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let max_upload_bytes = state.config.extraction.max_upload_bytes;
    let request_timeout = state.config.request_timeout();
    let max_concurrent = state.config.server.max_concurrent_requests;

    Router::new()
        // Health endpoints
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/readiness", get(handlers::health::ready))
        // Generation endpoints
        .route("/ollama", get(handlers::generate::generate))
        .route("/models", get(handlers::generate::list_models))
        // Document endpoints
        .route("/process-pdf/", post(handlers::documents::process_pdf))
        .route("/map-chapters/", post(handlers::chapters::map_chapters))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use thaidoc_common::llm::MockGenerator;
    use tower::ServiceExt;

    fn mock_state() -> AppState {
        AppState {
            config: Arc::new(AppConfig::default()),
            generator: Arc::new(MockGenerator::new()),
        }
    }

    /// Build a minimal PDF with one page per entry in `page_texts`
    fn sample_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_texts.len() as i32,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    const BOUNDARY: &str = "thaidoc-test-boundary";

    /// Build a multipart/form-data body with a file part plus text fields
    fn multipart_body(filename: &str, file: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"{name}\"\r\n\r\n{value}"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = api_router(mock_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("healthy"));
    }

    #[tokio::test]
    async fn root_returns_running_message() {
        let app = api_router(mock_state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("running"));
    }

    #[tokio::test]
    async fn ollama_endpoint_forwards_prompt() {
        let app = api_router(mock_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ollama?prompt=hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("mock response"));
    }

    #[tokio::test]
    async fn process_pdf_corrects_second_page() {
        let app = api_router(mock_state());
        let pdf = sample_pdf(&["cover page", "chapter content here"]);
        let body = multipart_body("sample.pdf", &pdf, &[]);

        let response = app
            .oneshot(multipart_request("/process-pdf/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["filename"], "sample.pdf");
        assert_eq!(body["page_read"], 2);
        assert_eq!(body["corrected_text"], "mock response");
    }

    #[tokio::test]
    async fn process_pdf_rejects_non_pdf_filename() {
        let app = api_router(mock_state());
        let body = multipart_body("notes.txt", b"plain text", &[]);

        let response = app
            .oneshot(multipart_request("/process-pdf/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn process_pdf_rejects_single_page_document() {
        let app = api_router(mock_state());
        let pdf = sample_pdf(&["only page"]);
        let body = multipart_body("short.pdf", &pdf, &[]);

        let response = app
            .oneshot(multipart_request("/process-pdf/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn process_pdf_rejects_garbage_bytes() {
        let app = api_router(mock_state());
        let body = multipart_body("broken.pdf", b"not a pdf at all", &[]);

        let response = app
            .oneshot(multipart_request("/process-pdf/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn map_chapters_returns_empty_for_unmarked_document() {
        let app = api_router(mock_state());
        let pdf = sample_pdf(&["page one", "page two", "page three"]);
        let body = multipart_body(
            "novel.pdf",
            &pdf,
            &[("start_chapter", "1"), ("end_chapter", "3")],
        );

        let response = app
            .oneshot(multipart_request("/map-chapters/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["chapters"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn map_chapters_rejects_inverted_range() {
        let app = api_router(mock_state());
        let pdf = sample_pdf(&["page one", "page two"]);
        let body = multipart_body(
            "novel.pdf",
            &pdf,
            &[("start_chapter", "5"), ("end_chapter", "2")],
        );

        let response = app
            .oneshot(multipart_request("/map-chapters/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn map_chapters_requires_range_fields() {
        let app = api_router(mock_state());
        let pdf = sample_pdf(&["page one"]);
        let body = multipart_body("novel.pdf", &pdf, &[("start_chapter", "1")]);

        let response = app
            .oneshot(multipart_request("/map-chapters/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
