use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    routing::{get, post},
};
use cutplan::io::{ParamsDoc, ResultDoc, result_doc};
use cutplan::types::{Method, SolveError, Unused};
use cutplan::{Pool, calculate};
use serde::Deserialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize)]
struct CalculateQuery {
    #[serde(default = "default_method")]
    method: String,
}

fn default_method() -> String {
    "forward_greedy".to_string()
}

async fn calculate_handler(
    Query(query): Query<CalculateQuery>,
    Json(doc): Json<ParamsDoc>,
) -> Result<Json<ResultDoc>, (StatusCode, String)> {
    let method = match query.method.as_str() {
        "greedy" => Method::Greedy,
        "forward_greedy" | "forward-greedy" => Method::ForwardGreedy,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("invalid method '{other}', expected: greedy or forward_greedy"),
            ));
        }
    };

    let params = doc
        .into_params()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!(
        ?method,
        panels = params.panels.len(),
        items = params.items.len(),
        "POST /calculate"
    );

    let mut pool = Pool::<Unused>::new();
    match calculate(&mut pool, method, &params) {
        Ok(layout) => Ok(Json(result_doc(&params, &layout))),
        Err(SolveError::Unsolvable) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "unsolvable: no feasible placement for every item".to_string(),
        )),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

#[tokio::main]
async fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/calculate", post(calculate_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
