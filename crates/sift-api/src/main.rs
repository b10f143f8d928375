use sift_api::config::ApiConfig;
use sift_api::routes;
use sift_api::state::AppState;
use sift_query::Compiler;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ApiConfig::from_env().unwrap_or_else(|e| {
        eprintln!("invalid SIFT_FUNCTIONS: {e}");
        std::process::exit(1);
    });

    let functions = config.functions.len();
    let unknown = config.options.unknown;
    let page_size = config.options.default_page_size;
    let compiler = Compiler::with_resolver(config.functions).with_options(config.options);
    let state = AppState::new(compiler);

    let app = routes::router().with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("failed to bind {}: {e}", config.addr);
            std::process::exit(1);
        });

    tracing::info!(functions, ?unknown, page_size, "sift-api listening on {}", config.addr);
    axum::serve(listener, app).await.unwrap();
}
