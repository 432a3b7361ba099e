//! HTTP entry point: the single GET callback endpoint plus a health probe.
//!
//! The transport layer stays deliberately thin. Every handled outcome,
//! success or failure, is a themed HTML page served with status 200; the
//! registrar never lets a provider fault propagate out as a transport error.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Router,
	extract::{Query, State},
	response::Html,
	routing::get,
};
// self
use crate::{
	_prelude::*,
	registration::{CallbackParams, Registrar},
};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
	registrar: Arc<Registrar>,
}
impl AppState {
	/// Wraps the registrar for handler access.
	pub fn new(registrar: Arc<Registrar>) -> Self {
		Self { registrar }
	}
}

/// Initializes the tracing subscriber from `RUST_LOG` (defaulting to info).
pub fn init_tracing() {
	use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "tourney_gate=info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();
}

/// Builds the axum router with all endpoints.
pub fn build_router(state: AppState) -> Router {
	Router::new()
		.route("/callback", get(callback_handler))
		.route("/health", get(health_handler))
		.with_state(state)
}

/// Binds the listener and serves until interrupted.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
	let listener = tokio::net::TcpListener::bind(addr).await?;

	tracing::info!(%addr, "listening");

	axum::serve(listener, build_router(state)).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "unable to install the interrupt handler");
	}

	tracing::info!("shutting down");
}

async fn callback_handler(
	State(state): State<AppState>,
	Query(params): Query<CallbackParams>,
) -> Html<String> {
	let page = state.registrar.handle_callback(params).await;

	tracing::debug!(kind = ?page.kind, "rendered callback page");

	Html(page.html)
}

async fn health_handler() -> &'static str {
	"OK"
}
