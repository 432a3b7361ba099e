//! Tournament registration gateway service binary.

// std
use std::{net::SocketAddr, sync::Arc};
// crates.io
use tourney_gate::{
	config::GateConfig,
	registration::{LogNotifier, Registrar},
	render::HtmlRenderer,
	roster::FileRoster,
	server::{self, AppState},
};

#[tokio::main]
async fn main() {
	server::init_tracing();

	let config = match GateConfig::from_env() {
		Ok(c) => Arc::new(c),
		Err(e) => {
			tracing::error!(error = %e, "invalid configuration");

			std::process::exit(1);
		},
	};
	let roster_path =
		std::env::var("TOURNEY_ROSTER_PATH").unwrap_or_else(|_| "roster.json".into());
	let roster = match FileRoster::open(roster_path) {
		Ok(r) => Arc::new(r),
		Err(e) => {
			tracing::error!(error = %e, "unable to open the roster file");

			std::process::exit(1);
		},
	};
	let registrar = Arc::new(Registrar::new(
		config,
		tourney_gate::reqwest::Client::new(),
		roster,
		Arc::new(HtmlRenderer),
		Arc::new(LogNotifier),
	));

	tracing::info!(url = %registrar.identity_authorize_url(), "sign-up link");

	let addr = std::env::var("TOURNEY_LISTEN")
		.ok()
		.and_then(|raw| raw.parse().ok())
		.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3_000)));

	if let Err(e) = server::serve(addr, AppState::new(registrar)).await {
		tracing::error!(error = %e, "server terminated");

		std::process::exit(1);
	}
}
