//! Tournament registration gateway—correlate two sequential OAuth 2.0 handshakes (game
//! identity, then community chat), place registrants into a guild with tournament roles, and
//! keep a deduplicated roster fresh in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod exchange;
pub mod guild;
pub mod obs;
pub mod profile;
pub mod registration;
pub mod render;
pub mod roster;
pub mod server;
pub mod state;
pub mod sweep;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience fixtures and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use time::macros::datetime;
	// self
	use crate::{
		config::{ChatProvider, GameMode, GateConfig, IdentityProvider, Secret},
		registration::{OperatorNotifier, Registrar},
		render::HtmlRenderer,
		roster::{MemoryRoster, RegistrantRecord},
	};

	/// Builds a gateway configuration whose provider endpoints all live under `base`.
	pub fn test_config(base: &str) -> GateConfig {
		let url = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Test endpoint URL should parse.")
		};

		GateConfig {
			identity: IdentityProvider {
				client_id: "identity-client".into(),
				client_secret: Secret::new("identity-secret"),
				authorize_url: url("/oauth/authorize"),
				token_url: url("/oauth/token"),
				api_base: url("/api/v2"),
			},
			chat: ChatProvider {
				client_id: "chat-client".into(),
				client_secret: Secret::new("chat-secret"),
				bot_token: Secret::new("bot-token"),
				authorize_url: url("/chat/oauth2/authorize"),
				token_url: url("/chat/oauth2/token"),
				api_base: url("/chat/api"),
			},
			redirect_uri: Url::parse("https://cup.example.com/callback")
				.expect("Test redirect URI should parse."),
			guild_id: "100200300".into(),
			role_ids: vec!["111".into(), "222".into()],
			acronym: "MOT".into(),
			deadline: datetime!(2099-01-01 0:00 UTC),
			mode: GameMode::Osu,
			state_secret: Secret::new("state-test-key"),
			badge_filter: vec!["contrib".into(), "mapping".into()],
		}
	}

	/// Past-deadline variant of [`test_config`].
	pub fn closed_test_config(base: &str) -> GateConfig {
		let mut config = test_config(base);

		config.deadline = datetime!(2000-01-01 0:00 UTC);

		config
	}

	/// Builds a roster row fixture for the given registrant.
	pub fn test_record(identity_id: u64, username: &str) -> RegistrantRecord {
		RegistrantRecord {
			registered_at: datetime!(2026-01-10 12:00 UTC),
			identity_id,
			username: username.into(),
			rank: Some(1_234),
			performance_points: Some(4_321.5),
			play_count: 10_000,
			joined_at: datetime!(2015-06-01 0:00 UTC),
			badge_count: 1,
			avatar_url: format!("https://a.example.com/{identity_id}.png"),
			country_code: "PT".into(),
			chat_tag: None,
			chat_id: None,
			was_in_guild: None,
		}
	}

	/// Operator notifier that records every stuck registration it sees.
	#[derive(Debug, Default)]
	pub struct RecordingNotifier {
		stuck: parking_lot::Mutex<Vec<(u64, String)>>,
	}
	impl RecordingNotifier {
		/// Returns the stuck registrations recorded so far.
		pub fn stuck(&self) -> Vec<(u64, String)> {
			self.stuck.lock().clone()
		}
	}
	impl OperatorNotifier for RecordingNotifier {
		fn notify_stuck(&self, identity_id: u64, identity_username: &str, _error: &Error) {
			self.stuck.lock().push((identity_id, identity_username.to_owned()));
		}
	}

	/// Constructs a [`Registrar`] backed by an in-memory roster, the HTML renderer, and a
	/// recording notifier, returning the backing handles for assertions.
	pub fn build_test_registrar(
		config: GateConfig,
	) -> (Registrar, Arc<MemoryRoster>, Arc<RecordingNotifier>) {
		let roster = Arc::new(MemoryRoster::default());
		let notifier = Arc::new(RecordingNotifier::default());
		let registrar = Registrar::new(
			Arc::new(config),
			ReqwestClient::new(),
			roster.clone(),
			Arc::new(HtmlRenderer),
			notifier.clone(),
		);

		(registrar, roster, notifier)
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tourney_gate as _};
