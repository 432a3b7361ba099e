//! Token exchange client for both providers.
//!
//! Stateless request/response conversions from an authorization code to a
//! short-lived bearer token. Only the access token is extracted from provider
//! responses; refresh tokens are never requested nor stored. No retries are
//! performed here, callers decide what a failed exchange means.

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{_prelude::*, config::GateConfig, state::CHAT_SCOPE};

/// Which provider an exchange (or its failure) belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
	/// The game identity provider (leg A).
	Identity,
	/// The community chat provider (leg B).
	Chat,
}
impl Provider {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Provider::Identity => "identity",
			Provider::Chat => "chat",
		}
	}
}
impl Display for Provider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Errors raised by token exchanges.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Provider refused the authorization code (bad, expired, or replayed).
	#[error("{provider} token endpoint rejected the grant with status {status}.")]
	CodeRejected {
		/// Provider that rejected the grant.
		provider: Provider,
		/// HTTP status returned by the token endpoint.
		status: u16,
	},
	/// Token endpoint answered 200 with a body the gateway could not parse.
	#[error("{provider} token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Provider that produced the body.
		provider: Provider,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Transport-level failure while calling the token endpoint.
	#[error("Network error while calling the {provider} token endpoint.")]
	Transport {
		/// Provider that was being called.
		provider: Provider,
		/// Underlying transport failure.
		#[source]
		source: reqwest::Error,
	},
}

/// Redacted short-lived bearer token returned by a provider's token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	// Refresh tokens and every other field are deliberately dropped.
	access_token: String,
}

/// Converts authorization codes into access tokens for either provider.
#[derive(Clone, Debug)]
pub struct TokenExchanger {
	config: Arc<GateConfig>,
	http: ReqwestClient,
}
impl TokenExchanger {
	/// Creates an exchanger sharing the process-wide HTTP client.
	pub fn new(config: Arc<GateConfig>, http: ReqwestClient) -> Self {
		Self { config, http }
	}

	/// Exchanges a leg-A authorization code at the identity provider.
	///
	/// The identity provider's token endpoint takes a JSON body.
	pub async fn exchange_identity_code(&self, code: &str) -> Result<AccessToken, AuthError> {
		let provider = Provider::Identity;
		let body = serde_json::json!({
			"grant_type": "authorization_code",
			"client_id": self.config.identity.client_id,
			"client_secret": self.config.identity.client_secret.expose(),
			"redirect_uri": self.config.redirect_uri.as_str(),
			"code": code,
		});
		let response = self
			.http
			.post(self.config.identity.token_url.clone())
			.header(ACCEPT, "application/json")
			.json(&body)
			.send()
			.await
			.map_err(|source| AuthError::Transport { provider, source })?;

		extract_access_token(provider, response).await
	}

	/// Exchanges a leg-B authorization code at the chat provider.
	///
	/// The chat provider's token endpoint takes a form-encoded body.
	pub async fn exchange_chat_code(&self, code: &str) -> Result<AccessToken, AuthError> {
		let provider = Provider::Chat;
		let form = [
			("client_id", self.config.chat.client_id.as_str()),
			("client_secret", self.config.chat.client_secret.expose()),
			("grant_type", "authorization_code"),
			("code", code),
			("redirect_uri", self.config.redirect_uri.as_str()),
			("scope", CHAT_SCOPE),
		];
		let response = self
			.http
			.post(self.config.chat.token_url.clone())
			.form(&form)
			.send()
			.await
			.map_err(|source| AuthError::Transport { provider, source })?;

		extract_access_token(provider, response).await
	}

	/// Obtains a service token from the identity provider via the
	/// `client_credentials` grant; used by the roster refresh sweep.
	pub async fn client_credentials(&self) -> Result<AccessToken, AuthError> {
		let provider = Provider::Identity;
		let form = [
			("grant_type", "client_credentials"),
			("client_id", self.config.identity.client_id.as_str()),
			("client_secret", self.config.identity.client_secret.expose()),
			("scope", "public"),
		];
		let response = self
			.http
			.post(self.config.identity.token_url.clone())
			.header(ACCEPT, "application/json")
			.form(&form)
			.send()
			.await
			.map_err(|source| AuthError::Transport { provider, source })?;

		extract_access_token(provider, response).await
	}
}

async fn extract_access_token(
	provider: Provider,
	response: reqwest::Response,
) -> Result<AccessToken, AuthError> {
	let status = response.status();

	if status.as_u16() != 200 {
		return Err(AuthError::CodeRejected { provider, status: status.as_u16() });
	}

	let bytes =
		response.bytes().await.map_err(|source| AuthError::Transport { provider, source })?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
	let payload: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AuthError::MalformedResponse { provider, source })?;

	Ok(AccessToken::new(payload.access_token))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn access_token_formatters_redact() {
		let token = AccessToken::new("bearer-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
	}

	#[test]
	fn provider_labels_are_stable() {
		assert_eq!(Provider::Identity.as_str(), "identity");
		assert_eq!(Provider::Chat.to_string(), "chat");
	}
}
