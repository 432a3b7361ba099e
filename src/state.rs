//! Correlation token threaded through both OAuth redirect legs.
//!
//! The `state` query parameter correlates the two independent handshakes: it
//! is minted when redirecting the registrant to a provider and parsed exactly
//! once when the provider calls back. The payload is base64url-encoded JSON
//! carrying the leg discriminator (and, for leg B, the identity resolved in
//! leg A) plus a random nonce, and is HMAC-SHA256 signed so a browser cannot
//! forge a chat-leg callback that attaches arbitrary roster rows to its own
//! chat account.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric};
use sha2::Sha256;
// self
use crate::{_prelude::*, config::GateConfig};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;
const IDENTITY_SCOPE: &str = "identify";
// Requested at authorize time and repeated in the token exchange.
pub(crate) const CHAT_SCOPE: &str = "identify guilds.join";

/// Errors raised while decoding an inbound correlation token.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum StateError {
	/// Token is not `payload.signature` base64url or carries unparseable claims.
	#[error("Correlation token is malformed.")]
	Malformed,
	/// Token signature does not verify against the configured key.
	#[error("Correlation token signature mismatch.")]
	BadSignature,
}

/// Which OAuth leg an inbound callback belongs to, plus the leg-B payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "leg", rename_all = "snake_case")]
pub enum Leg {
	/// Leg A: identity-provider callback, no payload.
	Identity,
	/// Leg B: chat-provider callback carrying the identity resolved in leg A.
	Chat {
		/// Identity-provider user ID resolved during leg A.
		identity_id: u64,
		/// Identity-provider username resolved during leg A.
		identity_username: String,
	},
}

#[derive(Serialize, Deserialize)]
struct Claims {
	#[serde(flatten)]
	leg: Leg,
	nonce: String,
}

/// Mints and verifies signed correlation tokens.
#[derive(Clone)]
pub struct StateSigner {
	key: Vec<u8>,
}
impl StateSigner {
	/// Creates a signer from the configured state secret.
	pub fn new(config: &GateConfig) -> Self {
		Self { key: config.state_secret.expose().as_bytes().to_vec() }
	}

	/// Encodes and signs a leg into its wire form (`payload.signature`).
	pub fn encode(&self, leg: &Leg) -> String {
		let claims = Claims { leg: leg.clone(), nonce: random_nonce() };
		// Claims are plain JSON-serializable values, so this cannot fail.
		let json = serde_json::to_vec(&claims).unwrap_or_default();
		let payload = URL_SAFE_NO_PAD.encode(&json);
		let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));

		format!("{payload}.{signature}")
	}

	/// Verifies and decodes an inbound token back into its leg.
	pub fn decode(&self, raw: &str) -> Result<Leg, StateError> {
		let (payload, signature) = raw.split_once('.').ok_or(StateError::Malformed)?;
		let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| StateError::Malformed)?;
		let mut mac = self.mac();

		mac.update(payload.as_bytes());
		// Constant-time comparison via the hmac crate.
		mac.verify_slice(&signature).map_err(|_| StateError::BadSignature)?;

		let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| StateError::Malformed)?;
		let claims: Claims = serde_json::from_slice(&json).map_err(|_| StateError::Malformed)?;

		Ok(claims.leg)
	}

	fn sign(&self, payload: &[u8]) -> Vec<u8> {
		let mut mac = self.mac();

		mac.update(payload);

		mac.finalize().into_bytes().to_vec()
	}

	fn mac(&self) -> HmacSha256 {
		// HMAC accepts keys of any length.
		HmacSha256::new_from_slice(&self.key).unwrap_or_else(|_| unreachable!())
	}
}
impl Debug for StateSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StateSigner(..)")
	}
}

/// Builds the identity-provider authorize URL used on the registration post.
pub fn identity_authorize_url(config: &GateConfig, signer: &StateSigner) -> Url {
	authorize_url(
		&config.identity.authorize_url,
		&config.identity.client_id,
		&config.redirect_uri,
		IDENTITY_SCOPE,
		&signer.encode(&Leg::Identity),
	)
}

/// Builds the chat-provider authorize URL embedded in the leg-A success page.
pub fn chat_authorize_url(
	config: &GateConfig,
	signer: &StateSigner,
	identity_id: u64,
	identity_username: &str,
) -> Url {
	let leg = Leg::Chat { identity_id, identity_username: identity_username.to_owned() };

	authorize_url(
		&config.chat.authorize_url,
		&config.chat.client_id,
		&config.redirect_uri,
		CHAT_SCOPE,
		&signer.encode(&leg),
	)
}

fn authorize_url(
	endpoint: &Url,
	client_id: &str,
	redirect_uri: &Url,
	scope: &str,
	state: &str,
) -> Url {
	let mut url = endpoint.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());
	pairs.append_pair("scope", scope);
	pairs.append_pair("state", state);

	drop(pairs);

	url
}

fn random_nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn signer(key: &str) -> StateSigner {
		StateSigner { key: key.as_bytes().to_vec() }
	}

	#[test]
	fn legs_round_trip() {
		let signer = signer("roundtrip-key");
		let chat = Leg::Chat { identity_id: 42, identity_username: "foo".into() };

		assert_eq!(
			signer.decode(&signer.encode(&Leg::Identity)).expect("Identity leg should decode."),
			Leg::Identity,
		);
		assert_eq!(signer.decode(&signer.encode(&chat)).expect("Chat leg should decode."), chat);
	}

	#[test]
	fn tampered_payload_is_rejected() {
		let signer = signer("tamper-key");
		let token = signer.encode(&Leg::Chat { identity_id: 42, identity_username: "foo".into() });
		let (_, signature) = token.split_once('.').expect("Token should contain a signature.");
		let forged_claims = serde_json::json!({
			"leg": "chat",
			"identity_id": 43,
			"identity_username": "mallory",
			"nonce": "aaaaaaaaaaaaaaaa",
		});
		let forged_payload = URL_SAFE_NO_PAD.encode(
			serde_json::to_vec(&forged_claims).expect("Forged claims should serialize."),
		);
		let forged = format!("{forged_payload}.{signature}");

		assert_eq!(signer.decode(&forged), Err(StateError::BadSignature));
	}

	#[test]
	fn wrong_key_and_garbage_are_rejected() {
		let token = signer("key-one").encode(&Leg::Identity);

		assert_eq!(signer("key-two").decode(&token), Err(StateError::BadSignature));
		assert_eq!(signer("key-one").decode("not-a-token"), Err(StateError::Malformed));
		assert_eq!(signer("key-one").decode("payload.%%%"), Err(StateError::Malformed));
	}

	#[test]
	fn chat_state_survives_the_authorize_url() {
		let config = crate::_preludet::test_config("https://providers.example.com");
		let signer = StateSigner::new(&config);
		let url = chat_authorize_url(&config, &signer, 42, "foo");
		let state = url
			.query_pairs()
			.find(|(key, _)| key == "state")
			.map(|(_, value)| value.into_owned())
			.expect("Authorize URL should carry a state parameter.");

		assert_eq!(
			signer.decode(&state).expect("Embedded state should decode."),
			Leg::Chat { identity_id: 42, identity_username: "foo".into() },
		);
		assert_eq!(
			url.query_pairs().find(|(key, _)| key == "scope").map(|(_, value)| value.into_owned()),
			Some(CHAT_SCOPE.to_owned()),
		);
	}
}
