//! Process-wide gateway configuration.
//!
//! Everything is loaded once at startup into an immutable [`GateConfig`] value
//! and passed by reference into each component constructor; no component reads
//! ambient environment state after construction.

// self
use crate::_prelude::*;

const DEFAULT_IDENTITY_AUTHORIZE_URL: &str = "https://osu.ppy.sh/oauth/authorize";
const DEFAULT_IDENTITY_TOKEN_URL: &str = "https://osu.ppy.sh/oauth/token";
const DEFAULT_IDENTITY_API_BASE: &str = "https://osu.ppy.sh/api/v2";
const DEFAULT_CHAT_AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";
const DEFAULT_CHAT_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const DEFAULT_CHAT_API_BASE: &str = "https://discord.com/api/v10";
// Badge descriptions matching any of these needles do not count towards a
// registrant's tournament badge total.
const DEFAULT_BADGE_FILTER: &[&str] =
	&["contrib", "mapping", "moderat", "nomination", "spotlight"];

/// Errors raised while loading or validating the gateway configuration.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable was absent or empty.
	#[error("Missing required environment variable `{var}`.")]
	MissingVar {
		/// Variable name that was absent.
		var: &'static str,
	},
	/// A variable that must hold a URL failed to parse.
	#[error("Environment variable `{var}` does not hold a valid URL.")]
	InvalidUrl {
		/// Variable name that failed validation.
		var: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A variable held a value the gateway could not interpret.
	#[error("Environment variable `{var}` is invalid: {reason}.")]
	InvalidVar {
		/// Variable name that failed validation.
		var: &'static str,
		/// Human-readable validation failure.
		reason: String,
	},
}

/// Redacted configuration secret (client secrets, bot token, state key).
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Ruleset the identity provider is queried for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GameMode {
	#[default]
	/// osu!standard.
	Osu,
	/// osu!taiko.
	Taiko,
	/// osu!catch.
	Fruits,
	/// osu!mania.
	Mania,
}
impl GameMode {
	/// Returns the API path segment for the mode.
	pub const fn as_str(self) -> &'static str {
		match self {
			GameMode::Osu => "osu",
			GameMode::Taiko => "taiko",
			GameMode::Fruits => "fruits",
			GameMode::Mania => "mania",
		}
	}
}
impl Display for GameMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for GameMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"osu" | "standard" => Ok(GameMode::Osu),
			"taiko" => Ok(GameMode::Taiko),
			"fruits" | "catch" | "ctb" => Ok(GameMode::Fruits),
			"mania" => Ok(GameMode::Mania),
			other => Err(format!("unknown game mode `{other}`")),
		}
	}
}

/// Identity-provider (game platform) OAuth endpoints and credentials.
#[derive(Clone, Debug)]
pub struct IdentityProvider {
	/// OAuth client identifier issued by the identity provider.
	pub client_id: String,
	/// OAuth client secret issued by the identity provider.
	pub client_secret: Secret,
	/// Authorization endpoint end-users are redirected to for leg A.
	pub authorize_url: Url,
	/// Token endpoint used for code exchanges and client-credentials grants.
	pub token_url: Url,
	/// Base URL of the provider's REST API.
	pub api_base: Url,
}

/// Chat-provider (community platform) OAuth endpoints and credentials.
#[derive(Clone, Debug)]
pub struct ChatProvider {
	/// OAuth client identifier issued by the chat provider.
	pub client_id: String,
	/// OAuth client secret issued by the chat provider.
	pub client_secret: Secret,
	/// Privileged bot credential used for guild membership management.
	pub bot_token: Secret,
	/// Authorization endpoint end-users are redirected to for leg B.
	pub authorize_url: Url,
	/// Token endpoint used for code exchanges.
	pub token_url: Url,
	/// Base URL of the provider's REST API.
	pub api_base: Url,
}

/// Immutable gateway configuration, constructed once at process start.
#[derive(Clone, Debug)]
pub struct GateConfig {
	/// Identity-provider endpoints and credentials.
	pub identity: IdentityProvider,
	/// Chat-provider endpoints and credentials.
	pub chat: ChatProvider,
	/// Callback URL both providers redirect to.
	pub redirect_uri: Url,
	/// Guild registrants are added to.
	pub guild_id: String,
	/// Role identifiers granted to registrants, in grant order.
	pub role_ids: Vec<String>,
	/// Tournament acronym used in page titles.
	pub acronym: String,
	/// Instant after which new registrations are refused.
	pub deadline: OffsetDateTime,
	/// Ruleset queried for registrant profiles.
	pub mode: GameMode,
	/// Key used to sign correlation tokens.
	pub state_secret: Secret,
	/// Lowercased needles excluding badge descriptions from the badge count.
	pub badge_filter: Vec<String>,
}
impl GateConfig {
	/// Loads the configuration from `TOURNEY_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| std::env::var(var).ok())
	}

	/// Loads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let identity = IdentityProvider {
			client_id: require(&lookup, "TOURNEY_IDENTITY_CLIENT_ID")?,
			client_secret: Secret::new(require(&lookup, "TOURNEY_IDENTITY_CLIENT_SECRET")?),
			authorize_url: url_or_default(
				&lookup,
				"TOURNEY_IDENTITY_AUTHORIZE_URL",
				DEFAULT_IDENTITY_AUTHORIZE_URL,
			)?,
			token_url: url_or_default(
				&lookup,
				"TOURNEY_IDENTITY_TOKEN_URL",
				DEFAULT_IDENTITY_TOKEN_URL,
			)?,
			api_base: url_or_default(
				&lookup,
				"TOURNEY_IDENTITY_API_BASE",
				DEFAULT_IDENTITY_API_BASE,
			)?,
		};
		let chat = ChatProvider {
			client_id: require(&lookup, "TOURNEY_CHAT_CLIENT_ID")?,
			client_secret: Secret::new(require(&lookup, "TOURNEY_CHAT_CLIENT_SECRET")?),
			bot_token: Secret::new(require(&lookup, "TOURNEY_CHAT_BOT_TOKEN")?),
			authorize_url: url_or_default(
				&lookup,
				"TOURNEY_CHAT_AUTHORIZE_URL",
				DEFAULT_CHAT_AUTHORIZE_URL,
			)?,
			token_url: url_or_default(&lookup, "TOURNEY_CHAT_TOKEN_URL", DEFAULT_CHAT_TOKEN_URL)?,
			api_base: url_or_default(&lookup, "TOURNEY_CHAT_API_BASE", DEFAULT_CHAT_API_BASE)?,
		};
		let redirect_uri = parse_url("TOURNEY_REDIRECT_URI", require(&lookup, "TOURNEY_REDIRECT_URI")?)?;
		let deadline = parse_deadline(require(&lookup, "TOURNEY_DEADLINE")?)?;
		let mode = match lookup("TOURNEY_MODE") {
			Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidVar {
				var: "TOURNEY_MODE",
				reason,
			})?,
			None => GameMode::default(),
		};
		let role_ids = split_list(require(&lookup, "TOURNEY_ROLE_IDS")?, ',');
		let badge_filter = match lookup("TOURNEY_BADGE_FILTER") {
			Some(raw) => split_list(raw, '|'),
			None => DEFAULT_BADGE_FILTER.iter().map(|needle| (*needle).to_owned()).collect(),
		};

		if role_ids.is_empty() {
			return Err(ConfigError::InvalidVar {
				var: "TOURNEY_ROLE_IDS",
				reason: "at least one role identifier is required".into(),
			});
		}

		Ok(Self {
			identity,
			chat,
			redirect_uri,
			guild_id: require(&lookup, "TOURNEY_GUILD_ID")?,
			role_ids,
			acronym: require(&lookup, "TOURNEY_ACRONYM")?,
			deadline,
			mode,
			state_secret: Secret::new(require(&lookup, "TOURNEY_STATE_SECRET")?),
			badge_filter,
		})
	}

	/// Checks whether registrations are still open at the provided instant.
	pub fn registration_open(&self, now: OffsetDateTime) -> bool {
		now <= self.deadline
	}
}

fn require<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	match lookup(var) {
		Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
		_ => Err(ConfigError::MissingVar { var }),
	}
}

fn parse_url(var: &'static str, value: String) -> Result<Url, ConfigError> {
	Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl { var, source })
}

fn url_or_default<F>(lookup: &F, var: &'static str, default: &str) -> Result<Url, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	match lookup(var) {
		Some(value) if !value.trim().is_empty() => parse_url(var, value),
		_ => parse_url(var, default.to_owned()),
	}
}

fn parse_deadline(value: String) -> Result<OffsetDateTime, ConfigError> {
	OffsetDateTime::parse(value.trim(), &time::format_description::well_known::Rfc3339).map_err(
		|e| ConfigError::InvalidVar {
			var: "TOURNEY_DEADLINE",
			reason: format!("expected an RFC 3339 timestamp: {e}"),
		},
	)
}

fn split_list(value: String, delimiter: char) -> Vec<String> {
	value
		.split(delimiter)
		.map(|part| part.trim().to_owned())
		.filter(|part| !part.is_empty())
		.collect()
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;

	// self
	use super::*;

	fn vars() -> HashMap<&'static str, &'static str> {
		HashMap::from([
			("TOURNEY_IDENTITY_CLIENT_ID", "identity-client"),
			("TOURNEY_IDENTITY_CLIENT_SECRET", "identity-secret"),
			("TOURNEY_CHAT_CLIENT_ID", "chat-client"),
			("TOURNEY_CHAT_CLIENT_SECRET", "chat-secret"),
			("TOURNEY_CHAT_BOT_TOKEN", "bot-token"),
			("TOURNEY_REDIRECT_URI", "https://cup.example.com/callback"),
			("TOURNEY_GUILD_ID", "100200300"),
			("TOURNEY_ROLE_IDS", "111, 222"),
			("TOURNEY_ACRONYM", "MOT"),
			("TOURNEY_DEADLINE", "2026-10-01T00:00:00Z"),
			("TOURNEY_STATE_SECRET", "state-key"),
		])
	}

	fn load(vars: HashMap<&'static str, &'static str>) -> Result<GateConfig, ConfigError> {
		GateConfig::from_lookup(|var| vars.get(var).map(|value| (*value).to_owned()))
	}

	#[test]
	fn loads_full_configuration_with_defaults() {
		let config = load(vars()).expect("Configuration fixture should load successfully.");

		assert_eq!(config.acronym, "MOT");
		assert_eq!(config.role_ids, vec!["111".to_owned(), "222".to_owned()]);
		assert_eq!(config.mode, GameMode::Osu);
		assert_eq!(config.identity.token_url.as_str(), DEFAULT_IDENTITY_TOKEN_URL);
		assert_eq!(config.chat.api_base.as_str(), DEFAULT_CHAT_API_BASE);
		assert!(!config.badge_filter.is_empty());
	}

	#[test]
	fn missing_variable_is_named() {
		let mut vars = vars();

		vars.remove("TOURNEY_GUILD_ID");

		let err = load(vars).expect_err("Missing guild identifier should fail.");

		assert!(matches!(err, ConfigError::MissingVar { var: "TOURNEY_GUILD_ID" }));
	}

	#[test]
	fn rejects_invalid_deadline_and_mode() {
		let mut bad_deadline = vars();

		bad_deadline.insert("TOURNEY_DEADLINE", "next tuesday");

		assert!(matches!(
			load(bad_deadline).expect_err("Non-RFC-3339 deadline should fail."),
			ConfigError::InvalidVar { var: "TOURNEY_DEADLINE", .. }
		));

		let mut bad_mode = vars();

		bad_mode.insert("TOURNEY_MODE", "chess");

		assert!(matches!(
			load(bad_mode).expect_err("Unknown mode should fail."),
			ConfigError::InvalidVar { var: "TOURNEY_MODE", .. }
		));
	}

	#[test]
	fn mode_aliases_parse() {
		assert_eq!("standard".parse::<GameMode>(), Ok(GameMode::Osu));
		assert_eq!("ctb".parse::<GameMode>(), Ok(GameMode::Fruits));
		assert_eq!(GameMode::Mania.as_str(), "mania");
	}

	#[test]
	fn registration_window_is_inclusive() {
		let config = load(vars()).expect("Configuration fixture should load successfully.");

		assert!(config.registration_open(config.deadline));
		assert!(!config.registration_open(config.deadline + time::Duration::seconds(1)));
	}

	#[test]
	fn secret_formatters_redact() {
		let secret = Secret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "Secret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}
}
