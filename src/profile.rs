//! Profile retrieval and normalization for the identity provider.
//!
//! Fetches the token bearer's profile (or, for the refresh sweep, an
//! arbitrary registrant's profile via a service token), applies the badge
//! filter, and normalizes the statistics block into the flat [`Profile`]
//! shape the roster persists. Bulky nested payload sections (page, monthly
//! play counts, achievements) are never deserialized.

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{
	_prelude::*,
	config::GateConfig,
	exchange::AccessToken,
};

const RESTRICTED_USERNAME: &str = "RESTRICTED";

/// Errors raised while fetching or normalizing a profile.
#[derive(Debug, ThisError)]
pub enum ProfileError {
	/// Provider refused the bearer token.
	#[error("Profile endpoint refused the token with status {status}.")]
	Unauthorized {
		/// HTTP status returned by the profile endpoint.
		status: u16,
	},
	/// The account is restricted/banned; registration must be refused.
	#[error("Account is restricted.")]
	Restricted,
	/// Profile endpoint answered 200 with a body the gateway could not parse.
	#[error("Profile endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Transport-level failure while calling the profile endpoint.
	#[error("Network error while calling the profile endpoint.")]
	Transport(#[from] reqwest::Error),
}

/// Normalized registrant profile, small enough for transient caching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	/// Identity-provider user ID (roster key).
	pub identity_id: u64,
	/// Current username.
	pub username: String,
	/// Global performance rank for the configured mode, if ranked.
	pub rank: Option<u64>,
	/// Performance points for the configured mode, if ranked.
	pub performance_points: Option<f64>,
	/// Lifetime play count for the configured mode.
	pub play_count: u64,
	/// Account creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub joined_at: OffsetDateTime,
	/// Tournament badge count after filtering.
	pub badge_count: u32,
	/// Avatar image URL.
	pub avatar_url: String,
	/// ISO country code.
	pub country_code: String,
}

/// Excludes non-tournament badges from the eligible badge count.
///
/// Patterns come from a configurable per-tournament list; a badge is ignored
/// when its lowercased description contains any needle (case-insensitive
/// substring/alternation semantics).
#[derive(Clone, Debug, Default)]
pub struct BadgeFilter {
	needles: Vec<String>,
}
impl BadgeFilter {
	/// Builds a filter from needle patterns, lowercasing and dropping blanks.
	pub fn new<I, S>(patterns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let needles = patterns
			.into_iter()
			.map(|pattern| pattern.as_ref().trim().to_lowercase())
			.filter(|pattern| !pattern.is_empty())
			.collect();

		Self { needles }
	}

	/// Checks whether a badge description is excluded from the count.
	pub fn ignores(&self, description: &str) -> bool {
		let description = description.to_lowercase();

		self.needles.iter().any(|needle| description.contains(needle))
	}

	fn eligible_count(&self, badges: &[RawBadge]) -> u32 {
		badges.iter().filter(|badge| !self.ignores(&badge.description)).count() as _
	}
}

#[derive(Deserialize)]
struct RawProfile {
	id: u64,
	username: String,
	#[serde(default)]
	avatar_url: String,
	#[serde(default)]
	country_code: String,
	#[serde(with = "time::serde::rfc3339")]
	join_date: OffsetDateTime,
	#[serde(default)]
	is_restricted: bool,
	#[serde(default)]
	badges: Vec<RawBadge>,
	statistics: RawStatistics,
}

#[derive(Deserialize)]
struct RawBadge {
	#[serde(default)]
	description: String,
}

#[derive(Deserialize)]
struct RawStatistics {
	pp_rank: Option<u64>,
	pp: Option<f64>,
	#[serde(default)]
	play_count: u64,
}

/// Fetches and normalizes identity-provider profiles.
#[derive(Clone, Debug)]
pub struct ProfileFetcher {
	config: Arc<GateConfig>,
	http: ReqwestClient,
	filter: BadgeFilter,
}
impl ProfileFetcher {
	/// Creates a fetcher with the configured badge filter.
	pub fn new(config: Arc<GateConfig>, http: ReqwestClient) -> Self {
		let filter = BadgeFilter::new(&config.badge_filter);

		Self { config, http, filter }
	}

	/// Fetches the token bearer's own profile for the configured mode.
	pub async fn fetch_own(&self, token: &AccessToken) -> Result<Profile, ProfileError> {
		let url = self.api_url(&format!("me/{}", self.config.mode));

		self.fetch(token, url).await
	}

	/// Fetches a specific registrant's profile; used by the refresh sweep
	/// with a client-credentials service token.
	pub async fn fetch_user(
		&self,
		token: &AccessToken,
		identity_id: u64,
	) -> Result<Profile, ProfileError> {
		let url = self.api_url(&format!("users/{identity_id}/{}", self.config.mode));

		self.fetch(token, url).await
	}

	async fn fetch(&self, token: &AccessToken, url: String) -> Result<Profile, ProfileError> {
		let response = self
			.http
			.get(url)
			.bearer_auth(token.expose())
			.header(ACCEPT, "application/json")
			.send()
			.await?;
		let status = response.status();

		if status.as_u16() != 200 {
			return Err(ProfileError::Unauthorized { status: status.as_u16() });
		}

		let bytes = response.bytes().await?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let raw: RawProfile = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ProfileError::MalformedResponse { source })?;

		if raw.is_restricted || raw.username == RESTRICTED_USERNAME {
			return Err(ProfileError::Restricted);
		}

		Ok(Profile {
			identity_id: raw.id,
			username: raw.username,
			rank: raw.statistics.pp_rank,
			performance_points: raw.statistics.pp,
			play_count: raw.statistics.play_count,
			joined_at: raw.join_date,
			badge_count: self.filter.eligible_count(&raw.badges),
			avatar_url: raw.avatar_url,
			country_code: raw.country_code,
		})
	}

	fn api_url(&self, path: &str) -> String {
		format!("{}/{path}", self.config.identity.api_base.as_str().trim_end_matches('/'))
	}
}
