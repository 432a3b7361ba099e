//! Guild membership management against the chat provider.
//!
//! The chat leg resolves the registrant's chat identity, probes guild
//! membership with the privileged bot credential, and then either joins the
//! member (carrying the full configured role set and a display nickname) or
//! grants each configured role individually. Provider statuses are mapped to
//! tagged results at this boundary so the orchestration layer never branches
//! on raw status codes.

// crates.io
use reqwest::{Response, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	config::GateConfig,
	exchange::AccessToken,
};

/// Errors raised during chat-leg guild processing.
#[derive(Debug, ThisError)]
pub enum GuildError {
	/// The chat provider refused the registrant's bearer token.
	#[error("Chat self endpoint refused the token with status {status}.")]
	Unauthorized {
		/// HTTP status returned by the self endpoint.
		status: u16,
	},
	/// A chat endpoint answered with a body the gateway could not parse.
	#[error("Chat {endpoint} endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Which endpoint produced the body.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The join request came back with an unexpected status.
	#[error("Guild join request failed with status {status}.")]
	JoinFailed {
		/// HTTP status returned by the join request.
		status: u16,
	},
	/// The membership probe came back with a status that is neither
	/// member (200) nor not-a-member (404).
	#[error("Guild membership probe returned unexpected status {status}.")]
	UnexpectedStatus {
		/// HTTP status returned by the probe.
		status: u16,
	},
	/// Transport-level failure while calling the chat provider.
	#[error("Network error while calling the chat provider.")]
	Transport(#[from] reqwest::Error),
}

/// Tagged membership probe result; replaces raw status branching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipStatus {
	/// 404: the user is not in the guild yet.
	NotMember,
	/// 200: the user is already a guild member.
	Member,
	/// Any other status, propagated for the caller to act on.
	Unexpected(u16),
}
impl MembershipStatus {
	fn from_status(status: u16) -> Self {
		match status {
			200 => MembershipStatus::Member,
			404 => MembershipStatus::NotMember,
			other => MembershipStatus::Unexpected(other),
		}
	}
}

/// Per-role grant result collected by the role-assignment loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleGrant {
	/// Role identifier the grant was attempted for.
	pub role: String,
	/// HTTP status of the grant request; `None` when transport failed.
	pub status: Option<u16>,
}
impl RoleGrant {
	/// Checks whether the role was applied (204).
	pub fn granted(&self) -> bool {
		self.status == Some(204)
	}
}

/// Terminal membership outcome for one chat-leg completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipOutcome {
	/// The registrant was newly joined to the guild with the full role set.
	Joined,
	/// The registrant was already a member; one grant was attempted per role,
	/// in configured order, without rollback on partial failure.
	RolesAssigned(Vec<RoleGrant>),
	/// The membership probe returned something other than 200/404.
	Unexpected(u16),
}

/// Result of [`GuildManager::ensure_membership`], persisted to the roster.
#[derive(Clone, Debug)]
pub struct MembershipResult {
	/// Chat tag (`username#discriminator`).
	pub tag: String,
	/// Chat-provider user ID.
	pub external_id: String,
	/// What happened to the membership.
	pub outcome: MembershipOutcome,
}
impl MembershipResult {
	/// Whether the registrant was already in the guild before this request,
	/// when that could be determined.
	pub fn was_in_guild(&self) -> Option<bool> {
		match self.outcome {
			MembershipOutcome::Joined => Some(false),
			MembershipOutcome::RolesAssigned(_) => Some(true),
			MembershipOutcome::Unexpected(_) => None,
		}
	}
}

#[derive(Deserialize)]
struct ChatUser {
	id: String,
	username: String,
	discriminator: String,
}

#[derive(Serialize)]
struct JoinRequest<'a> {
	access_token: &'a str,
	roles: &'a [String],
	nick: &'a str,
}

#[derive(Serialize)]
struct RoleGrantRequest<'a> {
	access_token: &'a str,
}

/// Determines and establishes guild membership for a chat access token.
#[derive(Clone, Debug)]
pub struct GuildManager {
	config: Arc<GateConfig>,
	http: ReqwestClient,
}
impl GuildManager {
	/// Creates a manager sharing the process-wide HTTP client.
	pub fn new(config: Arc<GateConfig>, http: ReqwestClient) -> Self {
		Self { config, http }
	}

	/// Resolves the token bearer's chat identity, joins them to the guild if
	/// absent, or grants each configured role if already present.
	pub async fn ensure_membership(
		&self,
		token: &AccessToken,
		display_nickname: &str,
	) -> Result<MembershipResult, GuildError> {
		let user = self.fetch_self(token).await?;
		let tag = format!("{}#{}", user.username, user.discriminator);
		let status = self.probe_membership(&user.id).await?;
		let outcome = match status {
			MembershipStatus::NotMember => {
				self.join(token, &user.id, display_nickname).await?;

				MembershipOutcome::Joined
			},
			MembershipStatus::Member => {
				let grants = self.grant_roles(token, &user.id).await;

				MembershipOutcome::RolesAssigned(grants)
			},
			MembershipStatus::Unexpected(code) => MembershipOutcome::Unexpected(code),
		};

		Ok(MembershipResult { tag, external_id: user.id, outcome })
	}

	async fn fetch_self(&self, token: &AccessToken) -> Result<ChatUser, GuildError> {
		let response =
			self.http.get(self.api_url("users/@me")).bearer_auth(token.expose()).send().await?;
		let status = response.status().as_u16();

		if status != 200 {
			return Err(GuildError::Unauthorized { status });
		}

		parse_json(response, "self").await
	}

	async fn probe_membership(&self, chat_id: &str) -> Result<MembershipStatus, GuildError> {
		let url = self.member_url(chat_id);
		let response = self.http.get(url).header(AUTHORIZATION, self.bot_header()).send().await?;

		Ok(MembershipStatus::from_status(response.status().as_u16()))
	}

	async fn join(
		&self,
		token: &AccessToken,
		chat_id: &str,
		nickname: &str,
	) -> Result<(), GuildError> {
		let payload = JoinRequest {
			access_token: token.expose(),
			roles: &self.config.role_ids,
			nick: nickname,
		};
		let response = self
			.http
			.put(self.member_url(chat_id))
			.header(AUTHORIZATION, self.bot_header())
			.json(&payload)
			.send()
			.await?;
		let status = response.status().as_u16();

		// 201: joined; 204: the provider raced us and the user is already in.
		match status {
			201 | 204 => Ok(()),
			status => Err(GuildError::JoinFailed { status }),
		}
	}

	/// Grants are issued strictly in configured role order; individual
	/// failures are recorded and do not abort the loop or roll back.
	async fn grant_roles(&self, token: &AccessToken, chat_id: &str) -> Vec<RoleGrant> {
		let payload = RoleGrantRequest { access_token: token.expose() };
		let mut grants = Vec::with_capacity(self.config.role_ids.len());

		for role in &self.config.role_ids {
			let url = format!("{}/roles/{role}", self.member_url(chat_id));
			let status = match self
				.http
				.put(url)
				.header(AUTHORIZATION, self.bot_header())
				.json(&payload)
				.send()
				.await
			{
				Ok(response) => Some(response.status().as_u16()),
				Err(e) => {
					tracing::warn!(%role, error = %e, "role grant transport failure");

					None
				},
			};
			let grant = RoleGrant { role: role.clone(), status };

			if !grant.granted() {
				tracing::warn!(%role, status = ?grant.status, "role grant was not applied");
			}

			grants.push(grant);
		}

		grants
	}

	fn member_url(&self, chat_id: &str) -> String {
		self.api_url(&format!("guilds/{}/members/{chat_id}", self.config.guild_id))
	}

	fn api_url(&self, path: &str) -> String {
		format!("{}/{path}", self.config.chat.api_base.as_str().trim_end_matches('/'))
	}

	fn bot_header(&self) -> String {
		format!("Bot {}", self.config.chat.bot_token.expose())
	}
}

async fn parse_json<T>(response: Response, endpoint: &'static str) -> Result<T, GuildError>
where
	T: serde::de::DeserializeOwned,
{
	let bytes = response.bytes().await?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| GuildError::MalformedResponse { endpoint, source })
}
