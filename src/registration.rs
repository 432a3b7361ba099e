//! Registration state machine.
//!
//! One inbound callback drives one transition: the correlation token decides
//! which leg the request belongs to, the leg handler performs its exchanges
//! and roster writes, and every outcome (success or failure) collapses into a
//! rendered page. Provider failures never propagate past this module to the
//! transport layer.

// self
use crate::{
	_prelude::*,
	config::GateConfig,
	exchange::TokenExchanger,
	guild::{GuildError, GuildManager, MembershipOutcome},
	obs::{self, FlowKind, FlowOutcome},
	profile::{Profile, ProfileError, ProfileFetcher},
	render::{PageContext, PageKind, PageRenderer, RenderedPage},
	roster::{ChatColumns, RegistrantRecord, RosterError, RosterStore},
	state::{self, Leg, StateSigner},
};

/// Query parameters of the single GET callback endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
	/// Correlation token round-tripped through the provider redirect.
	pub state: Option<String>,
	/// Provider authorization code.
	pub code: Option<String>,
	/// Present when the user denied a provider's consent screen.
	pub error: Option<String>,
}

/// Out-of-band alert channel for stuck registrations.
///
/// A chat-leg failure leaves a roster row without its chat linkage, which
/// requires manual remediation, so an operator is told about every one.
pub trait OperatorNotifier
where
	Self: Send + Sync,
{
	/// Reports a chat-leg failure for the given registrant.
	fn notify_stuck(&self, identity_id: u64, identity_username: &str, error: &Error);
}

/// Notifier that raises the alert through the log/alerting pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;
impl OperatorNotifier for LogNotifier {
	fn notify_stuck(&self, identity_id: u64, identity_username: &str, error: &Error) {
		tracing::error!(
			identity_id,
			identity_username,
			error = %error,
			"registration stuck: roster row is missing its chat linkage",
		);
	}
}

/// Orchestrates the two-leg registration flow.
pub struct Registrar {
	config: Arc<GateConfig>,
	signer: StateSigner,
	exchanger: TokenExchanger,
	profiles: ProfileFetcher,
	guild: GuildManager,
	roster: Arc<dyn RosterStore>,
	renderer: Arc<dyn PageRenderer>,
	notifier: Arc<dyn OperatorNotifier>,
}
impl Registrar {
	/// Wires the flow components around a shared HTTP client and config.
	pub fn new(
		config: Arc<GateConfig>,
		http: ReqwestClient,
		roster: Arc<dyn RosterStore>,
		renderer: Arc<dyn PageRenderer>,
		notifier: Arc<dyn OperatorNotifier>,
	) -> Self {
		let signer = StateSigner::new(&config);
		let exchanger = TokenExchanger::new(config.clone(), http.clone());
		let profiles = ProfileFetcher::new(config.clone(), http.clone());
		let guild = GuildManager::new(config.clone(), http);

		Self { config, signer, exchanger, profiles, guild, roster, renderer, notifier }
	}

	/// Returns the leg-A authorize URL published on the tournament post.
	pub fn identity_authorize_url(&self) -> Url {
		state::identity_authorize_url(&self.config, &self.signer)
	}

	/// Handles one inbound provider callback.
	pub async fn handle_callback(&self, params: CallbackParams) -> RenderedPage {
		self.handle_callback_at(params, OffsetDateTime::now_utc()).await
	}

	/// Handles one inbound provider callback against an explicit clock.
	///
	/// The deadline gate runs before anything else: past-deadline requests
	/// render the expired page without any OAuth processing.
	pub async fn handle_callback_at(
		&self,
		params: CallbackParams,
		now: OffsetDateTime,
	) -> RenderedPage {
		if !self.config.registration_open(now) {
			let context = self
				.context(PageKind::Expired)
				.with_deadline(format_deadline(self.config.deadline));

			return self.renderer.render(&context);
		}
		if params.error.is_some() {
			return self.render(PageKind::Denied);
		}

		let Some(raw_state) = params.state else {
			return self.render(PageKind::Unauthorized);
		};
		let leg = match self.signer.decode(&raw_state) {
			Ok(leg) => leg,
			Err(e) => {
				tracing::warn!(error = %e, "discarding callback with an undecodable state token");

				return self.render(PageKind::Unauthorized);
			},
		};

		match leg {
			Leg::Identity => self.identity_leg(params.code).await,
			Leg::Chat { identity_id, identity_username } =>
				self.chat_leg(identity_id, identity_username, params.code).await,
		}
	}

	async fn identity_leg(&self, code: Option<String>) -> RenderedPage {
		const KIND: FlowKind = FlowKind::IdentityLeg;

		let Some(code) = code else {
			return self.render(PageKind::Unauthorized);
		};

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		match self.identity_leg_inner(&code).await {
			Ok(page) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				page
			},
			Err(Error::Auth(e)) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::warn!(error = %e, "identity code exchange failed");

				self.render(PageKind::Unauthorized)
			},
			Err(Error::Profile(ProfileError::Restricted)) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::info!("refusing registration for a restricted account");

				self.render(PageKind::Restricted)
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::error!(error = %e, "identity leg failed");

				self.render(PageKind::Error)
			},
		}
	}

	async fn identity_leg_inner(&self, code: &str) -> Result<RenderedPage> {
		let token = self.exchanger.exchange_identity_code(code).await?;
		let profile = self.profiles.fetch_own(&token).await?;
		let continue_url = state::chat_authorize_url(
			&self.config,
			&self.signer,
			profile.identity_id,
			&profile.username,
		);

		if self.roster.exists(profile.identity_id).await? {
			tracing::info!(
				identity_id = profile.identity_id,
				username = %profile.username,
				"registrant already present; no row appended",
			);

			return Ok(self.leg_a_page(PageKind::AlreadyRegistered, &profile, continue_url));
		}

		let record = RegistrantRecord::from_profile(&profile, OffsetDateTime::now_utc());

		self.roster.append(record).await?;
		tracing::info!(
			identity_id = profile.identity_id,
			username = %profile.username,
			badge_count = profile.badge_count,
			"registrant appended to the roster",
		);

		Ok(self.leg_a_page(PageKind::Registered, &profile, continue_url))
	}

	async fn chat_leg(
		&self,
		identity_id: u64,
		identity_username: String,
		code: Option<String>,
	) -> RenderedPage {
		const KIND: FlowKind = FlowKind::ChatLeg;

		let Some(code) = code else {
			return self.render(PageKind::Unauthorized);
		};

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		match self.chat_leg_inner(identity_id, &identity_username, &code).await {
			Ok(page) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				page
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.notifier.notify_stuck(identity_id, &identity_username, &e);

				self.render(PageKind::Error)
			},
		}
	}

	async fn chat_leg_inner(
		&self,
		identity_id: u64,
		identity_username: &str,
		code: &str,
	) -> Result<RenderedPage> {
		let token = self.exchanger.exchange_chat_code(code).await?;
		let membership = self.guild.ensure_membership(&token, identity_username).await?;
		let index = self
			.roster
			.find_row(identity_id)
			.await?
			.ok_or(Error::Roster(RosterError::MissingRegistrant { identity_id }))?;
		let columns = ChatColumns {
			tag: membership.tag.clone(),
			id: membership.external_id.clone(),
			was_in_guild: membership.was_in_guild(),
		};

		self.roster.update_chat_columns(index, columns).await?;
		tracing::info!(
			identity_id,
			chat_tag = %membership.tag,
			chat_id = %membership.external_id,
			"chat linkage written to the roster",
		);

		match membership.outcome {
			MembershipOutcome::Joined =>
				Ok(self.renderer.render(&self.context(PageKind::GuildJoined).with_tag(membership.tag))),
			MembershipOutcome::RolesAssigned(grants) => {
				let granted = grants.iter().filter(|grant| grant.granted()).count();

				tracing::info!(granted, attempted = grants.len(), "role grants applied");

				Ok(self
					.renderer
					.render(&self.context(PageKind::RolesUpdated).with_tag(membership.tag)))
			},
			MembershipOutcome::Unexpected(status) =>
				Err(GuildError::UnexpectedStatus { status }.into()),
		}
	}

	fn leg_a_page(&self, kind: PageKind, profile: &Profile, continue_url: Url) -> RenderedPage {
		let context = self
			.context(kind)
			.with_username(&profile.username)
			.with_rank(profile.rank)
			.with_continue_url(continue_url);

		self.renderer.render(&context)
	}

	fn context(&self, kind: PageKind) -> PageContext {
		PageContext::new(kind, &self.config.acronym)
	}

	fn render(&self, kind: PageKind) -> RenderedPage {
		self.renderer.render(&self.context(kind))
	}
}
impl Debug for Registrar {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registrar").field("acronym", &self.config.acronym).finish()
	}
}

fn format_deadline(deadline: OffsetDateTime) -> String {
	deadline
		.format(&time::format_description::well_known::Rfc2822)
		.map(|formatted| formatted.replace("+0000", "UTC"))
		.unwrap_or_else(|_| deadline.to_string())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn deadline_formats_as_utc() {
		let deadline = time::macros::datetime!(2026-10-01 00:00:00 UTC);
		let formatted = format_deadline(deadline);

		assert!(formatted.contains("Oct 2026"));
		assert!(formatted.ends_with("UTC"));
	}
}
