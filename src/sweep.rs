//! Periodic roster refresh sweep.
//!
//! Re-fetches every registrant's profile with a client-credentials service
//! token and writes the refreshed block back in one batch, so a concurrent
//! manual edit never interleaves with a half-written sweep. An advisory lock
//! serializes sweeps against each other; restricted accounts keep their row
//! but get their username tagged instead of overwritten.

// self
use crate::{
	_prelude::*,
	exchange::TokenExchanger,
	obs::{self, FlowKind, FlowOutcome},
	profile::{ProfileError, ProfileFetcher},
	roster::{ProfileColumns, RosterStore},
};

const RESTRICTED_TAG: &str = " [RESTRICTED]";

/// Per-sweep summary returned by [`RosterSweep::refresh`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
	/// Rows whose profile columns were refreshed.
	pub refreshed: usize,
	/// Rows tagged as restricted this sweep.
	pub restricted: usize,
	/// Rows skipped because their profile fetch failed.
	pub skipped: usize,
}

/// Refreshes persisted profile columns for every roster row.
pub struct RosterSweep {
	exchanger: TokenExchanger,
	profiles: ProfileFetcher,
	roster: Arc<dyn RosterStore>,
	advisory: AsyncMutex<()>,
}
impl RosterSweep {
	/// Creates a sweep over the provided roster.
	pub fn new(
		exchanger: TokenExchanger,
		profiles: ProfileFetcher,
		roster: Arc<dyn RosterStore>,
	) -> Self {
		Self { exchanger, profiles, roster, advisory: AsyncMutex::new(()) }
	}

	/// Runs one full sweep: snapshot, sequential re-fetch, single batch
	/// write-back.
	pub async fn refresh(&self) -> Result<SweepReport> {
		const KIND: FlowKind = FlowKind::Sweep;

		let _advisory = self.advisory.lock().await;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.refresh_locked().await;

		match &result {
			Ok(report) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				tracing::info!(
					refreshed = report.refreshed,
					restricted = report.restricted,
					skipped = report.skipped,
					"roster sweep completed",
				);
			},
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				tracing::error!(error = %e, "roster sweep failed");
			},
		}

		result
	}

	async fn refresh_locked(&self) -> Result<SweepReport> {
		let token = self.exchanger.client_credentials().await?;
		let rows = self.roster.snapshot().await?;
		let mut report = SweepReport::default();
		let mut updates = Vec::with_capacity(rows.len());

		for (index, row) in rows.iter().enumerate() {
			match self.profiles.fetch_user(&token, row.identity_id).await {
				Ok(profile) => {
					updates.push((index, ProfileColumns::from(&profile)));
					report.refreshed += 1;
				},
				Err(ProfileError::Restricted) => {
					updates.push((index, restricted_columns(row)));
					report.restricted += 1;
				},
				Err(e) => {
					tracing::warn!(
						identity_id = row.identity_id,
						error = %e,
						"skipping row during sweep",
					);
					report.skipped += 1;
				},
			}
		}

		self.roster.replace_profile_rows(updates).await?;

		Ok(report)
	}
}
impl Debug for RosterSweep {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RosterSweep(..)")
	}
}

fn restricted_columns(row: &crate::roster::RegistrantRecord) -> ProfileColumns {
	let username = if row.username.ends_with(RESTRICTED_TAG) {
		row.username.clone()
	} else {
		format!("{}{RESTRICTED_TAG}", row.username)
	};

	ProfileColumns {
		username,
		rank: row.rank,
		performance_points: row.performance_points,
		play_count: row.play_count,
		joined_at: row.joined_at,
		badge_count: row.badge_count,
		avatar_url: row.avatar_url.clone(),
		country_code: row.country_code.clone(),
	}
}
