//! Roster storage contract and built-in tabular-store adapters.
//!
//! The roster is one header-conceptual table with a row per registrant, keyed
//! by identity-provider user ID. Lookups are linear scans, acceptable at the
//! expected roster sizes of low thousands, and deliberately isolated behind
//! this trait so the backing store can be swapped without touching the
//! orchestration logic.

pub mod file;
pub mod memory;

pub use file::FileRoster;
pub use memory::MemoryRoster;

// self
use crate::{_prelude::*, profile::Profile};

/// Boxed future returned by [`RosterStore`] operations.
pub type RosterFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RosterError>> + 'a + Send>>;

/// Errors raised by roster store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RosterError {
	/// Backend-level failure of the storage engine.
	#[error("Roster backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// Serialization failure surfaced by the backend.
	#[error("Roster serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// A targeted update addressed a row index past the data region.
	#[error("Roster row {index} is out of bounds.")]
	RowOutOfBounds {
		/// Offending row index.
		index: usize,
	},
	/// The chat leg carried an identity ID with no matching roster row.
	#[error("No roster row for identity ID {identity_id}.")]
	MissingRegistrant {
		/// Identity-provider user ID that failed to resolve.
		identity_id: u64,
	},
}

/// One roster row.
///
/// Leg A populates everything up to `country_code`; leg B fills the trailing
/// chat columns in place. Rows are never deleted outside [`RosterStore::bulk_clear`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrantRecord {
	/// Instant the registration row was appended.
	#[serde(with = "time::serde::rfc3339")]
	pub registered_at: OffsetDateTime,
	/// Identity-provider user ID; unique across all rows.
	pub identity_id: u64,
	/// Username at registration (or last sweep refresh).
	pub username: String,
	/// Performance rank, if ranked.
	pub rank: Option<u64>,
	/// Performance points, if ranked.
	pub performance_points: Option<f64>,
	/// Lifetime play count.
	pub play_count: u64,
	/// Account creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub joined_at: OffsetDateTime,
	/// Filtered tournament badge count.
	pub badge_count: u32,
	/// Avatar image URL.
	pub avatar_url: String,
	/// ISO country code.
	pub country_code: String,
	/// Chat tag, populated by leg B.
	pub chat_tag: Option<String>,
	/// Chat-provider user ID, populated by leg B.
	pub chat_id: Option<String>,
	/// Whether the registrant was already a guild member, populated by leg B
	/// when the membership probe was conclusive.
	pub was_in_guild: Option<bool>,
}
impl RegistrantRecord {
	/// Builds a fresh leg-A row (chat columns empty) from a fetched profile.
	pub fn from_profile(profile: &Profile, registered_at: OffsetDateTime) -> Self {
		Self {
			registered_at,
			identity_id: profile.identity_id,
			username: profile.username.clone(),
			rank: profile.rank,
			performance_points: profile.performance_points,
			play_count: profile.play_count,
			joined_at: profile.joined_at,
			badge_count: profile.badge_count,
			avatar_url: profile.avatar_url.clone(),
			country_code: profile.country_code.clone(),
			chat_tag: None,
			chat_id: None,
			was_in_guild: None,
		}
	}
}

/// Chat-column block written in place by the chat leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatColumns {
	/// Chat tag (`username#discriminator`).
	pub tag: String,
	/// Chat-provider user ID.
	pub id: String,
	/// Whether the registrant was already a guild member, when determinable.
	pub was_in_guild: Option<bool>,
}

/// Profile-column block rewritten by the refresh sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileColumns {
	/// Refreshed username.
	pub username: String,
	/// Refreshed rank.
	pub rank: Option<u64>,
	/// Refreshed performance points.
	pub performance_points: Option<f64>,
	/// Refreshed play count.
	pub play_count: u64,
	/// Refreshed account creation instant.
	pub joined_at: OffsetDateTime,
	/// Refreshed badge count.
	pub badge_count: u32,
	/// Refreshed avatar URL.
	pub avatar_url: String,
	/// Refreshed country code.
	pub country_code: String,
}
impl From<&Profile> for ProfileColumns {
	fn from(profile: &Profile) -> Self {
		Self {
			username: profile.username.clone(),
			rank: profile.rank,
			performance_points: profile.performance_points,
			play_count: profile.play_count,
			joined_at: profile.joined_at,
			badge_count: profile.badge_count,
			avatar_url: profile.avatar_url.clone(),
			country_code: profile.country_code.clone(),
		}
	}
}

/// Storage contract over the external tabular store.
pub trait RosterStore
where
	Self: Send + Sync,
{
	/// Checks whether a row with the identity ID exists (linear scan).
	fn exists(&self, identity_id: u64) -> RosterFuture<'_, bool>;

	/// Appends a row after the last populated row.
	fn append(&self, record: RegistrantRecord) -> RosterFuture<'_, ()>;

	/// Locates the row holding the identity ID (linear scan).
	fn find_row(&self, identity_id: u64) -> RosterFuture<'_, Option<usize>>;

	/// Writes the chat-column block at a row without disturbing other columns.
	fn update_chat_columns(&self, index: usize, columns: ChatColumns) -> RosterFuture<'_, ()>;

	/// Reads the whole data region in one batch.
	fn snapshot(&self) -> RosterFuture<'_, Vec<RegistrantRecord>>;

	/// Writes refreshed profile-column blocks back in one batch, leaving the
	/// chat columns untouched.
	fn replace_profile_rows(
		&self,
		rows: Vec<(usize, ProfileColumns)>,
	) -> RosterFuture<'_, ()>;

	/// Removes every row below the header. Administrative use only; the
	/// calling surface is expected to confirm before invoking this.
	fn bulk_clear(&self) -> RosterFuture<'_, ()>;
}

pub(crate) fn apply_profile_columns(record: &mut RegistrantRecord, columns: ProfileColumns) {
	record.username = columns.username;
	record.rank = columns.rank;
	record.performance_points = columns.performance_points;
	record.play_count = columns.play_count;
	record.joined_at = columns.joined_at;
	record.badge_count = columns.badge_count;
	record.avatar_url = columns.avatar_url;
	record.country_code = columns.country_code;
}

pub(crate) fn apply_chat_columns(record: &mut RegistrantRecord, columns: ChatColumns) {
	record.chat_tag = Some(columns.tag);
	record.chat_id = Some(columns.id);
	record.was_in_guild = columns.was_in_guild;
}
