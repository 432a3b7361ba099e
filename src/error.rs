//! Gateway-level error types shared across exchange, profile, guild, and
//! roster components.

// self
use crate::{
	_prelude::*,
	config::ConfigError,
	exchange::AuthError,
	guild::GuildError,
	profile::ProfileError,
	roster::RosterError,
	state::StateError,
};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Authorization-code or client-credentials exchange failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Identity API profile lookup failure.
	#[error(transparent)]
	Profile(#[from] ProfileError),
	/// Chat API membership or role operation failure.
	#[error(transparent)]
	Guild(#[from] GuildError),
	/// Roster backend failure.
	#[error(transparent)]
	Roster(#[from] RosterError),
	/// Correlation state token could not be verified.
	#[error(transparent)]
	State(#[from] StateError),
}
