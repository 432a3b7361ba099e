//! File-backed [`RosterStore`] for lightweight single-host deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	roster::{
		self, ChatColumns, ProfileColumns, RegistrantRecord, RosterError, RosterFuture,
		RosterStore,
	},
};

/// Persists the roster to a JSON snapshot after each mutation.
#[derive(Clone, Debug)]
pub struct FileRoster {
	path: PathBuf,
	inner: Arc<RwLock<Vec<RegistrantRecord>>>,
}
impl FileRoster {
	/// Opens (or creates) a roster at the provided path, eagerly loading
	/// existing rows.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, RosterError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let rows = if path.exists() { Self::load_snapshot(&path)? } else { Vec::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(rows)) })
	}

	fn load_snapshot(path: &Path) -> Result<Vec<RegistrantRecord>, RosterError> {
		let metadata = path.metadata().map_err(|e| RosterError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Vec::new());
		}

		let bytes = fs::read(path).map_err(|e| RosterError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| RosterError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), RosterError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| RosterError::Backend {
				message: format!("Failed to create roster directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, rows: &[RegistrantRecord]) -> Result<(), RosterError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(rows).map_err(|e| RosterError::Serialization {
				message: format!("Failed to serialize roster snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| RosterError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| RosterError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| RosterError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| RosterError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl RosterStore for FileRoster {
	fn exists(&self, identity_id: u64) -> RosterFuture<'_, bool> {
		Box::pin(async move {
			Ok(self.inner.read().iter().any(|row| row.identity_id == identity_id))
		})
	}

	fn append(&self, record: RegistrantRecord) -> RosterFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.push(record);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn find_row(&self, identity_id: u64) -> RosterFuture<'_, Option<usize>> {
		Box::pin(async move {
			Ok(self.inner.read().iter().position(|row| row.identity_id == identity_id))
		})
	}

	fn update_chat_columns(&self, index: usize, columns: ChatColumns) -> RosterFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let record =
				guard.get_mut(index).ok_or(RosterError::RowOutOfBounds { index })?;

			roster::apply_chat_columns(record, columns);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn snapshot(&self) -> RosterFuture<'_, Vec<RegistrantRecord>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn replace_profile_rows(
		&self,
		updates: Vec<(usize, ProfileColumns)>,
	) -> RosterFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			for (index, columns) in updates {
				let record =
					guard.get_mut(index).ok_or(RosterError::RowOutOfBounds { index })?;

				roster::apply_profile_columns(record, columns);
			}

			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn bulk_clear(&self) -> RosterFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.clear();
			self.persist_locked(&guard)?;

			Ok(())
		})
	}
}
