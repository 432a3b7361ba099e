//! Thread-safe in-memory [`RosterStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	roster::{
		self, ChatColumns, ProfileColumns, RegistrantRecord, RosterError, RosterFuture,
		RosterStore,
	},
};

type Rows = Arc<RwLock<Vec<RegistrantRecord>>>;

/// In-process roster that keeps rows behind a [`RwLock`].
#[derive(Clone, Debug, Default)]
pub struct MemoryRoster(Rows);
impl MemoryRoster {
	/// Seeds the roster with existing rows; used by test fixtures.
	pub fn with_rows(rows: impl Into<Vec<RegistrantRecord>>) -> Self {
		Self(Arc::new(RwLock::new(rows.into())))
	}

	/// Returns a copy of the current rows without going through the trait.
	pub fn rows(&self) -> Vec<RegistrantRecord> {
		self.0.read().clone()
	}
}
impl RosterStore for MemoryRoster {
	fn exists(&self, identity_id: u64) -> RosterFuture<'_, bool> {
		let rows = self.0.clone();

		Box::pin(async move {
			Ok(rows.read().iter().any(|row| row.identity_id == identity_id))
		})
	}

	fn append(&self, record: RegistrantRecord) -> RosterFuture<'_, ()> {
		let rows = self.0.clone();

		Box::pin(async move {
			rows.write().push(record);

			Ok(())
		})
	}

	fn find_row(&self, identity_id: u64) -> RosterFuture<'_, Option<usize>> {
		let rows = self.0.clone();

		Box::pin(async move {
			Ok(rows.read().iter().position(|row| row.identity_id == identity_id))
		})
	}

	fn update_chat_columns(&self, index: usize, columns: ChatColumns) -> RosterFuture<'_, ()> {
		let rows = self.0.clone();

		Box::pin(async move {
			let mut guard = rows.write();
			let record =
				guard.get_mut(index).ok_or(RosterError::RowOutOfBounds { index })?;

			roster::apply_chat_columns(record, columns);

			Ok(())
		})
	}

	fn snapshot(&self) -> RosterFuture<'_, Vec<RegistrantRecord>> {
		let rows = self.0.clone();

		Box::pin(async move { Ok(rows.read().clone()) })
	}

	fn replace_profile_rows(
		&self,
		updates: Vec<(usize, ProfileColumns)>,
	) -> RosterFuture<'_, ()> {
		let rows = self.0.clone();

		Box::pin(async move {
			let mut guard = rows.write();

			for (index, columns) in updates {
				let record =
					guard.get_mut(index).ok_or(RosterError::RowOutOfBounds { index })?;

				roster::apply_profile_columns(record, columns);
			}

			Ok(())
		})
	}

	fn bulk_clear(&self) -> RosterFuture<'_, ()> {
		let rows = self.0.clone();

		Box::pin(async move {
			rows.write().clear();

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::test_record;

	#[tokio::test]
	async fn scan_append_and_targeted_update() {
		let roster = MemoryRoster::default();

		assert!(!roster.exists(42).await.expect("Existence scan should succeed."));

		roster.append(test_record(42, "foo")).await.expect("Append should succeed.");
		roster.append(test_record(7, "bar")).await.expect("Append should succeed.");

		assert!(roster.exists(42).await.expect("Existence scan should succeed."));
		assert_eq!(roster.find_row(7).await.expect("Scan should succeed."), Some(1));
		assert_eq!(roster.find_row(9).await.expect("Scan should succeed."), None);

		let columns =
			ChatColumns { tag: "bar#0001".into(), id: "111".into(), was_in_guild: Some(false) };

		roster.update_chat_columns(1, columns).await.expect("Chat update should succeed.");

		let rows = roster.rows();

		assert_eq!(rows[1].chat_tag.as_deref(), Some("bar#0001"));
		// The other row keeps its empty chat columns.
		assert_eq!(rows[0].chat_tag, None);
	}

	#[tokio::test]
	async fn out_of_bounds_update_is_an_error() {
		let roster = MemoryRoster::default();
		let columns =
			ChatColumns { tag: "foo#0001".into(), id: "1".into(), was_in_guild: None };
		let err = roster
			.update_chat_columns(3, columns)
			.await
			.expect_err("Out-of-bounds update should fail.");

		assert_eq!(err, RosterError::RowOutOfBounds { index: 3 });
	}

	#[tokio::test]
	async fn bulk_clear_removes_every_row() {
		let roster = MemoryRoster::with_rows(vec![test_record(1, "a"), test_record(2, "b")]);

		roster.bulk_clear().await.expect("Bulk clear should succeed.");

		assert!(roster.rows().is_empty());
	}
}
