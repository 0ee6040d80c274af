//! Per-key usage quotas with atomic selection and periodic reset.

pub mod rotation;

pub use rotation::*;

// std
use std::num::NonZeroU32;
// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, auth::SecretString, error::QuotaError};

/// Snapshot of one managed key's quota state.
#[derive(Clone, Debug)]
pub struct KeyRecord {
	/// Stable key identifier.
	pub identifier: String,
	/// Secret value handed to callers on selection.
	pub secret: SecretString,
	/// Maximum selections permitted before the key becomes unavailable.
	pub usage_limit: u32,
	/// Selections consumed since the last reset.
	pub usage_count: u32,
}
impl KeyRecord {
	/// Returns `true` while the key may still be selected.
	pub fn is_available(&self) -> bool {
		self.usage_count < self.usage_limit
	}
}

/// Strategy for choosing among available keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionStrategy {
	/// First available key in registration order.
	Sequential,
	/// Uniformly random choice among the currently available keys.
	Random,
}

/// Owns the key table behind one lock.
///
/// The availability check and the counter increment form a single critical section, shared
/// with [`reset_all`](Self::reset_all), so concurrent selections cannot overshoot a limit
/// and a reset landing mid-selection cannot corrupt a count. State is per-manager: two
/// independently configured managers never share counters.
#[derive(Clone, Debug, Default)]
pub struct KeyQuotaManager {
	table: Arc<Mutex<Vec<KeyRecord>>>,
}
impl KeyQuotaManager {
	/// Creates an empty manager.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a key. Re-registering an identifier replaces its secret and limit and
	/// zeroes its count; registration order is selection order for the sequential strategy.
	pub fn register(
		&self,
		identifier: impl Into<String>,
		secret: impl Into<SecretString>,
		usage_limit: NonZeroU32,
	) {
		let record = KeyRecord {
			identifier: identifier.into(),
			secret: secret.into(),
			usage_limit: usage_limit.get(),
			usage_count: 0,
		};
		let mut table = self.table.lock();

		match table.iter_mut().find(|slot| slot.identifier == record.identifier) {
			Some(slot) => *slot = record,
			None => table.push(record),
		}
	}

	/// Selects an available key under `strategy`, consuming one use.
	pub fn next_key(&self, strategy: SelectionStrategy) -> Result<SecretString, QuotaError> {
		let mut table = self.table.lock();
		let available = table
			.iter()
			.enumerate()
			.filter(|(_, slot)| slot.is_available())
			.map(|(index, _)| index)
			.collect::<Vec<_>>();
		let chosen = match strategy {
			SelectionStrategy::Sequential => available.first().copied(),
			SelectionStrategy::Random =>
				if available.is_empty() {
					None
				} else {
					Some(available[rand::rng().random_range(0..available.len())])
				},
		}
		.ok_or(QuotaError::Exhausted)?;
		let slot = &mut table[chosen];

		slot.usage_count += 1;

		Ok(slot.secret.clone())
	}

	/// Sets every key's usage count back to zero.
	pub fn reset_all(&self) {
		for slot in self.table.lock().iter_mut() {
			slot.usage_count = 0;
		}
	}

	/// Returns a point-in-time copy of the key table.
	pub fn usage_snapshot(&self) -> Vec<KeyRecord> {
		self.table.lock().clone()
	}

	/// Starts the periodic reset task; the returned handle owns the thread and stops the
	/// loop deterministically on [`stop`](RotationHandle::stop) or drop.
	pub fn start_rotation(&self, interval: StdDuration) -> Result<RotationHandle> {
		Ok(RotationHandle::spawn(self.clone(), interval)?)
	}
}
