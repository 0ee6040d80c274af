//! Owned, cancellable periodic reset task for the key quota manager.

// std
use std::{
	sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
	thread::{self, JoinHandle},
};
// self
use crate::{_prelude::*, error::ConfigError, keys::KeyQuotaManager};

/// Handle owning the periodic reset thread.
///
/// The loop wakes every interval and zeroes all usage counters through the manager's lock.
/// [`stop`](Self::stop) (or dropping the handle) signals the loop and joins the thread, so
/// shutdown is deterministic and no detached thread outlives the manager's lifecycle.
pub struct RotationHandle {
	stop_tx: Sender<()>,
	thread: Option<JoinHandle<()>>,
}
impl RotationHandle {
	pub(crate) fn spawn(
		manager: KeyQuotaManager,
		interval: StdDuration,
	) -> Result<Self, ConfigError> {
		let (stop_tx, stop_rx) = mpsc::channel();
		let thread = thread::Builder::new()
			.name("courier-key-rotation".into())
			.spawn(move || run(manager, interval, stop_rx))?;

		Ok(Self { stop_tx, thread: Some(thread) })
	}

	/// Stops the reset loop and waits for the thread to exit.
	pub fn stop(mut self) {
		self.shutdown();
	}

	fn shutdown(&mut self) {
		let _ = self.stop_tx.send(());

		if let Some(thread) = self.thread.take() {
			let _ = thread.join();
		}
	}
}
impl Drop for RotationHandle {
	fn drop(&mut self) {
		self.shutdown();
	}
}
impl Debug for RotationHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RotationHandle")
			.field("running", &self.thread.is_some())
			.finish()
	}
}

fn run(manager: KeyQuotaManager, interval: StdDuration, stop_rx: Receiver<()>) {
	loop {
		match stop_rx.recv_timeout(interval) {
			Err(RecvTimeoutError::Timeout) => {
				tracing::debug!("resetting key usage counters");
				manager.reset_all();
			},
			Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
		}
	}
}
