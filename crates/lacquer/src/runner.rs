//! Scoped execution of configuration blocks against a constructed receiver.
//!
//! A [`Block`] is a closure that receives the freshly constructed instance as
//! an explicit receiver. [`ScopedRunner::run`] binds that receiver for the
//! duration of the block and clears the binding on every exit path: normal
//! return, error return, and unwinding panic.
//!
//! # Concurrency
//!
//! Each definition owns one runner. Receiver bindings are kept per thread, so
//! runs on different threads proceed independently and no lock is held while
//! a block executes. A block that re-enters the same runner on its own thread
//! (for example by invoking the same mixin) stacks a new binding on top; the
//! outer binding is restored when the inner run ends.

use std::any::{Any, type_name};
use std::fmt;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::DslError;
use crate::target::Instance;

/// Caller-supplied configuration statements run against a receiver.
pub struct Block<'a> {
	body: Box<dyn FnOnce(&mut Instance) -> anyhow::Result<()> + 'a>,
}

impl<'a> Block<'a> {
	pub fn new(body: impl FnOnce(&mut Instance) -> anyhow::Result<()> + 'a) -> Self {
		Self {
			body: Box::new(body),
		}
	}

	/// Block whose receiver must be a `T`; any other receiver fails the block.
	pub fn typed<T: Any>(body: impl FnOnce(&mut T) -> anyhow::Result<()> + 'a) -> Self {
		Self::new(move |receiver: &mut Instance| -> anyhow::Result<()> {
			let found = receiver.type_name();
			let receiver = receiver.downcast_mut::<T>().ok_or_else(|| {
				anyhow::anyhow!(
					"block expects a `{}` receiver, found `{found}`",
					type_name::<T>()
				)
			})?;
			body(receiver)
		})
	}

	fn call(self, receiver: &mut Instance) -> anyhow::Result<()> {
		(self.body)(receiver)
	}
}

impl fmt::Debug for Block<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Block").finish_non_exhaustive()
	}
}

/// Observable state of a [`ScopedRunner`] on one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
	Idle,
	Running {
		/// Type name of the innermost bound receiver.
		receiver: &'static str,
		/// Number of nested runs on this thread.
		depth: usize,
	},
}

type ReceiverStacks = FxHashMap<ThreadId, Vec<&'static str>>;

/// Binds a receiver for the duration of a block.
pub struct ScopedRunner {
	owner: String,
	/// Bound receivers per thread, innermost last. Locked only to push or pop.
	receivers: Mutex<ReceiverStacks>,
}

impl ScopedRunner {
	/// Creates an idle runner for the definition named `owner`.
	pub fn new(owner: impl Into<String>) -> Self {
		Self {
			owner: owner.into(),
			receivers: Mutex::new(FxHashMap::default()),
		}
	}

	pub fn owner(&self) -> &str {
		&self.owner
	}

	/// Runs `block` with `instance` as its receiver and returns the instance.
	///
	/// Whatever the block computes is discarded; only its effects on the
	/// receiver are kept.
	///
	/// # Errors
	///
	/// Returns [`DslError::Block`] when the block fails. The binding is
	/// cleared before the error is returned.
	pub fn run(&self, mut instance: Instance, block: Block<'_>) -> Result<Instance, DslError> {
		let binding = self.bind(instance.type_name());
		tracing::trace!(dsl = %self.owner, receiver = instance.type_name(), depth = binding.depth, "running block");

		let outcome = block.call(&mut instance);
		drop(binding);

		match outcome {
			Ok(()) => Ok(instance),
			Err(source) => {
				tracing::debug!(dsl = %self.owner, error = %source, "block failed");
				Err(DslError::Block {
					name: self.owner.clone(),
					source: source.into(),
				})
			}
		}
	}

	fn bind(&self, receiver: &'static str) -> ReceiverBinding<'_> {
		let thread = thread::current().id();
		let mut receivers = self.receivers.lock();
		let stack = receivers.entry(thread).or_default();
		stack.push(receiver);
		ReceiverBinding {
			receivers: &self.receivers,
			thread,
			depth: stack.len(),
		}
	}

	/// State of the calling thread's bindings.
	pub fn state(&self) -> RunnerState {
		let receivers = self.receivers.lock();
		match receivers.get(&thread::current().id()) {
			Some(stack) => match stack.last() {
				Some(&receiver) => RunnerState::Running {
					receiver,
					depth: stack.len(),
				},
				None => RunnerState::Idle,
			},
			None => RunnerState::Idle,
		}
	}

	/// True when no thread has a receiver bound.
	pub fn is_idle(&self) -> bool {
		self.receivers.lock().is_empty()
	}

	/// Number of threads currently running a block.
	pub fn active_threads(&self) -> usize {
		self.receivers.lock().len()
	}

	/// Type name of the receiver bound on the calling thread, if any.
	pub fn current_receiver(&self) -> Option<&'static str> {
		self.receivers
			.lock()
			.get(&thread::current().id())
			.and_then(|stack| stack.last().copied())
	}
}

impl fmt::Debug for ScopedRunner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopedRunner")
			.field("owner", &self.owner)
			.field("active_threads", &self.active_threads())
			.finish()
	}
}

/// Clears one receiver binding when dropped.
struct ReceiverBinding<'r> {
	receivers: &'r Mutex<ReceiverStacks>,
	thread: ThreadId,
	depth: usize,
}

impl Drop for ReceiverBinding<'_> {
	fn drop(&mut self) {
		let mut receivers = self.receivers.lock();
		let Some(stack) = receivers.get_mut(&self.thread) else {
			return;
		};
		debug_assert_eq!(stack.len(), self.depth, "receiver stack out of balance");
		stack.truncate(self.depth - 1);
		if stack.is_empty() {
			receivers.remove(&self.thread);
		}
	}
}
