//! V8 executor for nasync cells
//!
//! Runs transpiled cells on a `deno_core` runtime and reports each run as a
//! [`ResultEnvelope`]. Cell `console` output is captured and can be drained
//! after a run; successful results are published to the last-result slot.
//!
//! The runtime is not `Send`, so the blocking helpers here keep one executor
//! per thread.

mod envelope;
mod executor;
mod ops;
mod settle;
mod slot;
mod value;

pub use envelope::ResultEnvelope;
pub use executor::Executor;
pub use ops::{ConsoleLevel, ConsoleLine};
pub use settle::SettleState;
pub use slot::ResultSlot;
pub use value::{CellValue, ThrownValue};

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use tokio::runtime::Runtime as TokioRuntime;

/// Global Tokio runtime driving the V8 event loop
static TOKIO_RUNTIME: OnceCell<TokioRuntime> = OnceCell::new();

thread_local! {
    /// Thread-local executor; JsRuntime is not Send
    static EXECUTOR: RefCell<Option<Executor>> = const { RefCell::new(None) };
}

/// Initialize the Tokio runtime for async operations
pub fn get_tokio_runtime() -> &'static TokioRuntime {
    TOKIO_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to create Tokio runtime")
    })
}

/// Run a closure with this thread's executor, creating it on first use.
pub fn with_executor<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&mut Executor) -> R,
{
    let _guard = get_tokio_runtime().enter();
    EXECUTOR.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(Executor::new()?);
        }
        let executor = slot
            .as_mut()
            .ok_or_else(|| anyhow!("executor was not initialized"))?;
        Ok(f(executor))
    })
}

/// Execute transpiled code on this thread's executor.
pub fn execute_blocking(code: &str) -> Result<ResultEnvelope> {
    with_executor(|executor| get_tokio_runtime().block_on(executor.execute(code)))
}

/// Drain console lines printed on this thread's executor.
pub fn take_console() -> Result<Vec<ConsoleLine>> {
    with_executor(|executor| executor.take_console())
}

/// Drop this thread's executor; the next run starts with fresh globals.
pub fn reset_executor() {
    EXECUTOR.with(|cell| cell.borrow_mut().take());
}
