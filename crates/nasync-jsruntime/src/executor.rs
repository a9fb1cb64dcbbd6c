//! Evaluation of transpiled cells
//!
//! A transpiled cell evaluates to a promise of its return record
//! `{cellReturnValue}` (or `undefined`). The executor drives the event loop
//! until that promise settles, then hands the record to a small JS routine
//! installed at bootstrap that probes whether the returned value has
//! already settled: settled values are unwrapped, pending or rejected
//! promises are reported as promises without being awaited.

use crate::envelope::ResultEnvelope;
use crate::ops::{self, ConsoleCapture, ConsoleLine, CONSOLE_JS};
use crate::settle::{SettleState, PROBE_JS};
use crate::slot::ResultSlot;
use crate::value::{self, CellValue, ThrownValue};
use anyhow::{anyhow, Context, Result};
use deno_core::{v8, JsRuntime, PollEventLoopOptions, RuntimeOptions};
use std::sync::Arc;

const CELL_SCRIPT: &str = "[nasync cell]";
const BOOTSTRAP_SCRIPT: &str = "[nasync bootstrap]";

/// Unwraps a return record and publishes the result as `$_`.
///
/// Resolves to `[settleState, value]`; the array keeps a promise value from
/// being adopted by the async function.
const FINISH_JS: &str = r#"async (record) => {
    if (record === undefined) {
      globalThis.$_ = undefined;
      return ["fulfilled", undefined];
    }
    const value = record.cellReturnValue;
    const target = Object.prototype.hasOwnProperty.call(Object(record), "returnValue")
      ? record.returnValue
      : value;
    const state = await settleState(target);
    const result = state === "fulfilled" ? await value : value;
    globalThis.$_ = result;
    return [state, result];
  }"#;

/// Promises a cell leaves behind are the cell's business; a rejection
/// nobody handles must not abort the event loop of later runs.
const REJECTIONS_JS: &str = r#"
  if (typeof Deno.core.setUnhandledPromiseRejectionHandler === "function") {
    Deno.core.setUnhandledPromiseRejectionHandler(() => true);
  }
"#;

/// Browser-style timers on top of the core timer queue.
const TIMERS_JS: &str = r#"
  const timer = (repeat) => (callback, delay = 0, ...args) => {
    const task = typeof callback === "function" ? () => callback(...args) : () => {};
    const timeout = Math.max(0, Number(delay) || 0);
    return Deno.core.queueUserTimer(Deno.core.getTimerDepth() + 1, repeat, timeout, task);
  };
  const clear = (id) => {
    if (typeof id === "number") Deno.core.cancelTimer(id);
  };
  globalThis.setTimeout = timer(false);
  globalThis.setInterval = timer(true);
  globalThis.clearTimeout = clear;
  globalThis.clearInterval = clear;
"#;

fn bootstrap_source() -> String {
    format!(
        "((globalThis) => {{\n{}\n{}\n{}\n{}\n  const finish = {};\n  return finish;\n}})(globalThis)",
        CONSOLE_JS, TIMERS_JS, REJECTIONS_JS, PROBE_JS, FINISH_JS
    )
}

/// Runs transpiled cells on one V8 isolate.
///
/// `JsRuntime` is not `Send`; an executor stays on the thread that
/// created it.
pub struct Executor {
    runtime: JsRuntime,
    finish: v8::Global<v8::Function>,
    slot: Arc<ResultSlot>,
}

impl Executor {
    /// An executor publishing to the process-wide [`ResultSlot`].
    pub fn new() -> Result<Self> {
        Self::with_slot(ResultSlot::global())
    }

    pub fn with_slot(slot: Arc<ResultSlot>) -> Result<Self> {
        let mut runtime = JsRuntime::new(RuntimeOptions {
            extensions: vec![ops::nasync_console::init_ops()],
            ..Default::default()
        });

        let bootstrap = runtime
            .execute_script(BOOTSTRAP_SCRIPT, bootstrap_source())
            .context("failed to install the cell bootstrap")?;

        let finish = {
            let scope = &mut runtime.handle_scope();
            let local = v8::Local::new(scope, bootstrap);
            let function = v8::Local::<v8::Function>::try_from(local)
                .map_err(|_| anyhow!("cell bootstrap did not evaluate to a function"))?;
            v8::Global::new(scope, function)
        };

        log::debug!("V8 executor ready");
        Ok(Self {
            runtime,
            finish,
            slot,
        })
    }

    pub fn slot(&self) -> &Arc<ResultSlot> {
        &self.slot
    }

    /// Execute transpiled code and report its outcome. Never fails: every
    /// error ends up in the envelope.
    pub async fn execute(&mut self, code: &str) -> ResultEnvelope {
        match self.evaluate(code).await {
            Ok(value) => {
                self.slot.publish(value.clone());
                ResultEnvelope::ok(code, value)
            }
            Err(thrown) => {
                log::warn!("cell failed: {}", thrown);
                ResultEnvelope::failed(code, thrown)
            }
        }
    }

    /// Console lines printed since the last call.
    pub fn take_console(&mut self) -> Vec<ConsoleLine> {
        let state = self.runtime.op_state();
        let mut state = state.borrow_mut();
        state.borrow_mut::<ConsoleCapture>().take()
    }

    async fn evaluate(&mut self, code: &str) -> Result<CellValue, ThrownValue> {
        let completion = self
            .runtime
            .execute_script(CELL_SCRIPT, code.to_string())
            .map_err(ThrownValue::from_runtime_error)?;
        let record = self.settle(completion).await?;

        let pending = {
            let scope = &mut self.runtime.handle_scope();
            let finish = v8::Local::new(scope, &self.finish);
            let record = v8::Local::new(scope, record);
            let receiver = v8::undefined(scope).into();
            let pending = finish
                .call(scope, receiver, &[record])
                .ok_or_else(|| ThrownValue::opaque("the cell result could not be inspected"))?;
            v8::Global::new(scope, pending)
        };
        let outcome = self.settle(pending).await?;

        let scope = &mut self.runtime.handle_scope();
        let outcome = v8::Local::new(scope, outcome);
        let pair = v8::Local::<v8::Array>::try_from(outcome)
            .map_err(|_| ThrownValue::opaque("malformed cell result"))?;

        let state = pair
            .get_index(scope, 0)
            .map(|state| state.to_rust_string_lossy(scope))
            .and_then(|state| state.parse::<SettleState>().ok());
        let value = pair
            .get_index(scope, 1)
            .map(|value| value::snapshot(scope, value))
            .unwrap_or(CellValue::Undefined);

        log::debug!(
            "cell result {} when probed",
            state.map_or("unknown", |state| state.as_str())
        );
        Ok(value)
    }

    /// Drive the event loop until `value` settles, if it is a promise.
    async fn settle(
        &mut self,
        value: v8::Global<v8::Value>,
    ) -> Result<v8::Global<v8::Value>, ThrownValue> {
        let resolve = self.runtime.resolve(value);
        self.runtime
            .with_event_loop_promise(Box::pin(resolve), PollEventLoopOptions::default())
            .await
            .map_err(ThrownValue::from_runtime_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ConsoleLevel;

    fn executor() -> Executor {
        Executor::with_slot(Arc::new(ResultSlot::default())).unwrap()
    }

    fn cell(body: &str) -> String {
        format!("(async () => {{{}\n}})()", body)
    }

    #[tokio::test]
    async fn test_literal_result() {
        let mut executor = executor();
        let envelope = executor.execute(&cell("return {cellReturnValue: 42}")).await;

        assert!(!envelope.error);
        assert_eq!(envelope.value, CellValue::Number(42.0));
        assert_eq!(envelope.source_code, cell("return {cellReturnValue: 42}"));
        assert_eq!(executor.slot().get(), Some(CellValue::Number(42.0)));
    }

    #[tokio::test]
    async fn test_no_result_is_undefined() {
        let mut executor = executor();
        let envelope = executor.execute(&cell("42;")).await;

        assert!(!envelope.error);
        assert_eq!(envelope.value, CellValue::Undefined);
        assert_eq!(executor.slot().get(), Some(CellValue::Undefined));
    }

    #[tokio::test]
    async fn test_thrown_error() {
        let mut executor = executor();
        let envelope = executor.execute(&cell("throw new TypeError('boom')")).await;

        assert!(envelope.error);
        match envelope.thrown() {
            Some(ThrownValue::Structured { name, message, .. }) => {
                assert_eq!(name, "TypeError");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected thrown value: {:?}", other),
        }
        assert_eq!(executor.slot().get(), None);
    }

    #[tokio::test]
    async fn test_thrown_primitive() {
        let mut executor = executor();
        let envelope = executor.execute(&cell("throw 5")).await;

        assert!(envelope.error);
        assert_eq!(envelope.thrown(), Some(&ThrownValue::opaque("5")));
    }

    #[tokio::test]
    async fn test_syntax_error_is_captured() {
        let mut executor = executor();
        let envelope = executor.execute("(async () => {").await;

        assert!(envelope.error);
        assert!(matches!(
            envelope.thrown(),
            Some(ThrownValue::Structured { name, .. }) if name == "SyntaxError"
        ));
    }

    #[tokio::test]
    async fn test_unawaited_pending_promise() {
        let mut executor = executor();
        let envelope = executor
            .execute(&cell("return {cellReturnValue: new Promise(() => {})}"))
            .await;

        assert!(!envelope.error);
        assert_eq!(envelope.value, CellValue::Promise(SettleState::Pending));
    }

    #[tokio::test]
    async fn test_unawaited_rejected_promise() {
        let mut executor = executor();
        let envelope = executor
            .execute(&cell("return {cellReturnValue: Promise.reject(new Error('later'))}"))
            .await;

        assert!(!envelope.error);
        assert_eq!(envelope.value, CellValue::Promise(SettleState::Rejected));
    }

    #[tokio::test]
    async fn test_settled_promise_is_unwrapped() {
        let mut executor = executor();
        let awaited = executor
            .execute(&cell("return {cellReturnValue: await Promise.resolve(7)}"))
            .await;
        let unawaited = executor
            .execute(&cell("return {cellReturnValue: Promise.resolve(3)}"))
            .await;

        assert_eq!(awaited.value, CellValue::Number(7.0));
        assert_eq!(unawaited.value, CellValue::Number(3.0));
    }

    #[tokio::test]
    async fn test_awaited_timer_resolves() {
        let code = nasync_transform::transform(
            "await new Promise(r => setTimeout(() => r('later'), 5))",
        )
        .unwrap();
        let mut executor = executor();
        let envelope = executor.execute(&code).await;

        assert!(!envelope.error, "{:?}", envelope.value);
        assert_eq!(envelope.value, CellValue::String("later".into()));
    }

    #[tokio::test]
    async fn test_unfired_timer_promise_is_pending() {
        let code = nasync_transform::transform(
            "class Holder { p = new Promise(r => setTimeout(r, 60000)) }\nnew Holder().p",
        )
        .unwrap();
        let mut executor = executor();
        let envelope = executor.execute(&code).await;

        assert!(!envelope.error, "{:?}", envelope.value);
        assert_eq!(envelope.value, CellValue::Promise(SettleState::Pending));
    }

    #[tokio::test]
    async fn test_cleared_timer_never_fires() {
        let code = nasync_transform::transform(
            "let fired = false\nconst id = setTimeout(() => { fired = true }, 1)\nclearTimeout(id)\nawait new Promise(r => setTimeout(r, 10))\nfired",
        )
        .unwrap();
        let mut executor = executor();
        let envelope = executor.execute(&code).await;

        assert_eq!(envelope.value, CellValue::Bool(false));
    }

    #[tokio::test]
    async fn test_never_settling_cell_fails() {
        let mut executor = executor();
        let envelope = executor.execute("new Promise(() => {})").await;

        assert!(envelope.error);
        assert!(matches!(envelope.thrown(), Some(ThrownValue::Opaque { .. })));
    }

    #[tokio::test]
    async fn test_last_result_carries_over() {
        let mut executor = executor();
        executor.execute(&cell("return {cellReturnValue: 41}")).await;
        let envelope = executor.execute(&cell("return {cellReturnValue: $_ + 1}")).await;

        assert_eq!(envelope.value, CellValue::Number(42.0));
    }

    #[tokio::test]
    async fn test_plain_object_result() {
        let mut executor = executor();
        let envelope = executor
            .execute(&cell("return {cellReturnValue: {a: [1, 'two'], b: null}}"))
            .await;

        assert_eq!(
            envelope.value,
            CellValue::Json(serde_json::json!({"a": [1, "two"], "b": null}))
        );
    }

    #[tokio::test]
    async fn test_console_capture() {
        let mut executor = executor();
        executor
            .execute(&cell("console.log('hi', 1); console.warn({a: 1});"))
            .await;
        let lines = executor.take_console();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].level, ConsoleLevel::Log);
        assert_eq!(lines[0].text, "hi 1");
        assert_eq!(lines[1].level, ConsoleLevel::Warn);
        assert_eq!(lines[1].text, "{\"a\":1}");
        assert!(executor.take_console().is_empty());
    }

    #[tokio::test]
    async fn test_transpiled_cell_round_trip() {
        let source = "const x = Promise.resolve(2)\nx * 3";
        let once = nasync_transform::transform(source).unwrap();
        let twice = nasync_transform::transform(&once).unwrap();

        let mut executor = executor();
        let first = executor.execute(&once).await;
        let second = executor.execute(&twice).await;

        assert_eq!(first.value, CellValue::Number(6.0));
        assert_eq!(second.value, first.value);
    }

    #[tokio::test]
    async fn test_transpiled_functions_are_awaited() {
        let source = "function twice(v) { return v * 2 }\ntwice(21)";
        let code = nasync_transform::transform(source).unwrap();
        assert!(code.contains("async function twice"));

        let mut executor = executor();
        let envelope = executor.execute(&code).await;
        assert_eq!(envelope.value, CellValue::Number(42.0));

        // Declarations stay local to their cell
        let envelope = executor.execute(&nasync_transform::transform("twice").unwrap()).await;
        assert!(matches!(
            envelope.thrown(),
            Some(ThrownValue::Structured { name, .. }) if name == "ReferenceError"
        ));
    }
}
