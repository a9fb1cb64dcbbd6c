//! The last-result slot (`$_`)
//!
//! Each successful run publishes its value here as well as to `globalThis.$_`
//! inside the runtime. Last write wins.

use crate::value::CellValue;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

static GLOBAL_SLOT: Lazy<Arc<ResultSlot>> = Lazy::new(|| Arc::new(ResultSlot::default()));

#[derive(Debug, Default)]
pub struct ResultSlot {
    value: Mutex<Option<CellValue>>,
}

impl ResultSlot {
    /// The process-wide slot, created on first use.
    pub fn global() -> Arc<ResultSlot> {
        Arc::clone(&GLOBAL_SLOT)
    }

    pub fn publish(&self, value: CellValue) {
        if let Ok(mut slot) = self.value.lock() {
            *slot = Some(value);
        }
    }

    /// The last published value, `None` before the first successful run.
    pub fn get(&self) -> Option<CellValue> {
        self.value.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn reset(&self) {
        if let Ok(mut slot) = self.value.lock() {
            *slot = None;
        }
    }
}
