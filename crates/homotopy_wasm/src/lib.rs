//! WASM bindings for `homotopy_core`.

use homotopy_core::continuation::{SchmittTriggerTrack, TraceRunner, TraceSettings};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

mod runner;

pub use runner::WasmHomotopyRunner;

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

/// Parses trace settings, falling back to the defaults when none are given.
fn settings_from_value(settings_val: JsValue) -> Result<TraceSettings, JsValue> {
    if settings_val.is_undefined() || settings_val.is_null() {
        return Ok(TraceSettings::default());
    }
    from_value(settings_val)
        .map_err(|e| JsValue::from_str(&format!("Invalid trace settings: {}", e)))
}

/// Traces the Schmitt trigger transfer curve for gain `k` in one call.
#[wasm_bindgen]
pub fn trace_schmitt_trigger(k: f64, settings_val: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let settings = settings_from_value(settings_val)?;
    let mut runner = TraceRunner::new(SchmittTriggerTrack::new(k), &settings)
        .map_err(|e| JsValue::from_str(&format!("Trace init failed: {}", e)))?;
    while !runner.is_done() {
        runner
            .run_steps(settings.tracer_max_iters)
            .map_err(|e| JsValue::from_str(&format!("Trace failed: {}", e)))?;
    }
    let outcome = runner
        .take_result()
        .map_err(|e| JsValue::from_str(&format!("Trace failed: {}", e)))?;

    to_value(&outcome).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::WasmHomotopyRunner;

    #[test]
    fn runner_reexport_is_wired() {
        assert!(std::any::type_name::<WasmHomotopyRunner>().ends_with("WasmHomotopyRunner"));
    }
}
