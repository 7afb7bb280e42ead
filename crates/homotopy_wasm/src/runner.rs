//! Stepped homotopy tracing over user-defined equations.

use anyhow::Context;
use homotopy_core::continuation::{AutoHomotopyTrack, TraceRunner};
use homotopy_core::equation_engine::EquationHomotopy;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

use crate::{settings_from_value, to_js_error};

/// WASM-exported runner tracing H(x, λ) = 0 given as equation strings.
/// Runs batches of outer iterations so the caller can report progress.
#[wasm_bindgen]
pub struct WasmHomotopyRunner {
    runner: Option<TraceRunner<AutoHomotopyTrack<EquationHomotopy>>>,
}

#[wasm_bindgen]
impl WasmHomotopyRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        equations: Vec<String>,
        var_names: Vec<String>,
        param_name: &str,
        constant_names: Vec<String>,
        constant_values: Vec<f64>,
        initial_root: Vec<f64>,
        param_start: f64,
        param_end: f64,
        settings_val: JsValue,
    ) -> Result<WasmHomotopyRunner, JsValue> {
        console_error_panic_hook::set_once();

        if constant_names.len() != constant_values.len() {
            return Err(JsValue::from_str(&format!(
                "Constant names/values length mismatch: {} names, {} values",
                constant_names.len(),
                constant_values.len()
            )));
        }
        let constants: Vec<(String, f64)> = constant_names.into_iter().zip(constant_values).collect();

        let homotopy = EquationHomotopy::compile(&equations, &var_names, param_name, &constants)
            .context("Invalid homotopy")
            .map_err(to_js_error)?;
        let settings = settings_from_value(settings_val)?;

        let track = AutoHomotopyTrack::new(homotopy, Some(initial_root), (param_start, param_end))
            .map_err(|e| JsValue::from_str(&format!("Invalid initial root: {}", e)))?;
        let runner = TraceRunner::new(track, &settings)
            .map_err(|e| JsValue::from_str(&format!("Trace init failed: {}", e)))?;

        Ok(WasmHomotopyRunner {
            runner: Some(runner),
        })
    }

    pub fn is_done(&self) -> bool {
        self.runner.as_ref().map_or(true, |runner| runner.is_done())
    }

    /// Run a batch of outer iterations and return progress.
    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let progress = runner
            .run_steps(batch_size as usize)
            .map_err(|e| JsValue::from_str(&format!("Trace step failed: {}", e)))?;

        to_value(&progress).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        to_value(&runner.progress())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Consume the runner and return the traced arc.
    pub fn get_result(&mut self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .take()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let outcome = runner
            .take_result()
            .map_err(|e| JsValue::from_str(&format!("Trace failed: {}", e)))?;

        to_value(&outcome).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use homotopy_core::continuation::{TraceOutcome, TraceProgress, TraceSettings};
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen_test::wasm_bindgen_test;

    fn schmitt_runner(settings_val: JsValue) -> Result<WasmHomotopyRunner, JsValue> {
        WasmHomotopyRunner::new(
            vec!["tanh(k * (vo / 2 - vi)) - vo".to_string()],
            vec!["vo".to_string()],
            "vi",
            vec!["k".to_string()],
            vec![10.0],
            vec![1.0],
            -0.8,
            0.8,
            settings_val,
        )
    }

    #[wasm_bindgen_test]
    fn runner_traces_schmitt_trigger_equation() {
        let mut runner = schmitt_runner(JsValue::UNDEFINED).expect("runner");
        assert!(!runner.is_done());
        while !runner.is_done() {
            let progress: TraceProgress =
                from_value(runner.run_steps(50).expect("batch")).expect("progress");
            assert_eq!(progress.max_steps, 10_000);
        }
        let outcome: TraceOutcome = from_value(runner.get_result().expect("result")).expect("outcome");
        assert!(outcome.final_point.param >= 0.8);
        assert!((outcome.arc[0].param + 0.8).abs() < 1e-12);
        assert!(runner.get_result().is_err());
    }

    #[wasm_bindgen_test]
    fn runner_rejects_non_square_system() {
        let result = WasmHomotopyRunner::new(
            vec!["x - y".to_string()],
            vec!["x".to_string(), "y".to_string()],
            "t",
            Vec::new(),
            Vec::new(),
            vec![0.0, 0.0],
            0.0,
            1.0,
            JsValue::UNDEFINED,
        );
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Invalid homotopy"));
    }

    #[wasm_bindgen_test]
    fn runner_rejects_wrong_root_length() {
        let result = WasmHomotopyRunner::new(
            vec!["x - t".to_string()],
            vec!["x".to_string()],
            "t",
            Vec::new(),
            Vec::new(),
            vec![0.0, 1.0],
            0.0,
            1.0,
            JsValue::UNDEFINED,
        );
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Invalid initial root"));
    }

    #[wasm_bindgen_test]
    fn budget_failure_surfaces_as_error() {
        let settings = TraceSettings {
            tracer_max_iters: 3,
            ..TraceSettings::default()
        };
        let mut runner = schmitt_runner(to_value(&settings).expect("settings")).expect("runner");
        let message = runner
            .run_steps(10)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Trace step failed"));
        assert!(runner.is_done());
    }
}
