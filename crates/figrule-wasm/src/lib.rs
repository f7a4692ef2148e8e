//! WASM bindings for the figrule engine.
//!
//! Exposes `normalize()` and `evaluate()` to JavaScript via wasm-bindgen.
//! Inputs are JSON strings; outputs are plain JS objects. Errors are thrown.

use std::collections::BTreeMap;

use figrule_engine::{EngineError, EvaluationResult, Evaluator};
use figrule_rules::{load_rules, Framework, RuleLoad};
use figrule_tree::{normalize_root, parse_document, NormalizeContext, NormalizeStats, NormalizedNode, RawNode};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NormalizeOutput<'a> {
    root: Option<NormalizedNode<'a>>,
    stats: NormalizeStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectedRule {
    index: usize,
    id: Option<String>,
    error: String,
}

struct EvaluateOutput {
    results: BTreeMap<String, EvaluationResult>,
    rejected: Vec<RejectedRule>,
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsError::new(&e.to_string()))
}

fn normalize_raw(raw: &RawNode) -> NormalizeOutput<'_> {
    let mut ctx = NormalizeContext::new();
    let root = normalize_root(raw, &mut ctx);
    NormalizeOutput {
        root,
        stats: ctx.stats(),
    }
}

fn run_evaluate(tree_json: &str, rules_json: &str, framework: &str) -> Result<EvaluateOutput, String> {
    let framework: Framework = framework
        .parse()
        .map_err(|e| EngineError::from(e).to_string())?;
    let raw = parse_document(tree_json).map_err(|e| e.to_string())?;
    let RuleLoad { rules, rejected } = load_rules(rules_json).map_err(|e| e.to_string())?;

    let rejected = rejected
        .into_iter()
        .map(|r| RejectedRule {
            index: r.index,
            id: r.id,
            error: r.error.to_string(),
        })
        .collect();

    let results = match figrule_tree::transform(&raw) {
        Some(root) => Evaluator::new(&rules, framework).evaluate_tree(&root),
        None => BTreeMap::new(),
    };

    Ok(EvaluateOutput { results, rejected })
}

/// Normalize a design document.
///
/// Returns `{ root, stats }`; `root` is `null` when the root node is hidden.
/// Throws a JS error if the document is not valid JSON.
#[wasm_bindgen]
pub fn normalize(tree_json: &str) -> Result<JsValue, JsError> {
    let raw = parse_document(tree_json).map_err(|e| JsError::new(&e.to_string()))?;
    to_js(&normalize_raw(&raw))
}

/// Evaluate a JSON array of rules against every node of a design document.
///
/// Returns `{ results, rejected }`: results keyed by node id, and the rules
/// that failed validation. Throws on invalid JSON or an unknown framework.
#[wasm_bindgen]
pub fn evaluate(tree_json: &str, rules_json: &str, framework: &str) -> Result<JsValue, JsError> {
    let output = run_evaluate(tree_json, rules_json, framework).map_err(|e| JsError::new(&e))?;

    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"results".into(), &to_js(&output.results)?)
        .map_err(|_| JsError::new("Failed to set results property"))?;
    js_sys::Reflect::set(&js_obj, &"rejected".into(), &to_js(&output.rejected)?)
        .map_err(|_| JsError::new("Failed to set rejected property"))?;

    Ok(js_obj.into())
}

/// Supported framework identifiers.
#[wasm_bindgen]
pub fn frameworks() -> js_sys::Array {
    Framework::ALL
        .iter()
        .map(|fw| JsValue::from_str(fw.as_str()))
        .collect()
}

/// Get the engine version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
