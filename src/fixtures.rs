use std::path::Path;

use serde_json::{Value, json};

pub const EQUITY_SAMPLE: &str = include_str!("../testdata/equity_sample.json");

pub fn equity_document() -> Value {
    serde_json::from_str(EQUITY_SAMPLE).unwrap()
}

/// The sample document re-keyed to `symbol`, nested symbols included.
pub fn equity_document_for(symbol: &str) -> Value {
    let mut document = equity_document();
    document["equityDetails"]["info"]["symbol"] = json!(symbol);
    document["equityDetails"]["metadata"]["symbol"] = json!(symbol);
    for key in ["corporate_actions", "borad_meeting"] {
        if let Some(items) = document["corporateInfo"][key]["data"].as_array_mut() {
            for item in items {
                item["symbol"] = json!(symbol);
            }
        }
    }
    document
}

pub fn write_document(dir: &Path, filename: &str, document: &Value) {
    std::fs::write(dir.join(filename), serde_json::to_vec_pretty(document).unwrap()).unwrap();
}
