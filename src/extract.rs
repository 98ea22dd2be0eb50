use serde_json::{Map, Value};

use crate::{
    model::{self, EquityRecords, LoaderError, TableRows},
    normalize,
    store::schema::{self, TableSpec},
};

/// The scraper writes the board meeting subtree under a misspelled key.
const BOARD_MEETING_KEYS: [&str; 2] = ["board_meeting", "borad_meeting"];

/// Decomposes one equity snapshot into the ten record sets, keyed by its symbol.
pub fn extract_equity_records(document: &Value) -> model::Result<EquityRecords> {
    let equity_details = section(document, "equityDetails")?;
    let trade_info = section(document, "tradeInfo")?;
    let corporate_info = section(document, "corporateInfo")?;

    let info = section(equity_details, "info")?;
    let symbol = info
        .get("symbol")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("equityDetails.info.symbol is missing"))?
        .to_string();

    let metadata = equity_details.get("metadata");
    if let Some(metadata) = metadata {
        check_symbol(metadata, &symbol);
    }

    let tables = vec![
        single(&schema::EQUITY_INFO, Some(info))?,
        single(&schema::EQUITY_METADATA, metadata)?,
        single(&schema::EQUITY_PRICE_INFO, equity_details.get("priceInfo"))?,
        single(&schema::EQUITY_INDUSTRY_INFO, equity_details.get("industryInfo"))?,
        single(&schema::TRADE_INFO, Some(trade_info))?,
        single(&schema::SECURITY_WISE_DP, trade_info.get("securityWiseDP"))?,
        list(
            &schema::CORPORATE_ACTIONS,
            corporate_data(corporate_info, &["corporate_actions"]),
            &symbol,
        )?,
        shareholdings(corporate_data(corporate_info, &["shareholdings_patterns"]))?,
        list(
            &schema::FINANCIAL_RESULTS,
            corporate_data(corporate_info, &["financial_results"]),
            &symbol,
        )?,
        list(
            &schema::BOARD_MEETING,
            corporate_data(corporate_info, &BOARD_MEETING_KEYS),
            &symbol,
        )?,
    ];

    Ok(EquityRecords { symbol, tables })
}

fn section<'a>(node: &'a Value, key: &str) -> model::Result<&'a Value> {
    node.get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| malformed(&format!("{} is missing", key)))
}

/// The `data` payload of a corporate subtree, trying each candidate key in turn.
fn corporate_data<'a>(corporate_info: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        normalize::lookup(corporate_info, &[*key, "data"]).filter(|data| !data.is_null())
    })
}

/// Nested `symbol` fields are trusted only as far as a warning: the document symbol always wins.
fn check_symbol(node: &Value, symbol: &str) {
    if let Some(nested) = node.get("symbol").and_then(Value::as_str) {
        if nested.trim() != symbol {
            log::warn!(
                "Nested symbol {} does not match document symbol {}, keeping {}",
                nested,
                symbol,
                symbol
            );
        }
    }
}

/// Zero or one row: an absent subtree writes nothing.
fn single(table: &'static TableSpec, node: Option<&Value>) -> model::Result<TableRows> {
    let rows = match node {
        Some(node) if node.is_object() => vec![normalize::evaluate_row(node, table.columns)?],
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(malformed(&format!("{} is not an object", table.name))),
    };
    Ok(TableRows { table, rows })
}

fn list(table: &'static TableSpec, data: Option<&Value>, symbol: &str) -> model::Result<TableRows> {
    let Some(data) = data else {
        return Ok(TableRows { table, rows: Vec::new() });
    };
    let items = data
        .as_array()
        .ok_or_else(|| malformed(&format!("{} data is not a list", table.name)))?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            return Err(malformed(&format!("{} entry is not an object", table.name)));
        }
        check_symbol(item, symbol);
        rows.push(normalize::evaluate_row(item, table.columns)?);
    }
    Ok(TableRows { table, rows })
}

/// Pivots `{date: [{category: "x %"}, ...]}` into one row per reporting date.
fn shareholdings(data: Option<&Value>) -> model::Result<TableRows> {
    let table = &schema::SHAREHOLDINGS_PATTERNS;
    let Some(data) = data else {
        return Ok(TableRows { table, rows: Vec::new() });
    };
    let by_date = data
        .as_object()
        .ok_or_else(|| malformed("shareholdings_patterns data is not an object"))?;

    let mut rows = Vec::with_capacity(by_date.len());
    for (date, patterns) in by_date {
        let patterns = patterns
            .as_array()
            .ok_or_else(|| malformed(&format!("shareholdings for {} is not a list", date)))?;

        let mut flat = Map::new();
        for (category, percentage) in patterns.iter().filter_map(Value::as_object).flatten() {
            flat.insert(category.trim().to_string(), percentage.clone());
        }
        // set last so a holder category literally named "date" cannot shadow it
        flat.insert("date".to_string(), Value::String(date.clone()));

        rows.push(normalize::evaluate_row(&Value::Object(flat), table.columns)?);
    }
    Ok(TableRows { table, rows })
}

fn malformed(reason: &str) -> LoaderError {
    LoaderError::MalformedDocument(reason.to_string())
}
