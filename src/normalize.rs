use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::model::{self, LoaderError, Row};

/// Placeholders the feed uses for "not available".
pub const SENTINELS: [&str; 2] = ["NA", "-"];

/// Decoration the feed appends to end-of-day dates.
const EOD_SUFFIX: &str = " EOD";
const DATE_FORMAT: &str = "%d-%b-%Y";
const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// Destination type of a column, which decides how its raw JSON value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
    BigInt,
    /// A number optionally followed by `%`.
    Percent,
    Date,
    Timestamp,
    Boolean,
    /// A list of objects, stored as a JSON array of their `name` fields.
    NameList,
}

impl FieldKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "VARCHAR(255)",
            FieldKind::Numeric | FieldKind::Percent => "NUMERIC",
            FieldKind::BigInt => "BIGINT",
            FieldKind::Date => "DATE",
            FieldKind::Timestamp => "TIMESTAMP",
            FieldKind::Boolean => "BOOLEAN",
            FieldKind::NameList => "TEXT",
        }
    }
}

/// One entry of the coercion table: where a column's value lives and what it becomes.
#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub path: &'static [&'static str],
    pub kind: FieldKind,
    /// Required columns fail the whole document instead of degrading to null.
    pub required: bool,
}

impl Column {
    pub const fn new(name: &'static str, path: &'static [&'static str], kind: FieldKind) -> Self {
        Self {
            name,
            path,
            kind,
            required: false,
        }
    }

    pub const fn required(
        name: &'static str,
        path: &'static [&'static str],
        kind: FieldKind,
    ) -> Self {
        Self {
            name,
            path,
            kind,
            required: true,
        }
    }
}

/// Walks `path` from `node`, returning `None` as soon as a key is missing.
pub fn lookup<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(node, |current, key| current.get(*key))
}

/// Evaluates every column against `node` and returns the row in column order.
pub fn evaluate_row(node: &Value, columns: &[Column]) -> model::Result<Row> {
    columns
        .iter()
        .map(|column| coerce(lookup(node, column.path), column))
        .collect()
}

pub fn is_sentinel(raw: &Value, kind: FieldKind) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            SENTINELS.contains(&s) || (kind != FieldKind::Text && s.is_empty())
        }
        _ => false,
    }
}

/// Coerces one raw value to the column's destination type.
pub fn coerce(raw: Option<&Value>, column: &Column) -> model::Result<SqlValue> {
    let raw = match raw {
        Some(raw) if !is_sentinel(raw, column.kind) => raw,
        _ if column.required => {
            return Err(malformed(column, "required value is missing"));
        }
        _ => return Ok(SqlValue::Null),
    };

    match column.kind {
        FieldKind::Text => text(raw, column),
        FieldKind::Numeric => numeric(raw, column).map(SqlValue::Real),
        FieldKind::Percent => percent(raw, column),
        FieldKind::BigInt => big_int(raw, column).map(SqlValue::Integer),
        FieldKind::Boolean => boolean(raw, column),
        FieldKind::NameList => name_list(raw, column),
        FieldKind::Date => {
            let parsed = raw.as_str().and_then(parse_date);
            date_or_null(parsed.map(|d| d.format("%Y-%m-%d").to_string()), raw, column)
        }
        FieldKind::Timestamp => {
            let parsed = raw.as_str().and_then(parse_timestamp);
            date_or_null(
                parsed.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                raw,
                column,
            )
        }
    }
}

/// Parses a feed date such as `15-MAR-2023 EOD` or `11-Jan-2024 16:15`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let text = text.strip_suffix(EOD_SUFFIX).unwrap_or(text);
    let date = text.split_whitespace().next()?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let text = text.strip_suffix(EOD_SUFFIX).unwrap_or(text);
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT).ok()
}

fn date_or_null(parsed: Option<String>, raw: &Value, column: &Column) -> model::Result<SqlValue> {
    match parsed {
        Some(date) => Ok(SqlValue::Text(date)),
        None if column.required => Err(malformed(column, &format!("unparseable date {}", raw))),
        None => {
            log::warn!("Ignoring unparseable date {} for {}", raw, column.name);
            Ok(SqlValue::Null)
        }
    }
}

fn text(raw: &Value, column: &Column) -> model::Result<SqlValue> {
    match raw {
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Number(n) => Ok(SqlValue::Text(n.to_string())),
        Value::Bool(b) => Ok(SqlValue::Text(b.to_string())),
        _ => Err(malformed(column, "expected a scalar value")),
    }
}

fn numeric(raw: &Value, column: &Column) -> model::Result<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(column, &format!("{} is not numeric", raw)))
}

/// `"NA %"` is still a sentinel once the suffix is gone.
fn percent(raw: &Value, column: &Column) -> model::Result<SqlValue> {
    let stripped = match raw {
        Value::String(s) => {
            let s = s.trim();
            Value::String(s.strip_suffix('%').unwrap_or(s).trim().to_string())
        }
        _ => raw.clone(),
    };
    if is_sentinel(&stripped, FieldKind::Percent) {
        if column.required {
            return Err(malformed(column, "required value is missing"));
        }
        return Ok(SqlValue::Null);
    }
    numeric(&stripped, column).map(SqlValue::Real)
}

fn big_int(raw: &Value, column: &Column) -> model::Result<i64> {
    if let Some(v) = raw.as_i64() {
        return Ok(v);
    }
    if let Some(v) = raw.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
        return Ok(v);
    }
    let v = numeric(raw, column)?;
    if v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
        return Err(malformed(column, &format!("{} is not a whole number", raw)));
    }
    Ok(v as i64)
}

fn boolean(raw: &Value, column: &Column) -> model::Result<SqlValue> {
    let value = match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    };
    value
        .map(|b| SqlValue::Integer(b as i64))
        .ok_or_else(|| malformed(column, &format!("{} is not a boolean", raw)))
}

fn name_list(raw: &Value, column: &Column) -> model::Result<SqlValue> {
    let items = raw
        .as_array()
        .ok_or_else(|| malformed(column, "expected a list"))?;
    let names: Vec<&str> = items
        .iter()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .collect();
    serde_json::to_string(&names)
        .map(SqlValue::Text)
        .map_err(|e| malformed(column, &e.to_string()))
}

fn malformed(column: &Column, reason: &str) -> LoaderError {
    LoaderError::MalformedDocument(format!("{}: {}", column.name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRICE: Column = Column::new("last_price", &["lastPrice"], FieldKind::Numeric);
    const DEL_POS_DATE: Column =
        Column::new("sec_wise_del_pos_date", &["secWiseDelPosDate"], FieldKind::Date);

    #[test]
    fn test_sentinels_become_null() {
        let kinds = [
            FieldKind::Text,
            FieldKind::Numeric,
            FieldKind::BigInt,
            FieldKind::Percent,
            FieldKind::Date,
            FieldKind::Timestamp,
            FieldKind::Boolean,
        ];
        for kind in kinds {
            let column = Column::new("c", &["c"], kind);
            for raw in [json!("NA"), json!("-"), json!(" NA "), Value::Null] {
                assert_eq!(coerce(Some(&raw), &column).unwrap(), SqlValue::Null, "{kind:?} {raw}");
            }
            assert_eq!(coerce(None, &column).unwrap(), SqlValue::Null);
        }
    }

    #[test]
    fn test_blank_text_passes_through() {
        let column = Column::new("series_remarks", &["seriesRemarks"], FieldKind::Text);
        assert_eq!(
            coerce(Some(&json!("")), &column).unwrap(),
            SqlValue::Text(String::new())
        );
    }

    #[test]
    fn test_numeric_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce(Some(&json!(1635.5)), &PRICE).unwrap(), SqlValue::Real(1635.5));
        assert_eq!(coerce(Some(&json!(" 29.5 ")), &PRICE).unwrap(), SqlValue::Real(29.5));
    }

    #[test]
    fn test_malformed_numeric_fails_document() {
        let err = coerce(Some(&json!("12abc")), &PRICE).unwrap_err();
        assert!(matches!(err, LoaderError::MalformedDocument(msg) if msg.contains("last_price")));
        assert!(coerce(Some(&json!({"v": 1})), &PRICE).is_err());
    }

    #[test]
    fn test_big_int() {
        let column = Column::new("total_buy_quantity", &["q"], FieldKind::BigInt);
        assert_eq!(coerce(Some(&json!(4521)), &column).unwrap(), SqlValue::Integer(4521));
        assert_eq!(coerce(Some(&json!("4521")), &column).unwrap(), SqlValue::Integer(4521));
        assert_eq!(coerce(Some(&json!(4521.0)), &column).unwrap(), SqlValue::Integer(4521));
        assert!(coerce(Some(&json!(45.5)), &column).is_err());
    }

    #[test]
    fn test_percent_strips_suffix() {
        let column = Column::new("public", &["Public"], FieldKind::Percent);
        assert_eq!(coerce(Some(&json!("55.2 %")), &column).unwrap(), SqlValue::Real(55.2));
        assert_eq!(coerce(Some(&json!("100%")), &column).unwrap(), SqlValue::Real(100.0));
        assert!(coerce(Some(&json!("lots %")), &column).is_err());
    }

    #[test]
    fn test_percent_sentinel_with_suffix_is_null() {
        let column = Column::new("public", &["Public"], FieldKind::Percent);
        assert_eq!(coerce(Some(&json!("NA %")), &column).unwrap(), SqlValue::Null);
        assert_eq!(coerce(Some(&json!("-%")), &column).unwrap(), SqlValue::Null);
        assert_eq!(coerce(Some(&json!(" %")), &column).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_eod_date() {
        assert_eq!(
            coerce(Some(&json!("15-MAR-2023 EOD")), &DEL_POS_DATE).unwrap(),
            SqlValue::Text("2023-03-15".into())
        );
        assert_eq!(coerce(Some(&json!("NA")), &DEL_POS_DATE).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_date_ignores_time_of_day() {
        assert_eq!(
            parse_date("11-Jan-2024 16:15"),
            NaiveDate::from_ymd_opt(2024, 1, 11)
        );
    }

    #[test]
    fn test_unparseable_optional_date_is_null() {
        assert_eq!(coerce(Some(&json!("2023/03/15")), &DEL_POS_DATE).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_unparseable_required_date_fails() {
        let column = Column::required("date", &["date"], FieldKind::Date);
        assert!(coerce(Some(&json!("someday")), &column).is_err());
        assert!(coerce(None, &column).is_err());
    }

    #[test]
    fn test_timestamp() {
        let column = Column::new("last_update_time", &["t"], FieldKind::Timestamp);
        assert_eq!(
            coerce(Some(&json!("14-Mar-2024 16:00:00")), &column).unwrap(),
            SqlValue::Text("2024-03-14 16:00:00".into())
        );
    }

    #[test]
    fn test_boolean() {
        let column = Column::new("check_i_nav", &["checkINAV"], FieldKind::Boolean);
        assert_eq!(coerce(Some(&json!(true)), &column).unwrap(), SqlValue::Integer(1));
        assert_eq!(coerce(Some(&json!("false")), &column).unwrap(), SqlValue::Integer(0));
        assert!(coerce(Some(&json!("maybe")), &column).is_err());
    }

    #[test]
    fn test_name_list() {
        let column = Column::new("bulk_block_deals_name", &["bulkBlockDeals"], FieldKind::NameList);
        let raw = json!([{"name": "Session I"}, {"name": "Session II"}, {}]);
        assert_eq!(
            coerce(Some(&raw), &column).unwrap(),
            SqlValue::Text(r#"["Session I","Session II"]"#.into())
        );
    }

    #[test]
    fn test_evaluate_row_follows_nested_paths() {
        let columns = [
            Column::new("min", &["intraDayHighLow", "min"], FieldKind::Numeric),
            Column::new("max", &["intraDayHighLow", "max"], FieldKind::Numeric),
            Column::new("tick_size", &["tickSize"], FieldKind::Numeric),
        ];
        let node = json!({"intraDayHighLow": {"min": 10, "max": "NA"}});
        assert_eq!(
            evaluate_row(&node, &columns).unwrap(),
            vec![SqlValue::Real(10.0), SqlValue::Null, SqlValue::Null]
        );
    }
}
