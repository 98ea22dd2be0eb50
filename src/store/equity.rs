use rusqlite::{Connection, params_from_iter, types::Value};

use super::schema::{ConflictPolicy, TableKey, TableSpec};
use crate::model::{self, EquityRecords};

/// Rows changed per table while saving one document.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub rows_changed: Vec<(&'static str, usize)>,
}

impl WriteOutcome {
    pub fn total(&self) -> usize {
        self.rows_changed.iter().map(|(_, n)| n).sum()
    }
}

/// Builds the per-table statement: `symbol` is always bound first, followed by the table's columns.
pub fn insert_sql(table: &TableSpec) -> String {
    let mut columns = vec!["symbol".to_string()];
    columns.extend(table.columns.iter().map(|c| format!("\"{}\"", c.name)));
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    let on_conflict = match (table.conflict, table.key) {
        (ConflictPolicy::Upsert, TableKey::Primary | TableKey::UniqueSymbol) => {
            let assignments: Vec<String> = table
                .columns
                .iter()
                .map(|c| format!("\"{0}\" = excluded.\"{0}\"", c.name))
                .collect();
            format!("ON CONFLICT(symbol) DO UPDATE SET {}", assignments.join(", "))
        }
        _ => "ON CONFLICT DO NOTHING".to_string(),
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) {}",
        table.name,
        columns.join(", "),
        placeholders.join(", "),
        on_conflict
    )
}

/// Saves one document's records in a single transaction. `equity_info` goes first.
/// Any error drops the transaction uncommitted, which rolls back every table.
pub fn save_equity_records(
    conn: &mut Connection,
    records: &EquityRecords,
) -> model::Result<WriteOutcome> {
    let transaction = conn.transaction()?;
    let mut outcome = WriteOutcome::default();
    for table_rows in &records.tables {
        if table_rows.rows.is_empty() {
            continue;
        }
        let mut stmt = transaction.prepare_cached(&insert_sql(table_rows.table))?;
        let mut changed = 0;
        for row in &table_rows.rows {
            let params = std::iter::once(Value::Text(records.symbol.clone())).chain(row.iter().cloned());
            changed += stmt.execute(params_from_iter(params))?;
        }
        outcome.rows_changed.push((table_rows.table.name, changed));
    }
    transaction.commit()?;
    Ok(outcome)
}
