use rusqlite::{Connection, Result};

use crate::normalize::{Column, FieldKind::*};

/// What happens when a row for an already-loaded key arrives again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Overwrite every non-key column.
    Upsert,
    /// Keep the existing row untouched.
    InsertIfAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKey {
    /// `symbol` is the primary key.
    Primary,
    /// One row per symbol.
    UniqueSymbol,
    /// Many rows per symbol, unique on symbol plus these columns.
    Natural(&'static [&'static str]),
}

/// A derived table: its columns double as the coercion table for its rows.
#[derive(Debug)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub key: TableKey,
    pub conflict: ConflictPolicy,
}

pub static EQUITY_INFO: TableSpec = TableSpec {
    name: "equity_info",
    columns: &[
        Column::new("company_name", &["companyName"], Text),
        Column::new("industry", &["industry"], Text),
        Column::new("isin", &["isin"], Text),
        Column::new("slb_isin", &["slb_isin"], Text),
    ],
    key: TableKey::Primary,
    conflict: ConflictPolicy::Upsert,
};

pub static EQUITY_METADATA: TableSpec = TableSpec {
    name: "equity_metadata",
    columns: &[
        Column::new("series", &["series"], Text),
        Column::new("isin", &["isin"], Text),
        Column::new("status", &["status"], Text),
        Column::new("listing_date", &["listingDate"], Date),
        Column::new("industry", &["industry"], Text),
        Column::new("last_update_time", &["lastUpdateTime"], Timestamp),
        Column::new("pd_sector_pe", &["pdSectorPe"], Numeric),
        Column::new("pd_symbol_pe", &["pdSymbolPe"], Numeric),
        Column::new("pd_sector_ind", &["pdSectorInd"], Text),
    ],
    key: TableKey::UniqueSymbol,
    conflict: ConflictPolicy::InsertIfAbsent,
};

pub static EQUITY_PRICE_INFO: TableSpec = TableSpec {
    name: "equity_price_info",
    columns: &[
        Column::new("last_price", &["lastPrice"], Numeric),
        Column::new("change", &["change"], Numeric),
        Column::new("p_change", &["pChange"], Numeric),
        Column::new("previous_close", &["previousClose"], Numeric),
        Column::new("open", &["open"], Numeric),
        Column::new("close", &["close"], Numeric),
        Column::new("vwap", &["vwap"], Numeric),
        Column::new("stock_ind_close_price", &["stockIndClosePrice"], Numeric),
        Column::new("lower_cp", &["lowerCP"], Text),
        Column::new("upper_cp", &["upperCP"], Text),
        Column::new("p_price_band", &["pPriceBand"], Text),
        Column::new("base_price", &["basePrice"], Numeric),
        Column::new("min", &["intraDayHighLow", "min"], Numeric),
        Column::new("max", &["intraDayHighLow", "max"], Numeric),
        Column::new("intraday_high_low_value", &["intraDayHighLow", "value"], Numeric),
        Column::new("week_high_low_min", &["weekHighLow", "min"], Numeric),
        Column::new("week_high_low_min_date", &["weekHighLow", "minDate"], Date),
        Column::new("week_high_low_max", &["weekHighLow", "max"], Numeric),
        Column::new("week_high_low_max_date", &["weekHighLow", "maxDate"], Date),
        Column::new("week_high_low_value", &["weekHighLow", "value"], Numeric),
        Column::new("i_nav_value", &["iNavValue"], Numeric),
        Column::new("check_i_nav", &["checkINAV"], Boolean),
        Column::new("tick_size", &["tickSize"], Numeric),
    ],
    key: TableKey::UniqueSymbol,
    conflict: ConflictPolicy::Upsert,
};

pub static EQUITY_INDUSTRY_INFO: TableSpec = TableSpec {
    name: "equity_industry_info",
    columns: &[
        Column::new("macro", &["macro"], Text),
        Column::new("sector", &["sector"], Text),
        Column::new("industry", &["industry"], Text),
        Column::new("basic_industry", &["basicIndustry"], Text),
    ],
    key: TableKey::UniqueSymbol,
    conflict: ConflictPolicy::Upsert,
};

pub static TRADE_INFO: TableSpec = TableSpec {
    name: "trade_info",
    columns: &[
        Column::new("no_block_deals", &["noBlockDeals"], Boolean),
        Column::new("bulk_block_deals_name", &["bulkBlockDeals"], NameList),
        Column::new("total_buy_quantity", &["marketDeptOrderBook", "totalBuyQuantity"], BigInt),
        Column::new("total_sell_quantity", &["marketDeptOrderBook", "totalSellQuantity"], BigInt),
        Column::new(
            "trade_info_total_traded_volume",
            &["marketDeptOrderBook", "tradeInfo", "totalTradedVolume"],
            Numeric,
        ),
        Column::new(
            "trade_info_total_traded_value",
            &["marketDeptOrderBook", "tradeInfo", "totalTradedValue"],
            Numeric,
        ),
        Column::new(
            "trade_info_total_market_cap",
            &["marketDeptOrderBook", "tradeInfo", "totalMarketCap"],
            Numeric,
        ),
        Column::new("ffmc", &["marketDeptOrderBook", "tradeInfo", "ffmc"], Numeric),
        Column::new("impact_cost", &["marketDeptOrderBook", "tradeInfo", "impactCost"], Numeric),
        Column::new(
            "cm_daily_volatility",
            &["marketDeptOrderBook", "tradeInfo", "cmDailyVolatility"],
            Text,
        ),
        Column::new(
            "cm_annual_volatility",
            &["marketDeptOrderBook", "tradeInfo", "cmAnnualVolatility"],
            Text,
        ),
        Column::new("market_lot", &["marketDeptOrderBook", "tradeInfo", "marketLot"], Text),
        Column::new("active_series", &["marketDeptOrderBook", "tradeInfo", "activeSeries"], Text),
        Column::new("security_var", &["marketDeptOrderBook", "valueAtRisk", "securityVar"], Numeric),
        Column::new("index_var", &["marketDeptOrderBook", "valueAtRisk", "indexVar"], Numeric),
        Column::new("var_margin", &["marketDeptOrderBook", "valueAtRisk", "varMargin"], Numeric),
        Column::new(
            "extreme_loss_margin",
            &["marketDeptOrderBook", "valueAtRisk", "extremeLossMargin"],
            Numeric,
        ),
        Column::new("adhoc_margin", &["marketDeptOrderBook", "valueAtRisk", "adhocMargin"], Numeric),
        Column::new(
            "applicable_margin",
            &["marketDeptOrderBook", "valueAtRisk", "applicableMargin"],
            Numeric,
        ),
    ],
    key: TableKey::UniqueSymbol,
    conflict: ConflictPolicy::InsertIfAbsent,
};

pub static SECURITY_WISE_DP: TableSpec = TableSpec {
    name: "security_wise_dp",
    columns: &[
        Column::new("quantity_traded", &["quantityTraded"], BigInt),
        Column::new("delivery_quantity", &["deliveryQuantity"], BigInt),
        Column::new("delivery_to_traded_quantity", &["deliveryToTradedQuantity"], Numeric),
        Column::new("series_remarks", &["seriesRemarks"], Text),
        Column::new("sec_wise_del_pos_date", &["secWiseDelPosDate"], Date),
    ],
    key: TableKey::UniqueSymbol,
    conflict: ConflictPolicy::InsertIfAbsent,
};

pub static CORPORATE_ACTIONS: TableSpec = TableSpec {
    name: "corporate_actions",
    columns: &[
        Column::new("exdate", &["exdate"], Date),
        Column::new("purpose", &["purpose"], Text),
    ],
    key: TableKey::Natural(&["exdate", "purpose"]),
    conflict: ConflictPolicy::InsertIfAbsent,
};

/// Rows are pivoted from `{date: [{category: "x %"}, ...]}`: the paths are holder categories.
pub static SHAREHOLDINGS_PATTERNS: TableSpec = TableSpec {
    name: "shareholdings_patterns",
    columns: &[
        Column::required("date", &["date"], Date),
        Column::new("promoter_and_promoter_group", &["Promoter & Promoter Group"], Percent),
        Column::new("public", &["Public"], Percent),
        Column::new("shares_held_by_employee_trusts", &["Shares held by Employee Trusts"], Percent),
        Column::new("total", &["Total"], Percent),
    ],
    key: TableKey::Natural(&["date"]),
    conflict: ConflictPolicy::InsertIfAbsent,
};

pub static FINANCIAL_RESULTS: TableSpec = TableSpec {
    name: "financial_results",
    columns: &[
        Column::new("from_date", &["from_date"], Date),
        Column::new("to_date", &["to_date"], Date),
        Column::new("expenditure", &["expenditure"], Numeric),
        Column::new("income", &["income"], Numeric),
        Column::new("audited", &["audited"], Text),
        Column::new("cumulative", &["cumulative"], Text),
        Column::new("consolidated", &["consolidated"], Text),
        Column::new("re_dil_eps", &["reDilEPS"], Numeric),
        Column::new("re_pro_loss_bef_tax", &["reProLossBefTax"], Numeric),
        Column::new("pro_loss_aft_tax", &["proLossAftTax"], Numeric),
        Column::new("re_broadcast_timestamp", &["re_broadcast_timestamp"], Date),
        Column::new("xbrl_attachment", &["xbrl_attachment"], Text),
        Column::new("na_attachment", &["na_attachment"], Text),
    ],
    key: TableKey::Natural(&["from_date", "to_date", "consolidated"]),
    conflict: ConflictPolicy::InsertIfAbsent,
};

pub static BOARD_MEETING: TableSpec = TableSpec {
    name: "board_meeting",
    columns: &[
        Column::new("purpose", &["purpose"], Text),
        Column::new("meeting_date", &["meetingdate"], Date),
    ],
    key: TableKey::Natural(&["meeting_date"]),
    conflict: ConflictPolicy::InsertIfAbsent,
};

/// Creation and write order; `equity_info` comes first because every other table references it.
pub static TABLES: [&TableSpec; 10] = [
    &EQUITY_INFO,
    &EQUITY_METADATA,
    &EQUITY_PRICE_INFO,
    &EQUITY_INDUSTRY_INFO,
    &TRADE_INFO,
    &SECURITY_WISE_DP,
    &CORPORATE_ACTIONS,
    &SHAREHOLDINGS_PATTERNS,
    &FINANCIAL_RESULTS,
    &BOARD_MEETING,
];

pub fn create_table_sql(table: &TableSpec) -> String {
    let mut ddl = format!("CREATE TABLE IF NOT EXISTS {} (\n", table.name);
    match table.key {
        TableKey::Primary => ddl.push_str("    symbol VARCHAR(20) PRIMARY KEY"),
        _ => ddl.push_str(
            "    symbol VARCHAR(20) NOT NULL REFERENCES equity_info(symbol)",
        ),
    }
    for column in table.columns {
        ddl.push_str(&format!(",\n    \"{}\" {}", column.name, column.kind.sql_type()));
    }
    if table.key == TableKey::UniqueSymbol {
        ddl.push_str(",\n    UNIQUE(symbol)");
    }
    ddl.push_str("\n);");
    ddl
}

/// Unique index for multi-row tables. Null sub-keys compare equal so re-runs stay duplicate free.
pub fn create_index_sql(table: &TableSpec) -> Option<String> {
    let TableKey::Natural(sub_key) = table.key else {
        return None;
    };
    let key: Vec<String> = sub_key
        .iter()
        .map(|column| format!("IFNULL(\"{}\", '')", column))
        .collect();
    Some(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_{}_natural_key ON {} (symbol, {});",
        table.name,
        table.name,
        key.join(", ")
    ))
}

/// Creates all ten tables and their indexes if they do not exist yet.
pub fn create_tables(conn: &mut Connection) -> Result<()> {
    let transaction = conn.transaction()?;
    for table in TABLES {
        transaction.execute(&create_table_sql(table), [])?;
        if let Some(index) = create_index_sql(table) {
            transaction.execute(&index, [])?;
        }
    }
    transaction.commit()?;
    log::info!("Created/verified {} tables", TABLES.len());
    Ok(())
}
