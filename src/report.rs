use std::{io::Write, path::Path};

use csv::Writer;
use serde::Serialize;

use crate::{ingest::RunSummary, model};

#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    filename: &'a str,
    symbol: &'a str,
    status: &'a str,
    detail: String,
}

/// Writes one CSV line per processed file: loaded files first, then failures.
pub fn write_report<W: Write>(summary: &RunSummary, out: W) -> model::Result<()> {
    let mut writer = Writer::from_writer(out);
    for file in &summary.loaded {
        writer.serialize(ReportLine {
            filename: &file.filename,
            symbol: &file.symbol,
            status: "loaded",
            detail: format!("{} rows", file.rows_written),
        })?;
    }
    for failure in &summary.failures {
        writer.serialize(ReportLine {
            filename: &failure.filename,
            symbol: failure.symbol.as_deref().unwrap_or(""),
            status: "failed",
            detail: failure.error.to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report_file(summary: &RunSummary, path: &Path) -> model::Result<()> {
    let file = std::fs::File::create(path)?;
    write_report(summary, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ingest::{FileFailure, LoadedFile},
        model::LoaderError,
    };

    #[test]
    fn test_report_lines() {
        let summary = RunSummary {
            loaded: vec![LoadedFile {
                filename: "INFY.json".into(),
                symbol: "INFY".into(),
                rows_written: 12,
            }],
            failures: vec![FileFailure {
                filename: "BROKEN.json".into(),
                symbol: None,
                error: LoaderError::MalformedDocument("equityDetails is missing".into()),
            }],
        };

        let mut out = Vec::new();
        write_report(&summary, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "filename,symbol,status,detail\n\
             INFY.json,INFY,loaded,12 rows\n\
             BROKEN.json,,failed,malformed document: equityDetails is missing\n"
        );
    }
}
