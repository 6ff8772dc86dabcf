use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fmt::amount;
use crate::models::TransactionTable;
use crate::table::TableModel;

/// Write one table as CSV: `Date,Description,Amount`, amounts signed.
pub fn write_csv(table: &TransactionTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Date", "Description", "Amount"])?;
    for entry in &table.entries {
        wtr.write_record([
            entry.txn.date.as_str(),
            entry.txn.description.as_str(),
            &amount(entry.txn.amount),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render one table as tab-separated text, suitable for pasting into a
/// spreadsheet. Includes the totals row.
pub fn tsv_string(table: &TransactionTable) -> String {
    let mut out = String::from("Date\tDescription\tAmount\n");
    for entry in &table.entries {
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            entry.txn.date,
            entry.txn.description,
            amount(entry.txn.amount)
        ));
    }
    out.push_str(&format!("\tTotal\t{}\n", amount(table.total)));
    out
}

/// Write the full statement snapshot (both tables plus unresolved rows)
/// as pretty-printed JSON.
pub fn write_json(model: &TableModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &model.snapshot())?;
    Ok(())
}

/// Export everything under `dir`: withdrawals.csv, deposits.csv,
/// statement.json. Returns the paths written.
pub fn export_all(model: &TableModel, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let withdrawals = dir.join("withdrawals.csv");
    let deposits = dir.join("deposits.csv");
    let json = dir.join("statement.json");

    write_csv(model.withdrawals(), &withdrawals)?;
    write_csv(model.deposits(), &deposits)?;
    write_json(model, &json)?;

    Ok(vec![withdrawals, deposits, json])
}
