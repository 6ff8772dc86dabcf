use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::fmt::money;
use crate::models::{TransactionTable, UnresolvedKind, UnresolvedRow};
use crate::table::TableModel;

fn reason(kind: UnresolvedKind) -> &'static str {
    match kind {
        UnresolvedKind::Classification => "ambiguous category",
        UnresolvedKind::AmountParse => "unreadable amount",
        UnresolvedKind::Layout => "columns unresolved",
    }
}

/// One classified table with its totals row. Entry ids are shown so the
/// user can address rows in edit commands.
pub fn format_table(table: &TransactionTable) -> String {
    let mut out = Table::new();
    out.set_header(vec!["#", "Date", "Description", "Amount", ""]);

    for entry in &table.entries {
        let flag = if entry.txn.needs_review {
            "review".yellow().to_string()
        } else {
            String::new()
        };
        out.add_row(vec![
            Cell::new(entry.id),
            Cell::new(&entry.txn.date),
            Cell::new(&entry.txn.description),
            Cell::new(money(entry.txn.amount)),
            Cell::new(flag),
        ]);
    }
    out.add_row(vec![
        Cell::new(""),
        Cell::new(""),
        Cell::new("Total".bold()),
        Cell::new(money(table.total).bold()),
        Cell::new(""),
    ]);
    out.to_string()
}

/// Rows that could not be classified, kept visible for manual assignment.
pub fn format_unresolved(rows: &[UnresolvedRow]) -> String {
    let mut out = Table::new();
    out.set_header(vec!["#", "Cells", "Reason"]);
    for u in rows {
        let cells: Vec<String> = u
            .row
            .cells
            .iter()
            .map(|(role, text)| format!("{}: {}", role.label(), text))
            .collect();
        out.add_row(vec![
            Cell::new(u.id),
            Cell::new(cells.join(" | ")),
            Cell::new(reason(u.kind).yellow()),
        ]);
    }
    out.to_string()
}

/// Full statement view: both tables plus the unresolved list when present.
pub fn format_statement(model: &TableModel) -> String {
    let mut out = String::new();

    let withdrawals = model.withdrawals().category.label().to_uppercase();
    out.push_str(&format!(
        "\n{} ({})\n",
        withdrawals.red().bold(),
        model.withdrawals().len()
    ));
    out.push_str(&format_table(model.withdrawals()));
    out.push('\n');

    let deposits = model.deposits().category.label().to_uppercase();
    out.push_str(&format!(
        "\n{} ({})\n",
        deposits.green().bold(),
        model.deposits().len()
    ));
    out.push_str(&format_table(model.deposits()));
    out.push('\n');

    if !model.unresolved().is_empty() {
        out.push_str(&format!("\n{}\n", "NEEDS ATTENTION".yellow().bold()));
        out.push_str(&format_unresolved(model.unresolved()));
        out.push('\n');
    }

    out
}
