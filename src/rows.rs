use crate::models::{ColumnRole, ColumnSpec, Line, Row};

/// Column owning a horizontal position, by center containment.
fn role_at(specs: &[ColumnSpec], x: f64) -> ColumnRole {
    specs
        .iter()
        .find(|s| s.contains(x))
        .or_else(|| specs.last())
        .map(|s| s.role)
        .unwrap_or(ColumnRole::Unknown)
}

/// True when a line carries description text but nothing in the date or
/// amount columns: it extends the previous row rather than starting one.
fn is_continuation(row: &Row) -> bool {
    row.cell(ColumnRole::Date).is_empty()
        && row.cell(ColumnRole::Withdrawal).is_empty()
        && row.cell(ColumnRole::Deposit).is_empty()
        && row.cell(ColumnRole::Balance).is_empty()
        && !row.cell(ColumnRole::Description).is_empty()
}

/// Map each line's tokens onto the detected columns, producing one Row per
/// logical transaction line. Multi-line descriptions are merged into the
/// row they continue.
pub fn assemble_rows(lines: &[Line], specs: &[ColumnSpec], header_line: Option<usize>) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if Some(idx) == header_line {
            continue;
        }
        let mut row = Row {
            source_line: idx,
            ..Row::default()
        };
        for token in &line.tokens {
            row.append_cell(role_at(specs, token.center_x()), token.text.trim());
        }
        if row.cells.is_empty() {
            continue;
        }

        if is_continuation(&row) {
            if let Some(prev) = rows.last_mut() {
                prev.append_cell(ColumnRole::Description, row.cell(ColumnRole::Description));
                continue;
            }
        }
        rows.push(row);
    }

    rows
}
