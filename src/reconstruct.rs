use log::debug;
use regex::Regex;

use crate::classify::{classify_row, parse_amount, Classification, ClassifyContext};
use crate::columns::{detect_columns, is_date_shaped, is_header_line, DetectorConfig};
use crate::models::{ColumnRole, ColumnSpec, PageTokens, UnresolvedKind};
use crate::normalizer::lines_from_tokens;
use crate::rows::assemble_rows;
use crate::table::TableModel;

/// Column set established earlier in the statement.
#[derive(Debug, Clone)]
struct CarriedColumns {
    specs: Vec<ColumnSpec>,
    from_header: bool,
}

/// Cross-page state threaded through reconstruction: the established
/// columns, the last seen date, and the last seen balance. Page N's
/// balance-delta inference depends on page N-1's final row, so pages are
/// processed strictly in order.
#[derive(Debug, Clone, Default)]
pub struct Carry {
    columns: Option<CarriedColumns>,
    last_date: Option<String>,
    last_balance: Option<f64>,
}

/// How a page's columns were established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStatus {
    Header,
    Inferred,
    CarriedOver,
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct PageReport {
    pub layout: LayoutStatus,
    pub rows: usize,
    pub transactions: usize,
    pub unresolved: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StatementReport {
    pub pages: Vec<PageReport>,
}

impl StatementReport {
    /// True when no page produced classified columns: the caller should
    /// present raw rows instead of the two tables.
    pub fn layout_unresolved(&self) -> bool {
        !self
            .pages
            .iter()
            .any(|p| p.layout != LayoutStatus::Unresolved)
    }
}

/// Non-transaction noise: opening/closing summaries, page furniture.
/// Checked at the line level, before continuation merging can fold the
/// text into a real row.
fn summary_pattern() -> Regex {
    Regex::new(r"(?i)opening|closing|total|statement|continued|page\s+\d").unwrap()
}

fn resolve_columns(
    lines: &[crate::models::Line],
    page_width: f64,
    carry: &mut Carry,
    config: &DetectorConfig,
) -> (Vec<ColumnSpec>, Option<usize>, LayoutStatus) {
    // A header established on an earlier page wins for the whole statement.
    if let Some(carried) = &carry.columns {
        if carried.from_header {
            return (carried.specs.clone(), None, LayoutStatus::CarriedOver);
        }
    }

    let det = detect_columns(lines, page_width, config);
    let specs = det.specs().to_vec();

    if let Some(idx) = det.header_line() {
        carry.columns = Some(CarriedColumns {
            specs: specs.clone(),
            from_header: true,
        });
        return (specs, Some(idx), LayoutStatus::Header);
    }

    // An earlier page's layout wins over this page's guess (or failure);
    // only a real header replaces it.
    if let Some(carried) = &carry.columns {
        return (carried.specs.clone(), None, LayoutStatus::CarriedOver);
    }

    if det.is_resolved() {
        carry.columns = Some(CarriedColumns {
            specs: specs.clone(),
            from_header: false,
        });
        (specs, None, LayoutStatus::Inferred)
    } else {
        (specs, None, LayoutStatus::Unresolved)
    }
}

/// Reconstruct one page's rows into the model, updating the carry.
pub fn reconstruct_page(
    page: &PageTokens,
    carry: &mut Carry,
    model: &mut TableModel,
    config: &DetectorConfig,
) -> PageReport {
    let lines = lines_from_tokens(&page.tokens, config.tolerance_factor);
    if lines.is_empty() {
        return PageReport {
            layout: match &carry.columns {
                Some(_) => LayoutStatus::CarriedOver,
                None => LayoutStatus::Unresolved,
            },
            rows: 0,
            transactions: 0,
            unresolved: 0,
            skipped: 0,
        };
    }

    let (specs, header_line, layout) = resolve_columns(&lines, page.page_width, carry, config);
    let has_deposit_column = specs.iter().any(|s| s.role == ColumnRole::Deposit);
    model.set_has_deposit_column(has_deposit_column);

    // Drop the header line, repeated headers from later pages, and summary
    // furniture, keeping only candidate transaction lines.
    let summary = summary_pattern();
    let mut skipped = 0usize;
    let mut work: Vec<crate::models::Line> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if Some(idx) == header_line {
            continue;
        }
        if header_line.is_none() && is_header_line(line, config) {
            continue;
        }
        if summary.is_match(&line.text()) {
            skipped += 1;
            continue;
        }
        work.push(line.clone());
    }

    let rows = assemble_rows(&work, &specs, None);
    let mut report = PageReport {
        layout,
        rows: rows.len(),
        transactions: 0,
        unresolved: 0,
        skipped,
    };

    for row in rows {
        if layout == LayoutStatus::Unresolved {
            model.add_unresolved(row, UnresolvedKind::Layout);
            report.unresolved += 1;
            continue;
        }

        let ctx = ClassifyContext {
            prev_balance: carry.last_balance,
            last_date: carry.last_date.clone(),
            has_deposit_column,
        };
        let dated = is_date_shaped(row.cell(ColumnRole::Date));
        let balance = parse_amount(row.cell(ColumnRole::Balance));

        match classify_row(&row, &ctx) {
            Classification::Transaction(txn) => {
                if dated && !txn.date.is_empty() {
                    carry.last_date = Some(txn.date.clone());
                }
                model.add_transaction(txn);
                report.transactions += 1;
            }
            Classification::Unresolved(kind) => {
                model.add_unresolved(row, kind);
                report.unresolved += 1;
            }
        }
        if let Some(bal) = balance {
            carry.last_balance = Some(bal);
        }
    }

    debug!(
        "page reconstructed: layout {:?}, {} rows, {} transactions, {} unresolved, {} skipped",
        report.layout, report.rows, report.transactions, report.unresolved, report.skipped
    );
    report
}

/// Reconstruct a whole statement, pages in order, rows accumulating into
/// one model.
pub fn reconstruct_statement(
    pages: &[PageTokens],
    config: &DetectorConfig,
) -> (TableModel, StatementReport) {
    let mut model = TableModel::new();
    let mut carry = Carry::default();
    let mut report = StatementReport::default();
    for page in pages {
        report
            .pages
            .push(reconstruct_page(page, &mut carry, &mut model, config));
    }
    (model, report)
}

/// Re-run reconstruction with user-corrected column roles: `overrides`
/// assigns a role to a detected column index, replacing any automatic
/// assignment of that role elsewhere.
pub fn reassemble_with_mapping(
    pages: &[PageTokens],
    overrides: &[(usize, ColumnRole)],
    config: &DetectorConfig,
) -> (TableModel, StatementReport) {
    let mut carry = Carry::default();

    // Establish the automatic layout from the first page that yields one.
    for page in pages {
        let lines = lines_from_tokens(&page.tokens, config.tolerance_factor);
        if lines.is_empty() {
            continue;
        }
        let mut probe = Carry::default();
        let (mut specs, _, layout) = resolve_columns(&lines, page.page_width, &mut probe, config);
        if layout == LayoutStatus::Unresolved {
            continue;
        }
        for &(idx, role) in overrides {
            if idx >= specs.len() {
                continue;
            }
            if role != ColumnRole::Unknown {
                for spec in specs.iter_mut() {
                    if spec.role == role {
                        spec.role = ColumnRole::Unknown;
                    }
                }
            }
            specs[idx].role = role;
        }
        carry.columns = Some(CarriedColumns {
            specs,
            from_header: true,
        });
        break;
    }

    let mut model = TableModel::new();
    let mut report = StatementReport::default();
    for page in pages {
        report
            .pages
            .push(reconstruct_page(page, &mut carry, &mut model, config));
    }
    (model, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Token;

    fn tok(text: &str, x: f64, width: f64, y: f64) -> Token {
        Token {
            text: text.to_string(),
            x,
            y,
            width,
            height: 10.0,
        }
    }

    fn header_tokens(y: f64) -> Vec<Token> {
        vec![
            tok("Date", 20.0, 40.0, y),
            tok("Description", 100.0, 80.0, y),
            tok("Withdrawal", 310.0, 70.0, y),
            tok("Deposit", 430.0, 60.0, y),
            tok("Balance", 530.0, 60.0, y),
        ]
    }

    fn data_tokens(y: f64, date: &str, desc: &str, wd: &str, dp: &str, bal: &str) -> Vec<Token> {
        let mut t = vec![tok(date, 20.0, 40.0, y), tok(desc, 100.0, 120.0, y)];
        if !wd.is_empty() {
            t.push(tok(wd, 320.0, 40.0, y));
        }
        if !dp.is_empty() {
            t.push(tok(dp, 440.0, 40.0, y));
        }
        if !bal.is_empty() {
            t.push(tok(bal, 540.0, 50.0, y));
        }
        t
    }

    fn page(tokens: Vec<Token>) -> PageTokens {
        PageTokens {
            tokens,
            page_width: 612.0,
            page_height: 792.0,
        }
    }

    #[test]
    fn test_single_page_statement() {
        let mut tokens = header_tokens(50.0);
        tokens.extend(data_tokens(80.0, "03/04", "COFFEE SHOP", "4.50", "", "1195.50"));
        tokens.extend(data_tokens(100.0, "03/05", "PAYROLL", "", "2500.00", "3695.50"));
        let (model, report) = reconstruct_statement(&[page(tokens)], &DetectorConfig::default());

        assert!(!report.layout_unresolved());
        assert_eq!(report.pages[0].layout, LayoutStatus::Header);
        assert_eq!(model.withdrawals().len(), 1);
        assert_eq!(model.deposits().len(), 1);
        assert_eq!(model.withdrawals().total, 4.50);
        assert_eq!(model.deposits().total, 2500.0);
    }

    #[test]
    fn test_columns_carry_to_later_pages_and_repeated_header_skipped() {
        let mut p1 = header_tokens(50.0);
        p1.extend(data_tokens(80.0, "03/04", "COFFEE SHOP", "4.50", "", "1195.50"));
        let mut p2 = header_tokens(50.0); // repeated header
        p2.extend(data_tokens(80.0, "03/06", "GROCERY MART", "82.13", "", "1113.37"));

        let (model, report) =
            reconstruct_statement(&[page(p1), page(p2)], &DetectorConfig::default());
        assert_eq!(report.pages[1].layout, LayoutStatus::CarriedOver);
        assert_eq!(report.pages[1].skipped, 0);
        assert_eq!(model.withdrawals().len(), 2);
    }

    #[test]
    fn test_balance_delta_crosses_page_boundary() {
        let mut p1 = header_tokens(50.0);
        p1.extend(data_tokens(80.0, "03/04", "COFFEE SHOP", "4.50", "", "1200.00"));
        // Page 2 row has no amount cells; only the balance moved.
        let p2 = data_tokens(80.0, "03/06", "INTEREST EARNED", "", "", "1210.00");

        let (model, _) = reconstruct_statement(&[page(p1), page(p2)], &DetectorConfig::default());
        assert_eq!(model.deposits().len(), 1);
        assert_eq!(model.deposits().entries[0].txn.amount, 10.0);
    }

    #[test]
    fn test_date_carries_to_undated_rows() {
        let mut tokens = header_tokens(50.0);
        tokens.extend(data_tokens(80.0, "03/04/2024", "COFFEE SHOP", "4.50", "", ""));
        tokens.extend(data_tokens(100.0, "", "CARD PURCHASE", "9.99", "", ""));
        let (model, _) = reconstruct_statement(&[page(tokens)], &DetectorConfig::default());
        assert_eq!(model.withdrawals().len(), 2);
        assert_eq!(model.withdrawals().entries[1].txn.date, "2024-03-04");
    }

    #[test]
    fn test_summary_rows_skipped() {
        let mut tokens = header_tokens(50.0);
        tokens.extend(data_tokens(80.0, "03/04", "OPENING BALANCE", "", "", "1200.00"));
        tokens.extend(data_tokens(100.0, "03/04", "COFFEE SHOP", "4.50", "", "1195.50"));
        tokens.extend(data_tokens(120.0, "", "CONTINUED ON PAGE 2", "", "", ""));
        let (model, report) = reconstruct_statement(&[page(tokens)], &DetectorConfig::default());
        assert_eq!(report.pages[0].skipped, 2);
        assert_eq!(model.withdrawals().len(), 1);
        assert!(model.unresolved().is_empty());
    }

    #[test]
    fn test_unresolved_layout_keeps_raw_rows() {
        let tokens = vec![
            tok("lorem ipsum dolor", 20.0, 100.0, 80.0),
            tok("sit amet", 20.0, 60.0, 100.0),
        ];
        let (model, report) = reconstruct_statement(&[page(tokens)], &DetectorConfig::default());
        assert!(report.layout_unresolved());
        assert_eq!(model.unresolved().len(), 2);
        assert!(model.withdrawals().is_empty());
        assert!(model.deposits().is_empty());
    }

    #[test]
    fn test_empty_page_is_not_an_error() {
        let (model, report) = reconstruct_statement(&[page(vec![])], &DetectorConfig::default());
        assert_eq!(report.pages[0].rows, 0);
        assert!(model.withdrawals().is_empty());
    }

    #[test]
    fn test_reconstruction_is_deterministic() {
        let mut tokens = header_tokens(50.0);
        tokens.extend(data_tokens(80.0, "03/04", "COFFEE SHOP", "4.50", "", "1195.50"));
        let pages = [page(tokens)];
        let (a, _) = reconstruct_statement(&pages, &DetectorConfig::default());
        let (b, _) = reconstruct_statement(&pages, &DetectorConfig::default());
        assert_eq!(a.snapshot().withdrawals, b.snapshot().withdrawals);
        assert_eq!(a.snapshot().deposits, b.snapshot().deposits);
    }

    #[test]
    fn test_mapping_override_reassigns_role() {
        // Swap the auto-detected Withdrawal and Deposit columns.
        let mut tokens = header_tokens(50.0);
        tokens.extend(data_tokens(80.0, "03/04", "REFUND", "15.00", "", ""));
        let pages = [page(tokens)];

        let (model, _) = reassemble_with_mapping(
            &pages,
            &[(2, ColumnRole::Deposit), (3, ColumnRole::Withdrawal)],
            &DetectorConfig::default(),
        );
        assert_eq!(model.withdrawals().len(), 0);
        assert_eq!(model.deposits().len(), 1);
        assert_eq!(model.deposits().entries[0].txn.amount, 15.0);
    }
}
