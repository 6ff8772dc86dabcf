use crate::columns::is_date_shaped;
use crate::models::{Category, ColumnRole, Row, Transaction, UnresolvedKind};

/// Parse a currency cell: thousands separators, `$`, surrounding quotes and
/// spaces stripped; parentheses or a trailing minus mean negative.
/// `None` when the text is not a valid amount.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace(['$', ',', '"', ' '], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v.abs());
    }
    if let Some(lead) = s.strip_suffix('-') {
        return lead.trim().parse::<f64>().ok().map(|v| -v.abs());
    }
    s.parse().ok()
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

/// Normalize a date cell to YYYY-MM-DD when a full date can be read.
/// Day-first vs month-first ambiguity resolves month-first; an out-of-range
/// first component falls back to day-first.
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = raw.trim().trim_end_matches(',');

    // 2024-03-04 / 2024/03/04
    let ymd: Vec<&str> = s.split(['-', '/']).collect();
    if ymd.len() == 3 && ymd[0].len() == 4 {
        let y: i32 = ymd[0].parse().ok()?;
        let m: u32 = ymd[1].parse().ok()?;
        let d: u32 = ymd[2].parse().ok()?;
        return chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string());
    }

    // 03/04/2024, 3-4-24
    if ymd.len() == 3 {
        let a: u32 = ymd[0].parse().ok()?;
        let b: u32 = ymd[1].parse().ok()?;
        let mut y: i32 = ymd[2].parse().ok()?;
        if y < 100 {
            y += 2000;
        }
        let (m, d) = if a <= 12 { (a, b) } else { (b, a) };
        return chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string());
    }

    // Mar 4, 2024 / 4 Mar 2024
    let words: Vec<&str> = s
        .split([' ', ',', '.'])
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() == 3 {
        if let Some(m) = month_number(words[0]) {
            let d: u32 = words[1].parse().ok()?;
            let y: i32 = words[2].parse().ok()?;
            return chrono::NaiveDate::from_ymd_opt(y, m, d)
                .map(|dt| dt.format("%Y-%m-%d").to_string());
        }
        if let Some(m) = month_number(words[1]) {
            let d: u32 = words[0].parse().ok()?;
            let y: i32 = words[2].parse().ok()?;
            return chrono::NaiveDate::from_ymd_opt(y, m, d)
                .map(|dt| dt.format("%Y-%m-%d").to_string());
        }
    }

    None
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Statement-level context carried into each row's classification.
#[derive(Debug, Clone, Default)]
pub struct ClassifyContext {
    /// Balance of the previous classified row, for delta inference.
    pub prev_balance: Option<f64>,
    /// Most recent valid date, inherited by rows with an empty date cell.
    pub last_date: Option<String>,
    /// Whether the detected layout has a Deposit column. Without one the
    /// Withdrawal column is a single signed amount column and the value's
    /// sign decides the category.
    pub has_deposit_column: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Transaction(Transaction),
    Unresolved(UnresolvedKind),
}

fn transaction(
    row: &Row,
    date: String,
    amount: f64,
    category: Category,
    needs_review: bool,
) -> Classification {
    Classification::Transaction(Transaction {
        date,
        description: row.cell(ColumnRole::Description).to_string(),
        amount: round2(amount),
        category,
        needs_review,
        raw: row.clone(),
    })
}

/// Label a row as withdrawal or deposit and parse its amount.
///
/// Internal sign convention: withdrawals carry a non-positive amount,
/// deposits a non-negative one, regardless of how the cell displayed the
/// number.
pub fn classify_row(row: &Row, ctx: &ClassifyContext) -> Classification {
    let date_cell = row.cell(ColumnRole::Date);
    let date = if is_date_shaped(date_cell) {
        normalize_date(date_cell).unwrap_or_else(|| date_cell.to_string())
    } else {
        ctx.last_date.clone().unwrap_or_default()
    };

    let wd = row.cell(ColumnRole::Withdrawal);
    let dp = row.cell(ColumnRole::Deposit);

    match (!wd.is_empty(), !dp.is_empty()) {
        (true, true) => {
            // Shouldn't normally occur: prefer withdrawal, flag for review.
            match parse_amount(wd) {
                Some(v) => transaction(row, date, -v.abs(), Category::Withdrawal, true),
                None => Classification::Unresolved(UnresolvedKind::AmountParse),
            }
        }
        (true, false) => match parse_amount(wd) {
            Some(v) if !ctx.has_deposit_column && v > 0.0 => {
                // Single signed amount column: positive values are deposits.
                transaction(row, date, v, Category::Deposit, false)
            }
            Some(v) => transaction(row, date, -v.abs(), Category::Withdrawal, false),
            None => Classification::Unresolved(UnresolvedKind::AmountParse),
        },
        (false, true) => match parse_amount(dp) {
            // An explicitly negative deposit disagrees with its column.
            Some(v) => transaction(row, date, v.abs(), Category::Deposit, v < 0.0),
            None => Classification::Unresolved(UnresolvedKind::AmountParse),
        },
        (false, false) => {
            let balance = parse_amount(row.cell(ColumnRole::Balance));
            match (ctx.prev_balance, balance) {
                (Some(prev), Some(bal)) => {
                    let delta = round2(bal - prev);
                    if delta > 0.0 {
                        transaction(row, date, delta, Category::Deposit, false)
                    } else if delta < 0.0 {
                        transaction(row, date, delta, Category::Withdrawal, false)
                    } else {
                        Classification::Unresolved(UnresolvedKind::Classification)
                    }
                }
                _ => Classification::Unresolved(UnresolvedKind::Classification),
            }
        }
    }
}
