use crate::columns::DetectorConfig;
use crate::error::Result;
use crate::fmt::money;
use crate::models::{PageTokens, Token};
use crate::reconstruct::reconstruct_statement;
use crate::render::format_statement;

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;

struct DemoRow {
    date: &'static str,
    description: &'static str,
    withdrawal: &'static str,
    deposit: &'static str,
    balance: &'static str,
}

const PAGE_ONE: &[DemoRow] = &[
    DemoRow { date: "03/01/2024", description: "OPENING BALANCE", withdrawal: "", deposit: "", balance: "1,200.00" },
    DemoRow { date: "03/04", description: "COFFEE SHOP", withdrawal: "4.50", deposit: "", balance: "1,195.50" },
    DemoRow { date: "03/05", description: "PAYROLL ACME LLC", withdrawal: "", deposit: "2,500.00", balance: "3,695.50" },
    DemoRow { date: "", description: "DIRECT DEPOSIT", withdrawal: "", deposit: "", balance: "" },
    DemoRow { date: "03/08", description: "GROCERY MART", withdrawal: "82.13", deposit: "", balance: "3,613.37" },
];

const PAGE_TWO: &[DemoRow] = &[
    DemoRow { date: "03/12", description: "TRANSFER TO SAVINGS", withdrawal: "500.00", deposit: "", balance: "3,113.37" },
    DemoRow { date: "03/15", description: "INTEREST EARNED", withdrawal: "", deposit: "", balance: "3,114.12" },
    DemoRow { date: "03/28", description: "UTILITY POWER CO", withdrawal: "96.40", deposit: "", balance: "3,017.72" },
];

fn tok(text: &str, x: f64, width: f64, y: f64) -> Token {
    Token {
        text: text.to_string(),
        x,
        y,
        width,
        height: 10.0,
    }
}

fn header(y: f64, tokens: &mut Vec<Token>) {
    tokens.push(tok("Date", 20.0, 40.0, y));
    tokens.push(tok("Description", 100.0, 80.0, y));
    tokens.push(tok("Withdrawal", 310.0, 70.0, y));
    tokens.push(tok("Deposit", 430.0, 60.0, y));
    tokens.push(tok("Balance", 530.0, 60.0, y));
}

fn page(rows: &[DemoRow]) -> PageTokens {
    let mut tokens = Vec::new();
    header(50.0, &mut tokens);
    for (i, row) in rows.iter().enumerate() {
        let y = 80.0 + i as f64 * 20.0;
        if !row.date.is_empty() {
            tokens.push(tok(row.date, 20.0, 50.0, y));
        }
        tokens.push(tok(row.description, 100.0, 120.0, y));
        if !row.withdrawal.is_empty() {
            tokens.push(tok(row.withdrawal, 320.0, 40.0, y));
        }
        if !row.deposit.is_empty() {
            tokens.push(tok(row.deposit, 440.0, 50.0, y));
        }
        if !row.balance.is_empty() {
            tokens.push(tok(row.balance, 540.0, 50.0, y));
        }
    }
    PageTokens {
        tokens,
        page_width: PAGE_WIDTH,
        page_height: PAGE_HEIGHT,
    }
}

pub fn demo_pages() -> Vec<PageTokens> {
    vec![page(PAGE_ONE), page(PAGE_TWO)]
}

/// Reconstruct a built-in two-page sample statement and print the result.
pub fn run() -> Result<()> {
    let pages = demo_pages();
    let (model, report) = reconstruct_statement(&pages, &DetectorConfig::default());

    println!("Sample statement: {} pages", report.pages.len());
    print!("{}", format_statement(&model));

    let totals = model.totals();
    println!(
        "Withdrawals {} / Deposits {}",
        money(totals.withdrawals),
        money(totals.deposits)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::reconstruct_statement;

    #[test]
    fn test_demo_statement_reconstructs_cleanly() {
        let (model, report) = reconstruct_statement(&demo_pages(), &DetectorConfig::default());
        assert!(!report.layout_unresolved());
        assert!(model.unresolved().is_empty());

        // Opening-balance row is furniture; interest row comes from the
        // balance delta; continuation line folds into the payroll row.
        assert_eq!(model.withdrawals().len(), 4);
        assert_eq!(model.deposits().len(), 2);
        assert_eq!(model.withdrawals().total, 683.03);
        assert_eq!(model.deposits().total, 2500.75);

        let payroll = &model.deposits().entries[0].txn;
        assert_eq!(payroll.description, "PAYROLL ACME LLC DIRECT DEPOSIT");
    }
}
