use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A fragment of extracted text with page-relative position and size.
/// Origin is top-left; y grows downward.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Token {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Wire format for one extracted token: corner coordinates, not extents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawToken {
    pub text: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Wire format for one page of extractor output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    pub tokens: Vec<RawToken>,
    pub page_width: f64,
    pub page_height: f64,
}

/// One page of tokens ready for reconstruction.
#[derive(Debug, Clone)]
pub struct PageTokens {
    pub tokens: Vec<Token>,
    pub page_width: f64,
    pub page_height: f64,
}

impl From<RawPage> for PageTokens {
    fn from(raw: RawPage) -> Self {
        let tokens = raw
            .tokens
            .into_iter()
            .map(|t| Token {
                text: t.text,
                x: t.x0.min(t.x1),
                y: t.y0.min(t.y1),
                width: (t.x1 - t.x0).abs(),
                height: (t.y1 - t.y0).abs(),
            })
            .collect();
        PageTokens {
            tokens,
            page_width: raw.page_width,
            page_height: raw.page_height,
        }
    }
}

/// One visual row of text: tokens sharing a vertical band, left-to-right.
#[derive(Debug, Clone)]
pub struct Line {
    pub tokens: Vec<Token>,
}

impl Line {
    /// Vertical centroid of the line's tokens.
    pub fn center_y(&self) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        self.tokens.iter().map(Token::center_y).sum::<f64>() / self.tokens.len() as f64
    }

    pub fn text(&self) -> String {
        let parts: Vec<&str> = self.tokens.iter().map(|t| t.text.as_str()).collect();
        parts.join(" ")
    }
}

/// Semantic role of a horizontal band of the page.
///
/// Closed set: downstream code must handle `Unknown` rather than assume
/// full classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Date,
    Description,
    Withdrawal,
    Deposit,
    Balance,
    Unknown,
}

impl ColumnRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Description => "Description",
            Self::Withdrawal => "Withdrawal",
            Self::Deposit => "Deposit",
            Self::Balance => "Balance",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_amount(&self) -> bool {
        matches!(self, Self::Withdrawal | Self::Deposit | Self::Balance)
    }
}

/// A horizontal band of the page assigned a semantic role.
///
/// Adjacent specs share a boundary; together they cover the full page width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub role: ColumnRole,
    pub x_start: f64,
    pub x_end: f64,
}

impl ColumnSpec {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x_start && x < self.x_end
    }
}

/// Raw per-transaction data aligned to columns, pre-classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: BTreeMap<ColumnRole, String>,
    pub source_line: usize,
}

impl Row {
    pub fn cell(&self, role: ColumnRole) -> &str {
        self.cells.get(&role).map(String::as_str).unwrap_or("")
    }

    pub fn set_cell(&mut self, role: ColumnRole, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.cells.remove(&role);
        } else {
            self.cells.insert(role, text.to_string());
        }
    }

    /// Append text to a cell, space-separated (continuation lines).
    pub fn append_cell(&mut self, role: ColumnRole, text: &str) {
        let entry = self.cells.entry(role).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Withdrawal,
    Deposit,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Withdrawal => "Withdrawals",
            Self::Deposit => "Deposits",
        }
    }

    /// Column whose cell carries this category's amount.
    pub fn amount_role(&self) -> ColumnRole {
        match self {
            Self::Withdrawal => ColumnRole::Withdrawal,
            Self::Deposit => ColumnRole::Deposit,
        }
    }
}

/// A classified, amount-signed financial entry derived from a Row.
///
/// Invariant: `category == Withdrawal` implies `amount <= 0`,
/// `category == Deposit` implies `amount >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub category: Category,
    pub needs_review: bool,
    pub raw: Row,
}

/// Why a row could not be turned into a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedKind {
    /// Category ambiguous: no amount cell and no usable balance delta.
    Classification,
    /// An amount cell held text that is not a valid currency value.
    AmountParse,
    /// The page's columns could not be resolved; cells are Unknown only.
    Layout,
}

/// A row kept for manual user assignment, never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedRow {
    pub id: u64,
    pub row: Row,
    pub kind: UnresolvedKind,
}

/// One classified entry inside a table, addressable for edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub id: u64,
    pub txn: Transaction,
}

/// An ordered run of transactions of one category plus its running total.
///
/// Invariant: `total` equals the sum of the entries' absolute amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTable {
    pub category: Category,
    pub entries: Vec<TableEntry>,
    pub total: f64,
}

impl TransactionTable {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: Vec::new(),
            total: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
