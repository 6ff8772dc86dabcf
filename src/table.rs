use serde::Serialize;

use crate::classify::{classify_row, Classification, ClassifyContext};
use crate::error::{Result, TellerError};
use crate::models::{
    Category, ColumnRole, Row, TableEntry, Transaction, TransactionTable, UnresolvedKind,
    UnresolvedRow,
};

/// Totals delivered to change listeners after every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalsSnapshot {
    pub withdrawals: f64,
    pub deposits: f64,
    pub revision: u64,
}

pub type ChangeListener = Box<dyn FnMut(TotalsSnapshot)>;

/// Output contract consumed by presentation and export collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct StatementTables {
    pub withdrawals: TransactionTable,
    pub deposits: TransactionTable,
    pub unresolved: Vec<UnresolvedRow>,
}

/// Owns the two classified tables plus the unresolved side-list.
///
/// All edits go through here; totals are recomputed before any mutating
/// call returns, so observers never see a stale total.
pub struct TableModel {
    withdrawals: TransactionTable,
    deposits: TransactionTable,
    unresolved: Vec<UnresolvedRow>,
    has_deposit_column: bool,
    next_id: u64,
    revision: u64,
    listeners: Vec<ChangeListener>,
}

impl Default for TableModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TableModel {
    pub fn new() -> Self {
        Self {
            withdrawals: TransactionTable::new(Category::Withdrawal),
            deposits: TransactionTable::new(Category::Deposit),
            unresolved: Vec::new(),
            has_deposit_column: true,
            next_id: 1,
            revision: 0,
            listeners: Vec::new(),
        }
    }

    /// Record whether the detected layout carries a Deposit column; single
    /// signed-amount layouts classify edited cells by sign.
    pub fn set_has_deposit_column(&mut self, has: bool) {
        self.has_deposit_column = has;
    }

    pub fn withdrawals(&self) -> &TransactionTable {
        &self.withdrawals
    }

    pub fn deposits(&self) -> &TransactionTable {
        &self.deposits
    }

    pub fn unresolved(&self) -> &[UnresolvedRow] {
        &self.unresolved
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn totals(&self) -> TotalsSnapshot {
        TotalsSnapshot {
            withdrawals: self.withdrawals.total,
            deposits: self.deposits.total,
            revision: self.revision,
        }
    }

    pub fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    pub fn snapshot(&self) -> StatementTables {
        StatementTables {
            withdrawals: self.withdrawals.clone(),
            deposits: self.deposits.clone(),
            unresolved: self.unresolved.clone(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn table_mut(&mut self, category: Category) -> &mut TransactionTable {
        match category {
            Category::Withdrawal => &mut self.withdrawals,
            Category::Deposit => &mut self.deposits,
        }
    }

    pub fn add_transaction(&mut self, txn: Transaction) -> u64 {
        let id = self.next_id();
        self.table_mut(txn.category)
            .entries
            .push(TableEntry { id, txn });
        self.recompute_totals();
        id
    }

    pub fn add_unresolved(&mut self, row: Row, kind: UnresolvedKind) -> u64 {
        let id = self.next_id();
        self.unresolved.push(UnresolvedRow { id, row, kind });
        self.recompute_totals();
        id
    }

    /// Append an empty editable row to one of the tables.
    pub fn add_blank_row(&mut self, category: Category) -> u64 {
        let txn = Transaction {
            date: String::new(),
            description: String::new(),
            amount: 0.0,
            category,
            needs_review: false,
            raw: Row::default(),
        };
        self.add_transaction(txn)
    }

    /// Overwrite one cell and re-run classification for that row only.
    /// The row moves between tables (or to the unresolved list) when its
    /// classification changes.
    pub fn edit_cell(&mut self, row_id: u64, role: ColumnRole, new_text: &str) -> Result<()> {
        let mut row = self
            .take_row(row_id)
            .ok_or(TellerError::UnknownRow(row_id))?;
        row.set_cell(role, new_text);
        self.place(row_id, row);
        self.recompute_totals();
        Ok(())
    }

    /// Manually assign a row to a category, correcting a misclassification.
    pub fn move_row(&mut self, row_id: u64, target: Category) -> Result<()> {
        let row = self
            .take_row(row_id)
            .ok_or(TellerError::UnknownRow(row_id))?;

        let amount_cell = [
            target.amount_role(),
            ColumnRole::Withdrawal,
            ColumnRole::Deposit,
            ColumnRole::Unknown,
        ]
        .into_iter()
        .find_map(|r| crate::classify::parse_amount(row.cell(r)));

        let (amount, needs_review) = match amount_cell {
            Some(v) => {
                let v = v.abs();
                match target {
                    Category::Withdrawal => (-v, false),
                    Category::Deposit => (v, false),
                }
            }
            // No parseable amount yet: keep the row, let the user fill it in.
            None => (0.0, true),
        };

        let date_cell = row.cell(ColumnRole::Date).to_string();
        let txn = Transaction {
            date: crate::classify::normalize_date(&date_cell).unwrap_or(date_cell),
            description: row.cell(ColumnRole::Description).to_string(),
            amount,
            category: target,
            needs_review,
            raw: row,
        };
        self.table_mut(target).entries.push(TableEntry { id: row_id, txn });
        self.recompute_totals();
        Ok(())
    }

    pub fn delete_row(&mut self, row_id: u64) -> Result<()> {
        self.take_row(row_id)
            .ok_or(TellerError::UnknownRow(row_id))?;
        self.recompute_totals();
        Ok(())
    }

    /// Remove a row from whichever table holds it, returning its raw cells.
    fn take_row(&mut self, row_id: u64) -> Option<Row> {
        for table in [&mut self.withdrawals, &mut self.deposits] {
            if let Some(pos) = table.entries.iter().position(|e| e.id == row_id) {
                return Some(table.entries.remove(pos).txn.raw);
            }
        }
        if let Some(pos) = self.unresolved.iter().position(|u| u.id == row_id) {
            return Some(self.unresolved.remove(pos).row);
        }
        None
    }

    /// Re-classify an edited row and file it where it now belongs.
    /// Single-row reclassification has no reliable neighbor, so balance
    /// delta and date carry are not applied here.
    fn place(&mut self, row_id: u64, row: Row) {
        let ctx = ClassifyContext {
            prev_balance: None,
            last_date: None,
            has_deposit_column: self.has_deposit_column,
        };
        match classify_row(&row, &ctx) {
            Classification::Transaction(txn) => {
                self.table_mut(txn.category)
                    .entries
                    .push(TableEntry { id: row_id, txn });
            }
            Classification::Unresolved(kind) => {
                self.unresolved.push(UnresolvedRow {
                    id: row_id,
                    row,
                    kind,
                });
            }
        }
    }

    /// Totals are the sums of absolute amounts, recomputed eagerly after
    /// every mutation; listeners are notified with the fresh snapshot.
    fn recompute_totals(&mut self) {
        for table in [&mut self.withdrawals, &mut self.deposits] {
            let sum: f64 = table.entries.iter().map(|e| e.txn.amount.abs()).sum();
            table.total = (sum * 100.0).round() / 100.0;
        }
        self.revision += 1;
        let snapshot = self.totals();
        for listener in &mut self.listeners {
            listener(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn txn(date: &str, desc: &str, amount: f64, category: Category) -> Transaction {
        let mut raw = Row::default();
        raw.set_cell(ColumnRole::Date, date);
        raw.set_cell(ColumnRole::Description, desc);
        raw.set_cell(category.amount_role(), &format!("{:.2}", amount.abs()));
        Transaction {
            date: date.to_string(),
            description: desc.to_string(),
            amount,
            category,
            needs_review: false,
            raw,
        }
    }

    fn seeded() -> (TableModel, u64, u64) {
        let mut model = TableModel::new();
        let w = model.add_transaction(txn("2024-03-04", "COFFEE SHOP", -4.50, Category::Withdrawal));
        let d = model.add_transaction(txn("2024-03-05", "PAYROLL", 2500.0, Category::Deposit));
        (model, w, d)
    }

    #[test]
    fn test_totals_are_absolute_sums() {
        let (model, _, _) = seeded();
        assert_eq!(model.withdrawals().total, 4.50);
        assert_eq!(model.deposits().total, 2500.0);
    }

    #[test]
    fn test_sign_category_agreement_held() {
        let (model, _, _) = seeded();
        for e in &model.withdrawals().entries {
            assert!(e.txn.amount <= 0.0);
        }
        for e in &model.deposits().entries {
            assert!(e.txn.amount >= 0.0);
        }
    }

    #[test]
    fn test_edit_cell_updates_amount_and_total() {
        let (mut model, w, _) = seeded();
        model.edit_cell(w, ColumnRole::Withdrawal, "10.00").unwrap();
        assert_eq!(model.withdrawals().total, 10.0);
        assert_eq!(model.withdrawals().entries[0].txn.amount, -10.0);
    }

    #[test]
    fn test_edit_cell_moves_row_between_tables() {
        // Clearing the withdrawal cell then filling the deposit cell must
        // land the row in deposits with no duplicate left behind.
        let (mut model, w, _) = seeded();
        model.edit_cell(w, ColumnRole::Withdrawal, "").unwrap();
        assert_eq!(model.withdrawals().len(), 0);
        assert_eq!(model.withdrawals().total, 0.0);
        assert_eq!(model.unresolved().len(), 1);

        model.edit_cell(w, ColumnRole::Deposit, "50.00").unwrap();
        assert!(model.unresolved().is_empty());
        assert_eq!(model.deposits().len(), 2);
        assert_eq!(model.deposits().total, 2550.0);
        let moved = model.deposits().entries.iter().find(|e| e.id == w).unwrap();
        assert_eq!(moved.txn.amount, 50.0);
        assert_eq!(moved.txn.description, "COFFEE SHOP");
    }

    #[test]
    fn test_edit_cell_unknown_row_errors() {
        let (mut model, _, _) = seeded();
        let err = model.edit_cell(999, ColumnRole::Deposit, "1.00");
        assert!(matches!(err, Err(TellerError::UnknownRow(999))));
    }

    #[test]
    fn test_move_row_flips_category_and_sign() {
        let (mut model, w, _) = seeded();
        model.move_row(w, Category::Deposit).unwrap();
        assert_eq!(model.withdrawals().len(), 0);
        let moved = model.deposits().entries.iter().find(|e| e.id == w).unwrap();
        assert_eq!(moved.txn.amount, 4.50);
        assert_eq!(model.deposits().total, 2504.50);
    }

    #[test]
    fn test_move_row_resolves_manual_assignment() {
        let mut model = TableModel::new();
        let mut row = Row::default();
        row.set_cell(ColumnRole::Description, "MYSTERY CHARGE");
        row.set_cell(ColumnRole::Unknown, "12.00");
        let id = model.add_unresolved(row, UnresolvedKind::Classification);

        model.move_row(id, Category::Withdrawal).unwrap();
        assert!(model.unresolved().is_empty());
        let e = &model.withdrawals().entries[0];
        assert_eq!(e.txn.amount, -12.0);
        assert_eq!(model.withdrawals().total, 12.0);
    }

    #[test]
    fn test_delete_row_updates_totals() {
        let (mut model, w, _) = seeded();
        model.delete_row(w).unwrap();
        assert_eq!(model.withdrawals().len(), 0);
        assert_eq!(model.withdrawals().total, 0.0);
    }

    #[test]
    fn test_add_blank_row_keeps_invariant() {
        let (mut model, _, _) = seeded();
        model.add_blank_row(Category::Deposit);
        assert_eq!(model.deposits().len(), 2);
        assert_eq!(model.deposits().total, 2500.0);
    }

    #[test]
    fn test_listeners_see_fresh_totals() {
        let seen: Rc<RefCell<Vec<TotalsSnapshot>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut model = TableModel::new();
        model.subscribe(Box::new(move |s| sink.borrow_mut().push(s)));

        let w = model.add_transaction(txn("2024-03-04", "COFFEE", -4.50, Category::Withdrawal));
        model.edit_cell(w, ColumnRole::Withdrawal, "6.00").unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].withdrawals, 4.50);
        assert_eq!(seen[1].withdrawals, 6.0);
        assert!(seen[1].revision > seen[0].revision);
    }

    #[test]
    fn test_revision_bumps_on_every_mutation() {
        let (mut model, w, _) = seeded();
        let before = model.revision();
        model.move_row(w, Category::Deposit).unwrap();
        assert!(model.revision() > before);
    }
}
