//! Row sink: where finished expenses are persisted.

use crate::error::Result;
use crate::models::receipt::Expense;

/// Header matching [`Expense::to_row`].
pub const EXPENSE_COLUMNS: [&str; 6] = ["date", "description", "amount", "currency", "category", "method"];

/// Appends one ordered record at a time.
pub trait RowSink {
    fn append(&mut self, columns: &[String]) -> Result<()>;
}

impl RowSink for Vec<Vec<String>> {
    fn append(&mut self, columns: &[String]) -> Result<()> {
        self.push(columns.to_vec());
        Ok(())
    }
}

/// Write an expense as one row.
pub fn record_expense<S: RowSink + ?Sized>(sink: &mut S, expense: &Expense) -> Result<()> {
    sink.append(&expense.to_row())
}
