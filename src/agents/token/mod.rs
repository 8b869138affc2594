//! Budgets that bound an agent turn

mod budget;

pub use budget::{BudgetLimit, TurnBudget};
