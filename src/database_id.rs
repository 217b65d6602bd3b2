//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;
/// The ID of a row in the expense table.
pub type ExpenseID = DatabaseID;
/// The ID of a row in the budget table.
pub type BudgetID = DatabaseID;
/// The ID of a row in the category table.
pub type CategoryID = DatabaseID;
