//! Dashboard module
//!
//! Provides an overview page with spending charts, statistics, budget alerts
//! and an AI savings tip.

mod charts;
mod page;
mod savings_tip;
mod trends;

pub use page::{DashboardQuery, get_dashboard_page};
pub use savings_tip::{NO_EXPENSES_THIS_MONTH, get_monthly_advice, get_savings_tip};
