pub mod availability;
pub mod eligibility;
pub mod rank_table;
