pub mod redemption_operations;
pub mod types;
