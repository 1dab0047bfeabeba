pub mod borrowing_operations;
pub mod borrowing_rate;
pub mod liquidation_calcs;
pub mod liquidation_operations;
#[cfg(test)]
mod tests_liquidations;
#[cfg(test)]
mod tests_redistribution;
#[cfg(test)]
pub mod tests_utils;
pub mod trove_manager;
pub mod types;
