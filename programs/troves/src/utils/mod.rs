pub mod bn;
pub mod consts;
pub mod coretypes;
pub mod finance;
#[macro_use]
pub mod macros;
pub mod math;
pub mod oracle;
#[cfg(test)]
mod tests_finance;
