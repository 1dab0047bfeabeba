pub mod stability_pool_operations;
#[cfg(test)]
mod tests_front_ends;
#[cfg(test)]
pub mod tests_utils;
pub mod types;
