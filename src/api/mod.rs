//! Remote source for the paginated API.

pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
