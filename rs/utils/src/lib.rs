pub mod distance;
pub mod error;
pub mod kmeans;
pub mod test_utils;
