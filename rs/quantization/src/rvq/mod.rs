pub mod rvq;
pub mod rvq_builder;
