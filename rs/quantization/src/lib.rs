pub mod quantization;
pub mod rvq;
