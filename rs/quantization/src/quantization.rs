use utils::error::Result;

pub trait Quantizer {
    type QuantizedT;

    fn quantize(&self, value: &[f32]) -> Result<Vec<Self::QuantizedT>>;

    /// Number of codes produced per vector.
    fn quantized_dimension(&self) -> usize;

    /// Get the approximation of the original vector from the quantized vector.
    fn original_vector(&self, quantized_vector: &[Self::QuantizedT]) -> Result<Vec<f32>>;
}
