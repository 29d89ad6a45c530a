//! Projection steps: change the coordinate system of the space.
//!
//! - [`Quantization`] - integer re-quantization with an exact level lookup
//! - [`RandomEmbedding`] - REMBO / HesBO random embeddings, approximate inverse
//! - [`KernelPca`] - RBF kernel PCA for the surrogate only, no inverse

mod embedding;
mod kernel_pca;
mod quantization;

pub use embedding::{EmbeddingKind, RandomEmbedding};
pub use kernel_pca::KernelPca;
pub use quantization::Quantization;

/// Standard normal draw via the Box-Muller transform.
pub(crate) fn sample_standard_normal(rng: &mut fastrand::Rng) -> f64 {
    let u1 = rng.f64().max(f64::EPSILON);
    let u2 = rng.f64() * core::f64::consts::TAU;
    (-2.0 * u1.ln()).sqrt() * u2.cos()
}
