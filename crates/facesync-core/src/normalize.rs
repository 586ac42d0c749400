//! Batch normalization for the embedding model input.
//!
//! Stacks per-image (H, W, C) arrays into one (N, H, W, C) tensor and rescales
//! it with a single mean and standard deviation over every element of the
//! batch. Not per-channel, not per-image.

use ndarray::{Array4, ArrayBase, ArrayView3, Axis, Data, Ix3};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("cannot normalize an empty batch")]
    EmptyBatch,
    #[error("image {index} has shape {found:?}, expected {expected:?} like the first image")]
    ShapeMismatch {
        index: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("degenerate batch: every pixel equals {mean}, standard deviation is zero")]
    DegenerateBatch { mean: f32 },
    #[error("failed to stack batch: {0}")]
    Stack(#[from] ndarray::ShapeError),
}

/// Stack `pixel_arrays` and rescale every element as `(x - mean) / std`.
///
/// Takes owned arrays or views; the inputs are only read while stacking.
pub fn normalize<S>(pixel_arrays: &[ArrayBase<S, Ix3>]) -> Result<Array4<f32>, NormalizeError>
where
    S: Data<Elem = u8>,
{
    let first = pixel_arrays.first().ok_or(NormalizeError::EmptyBatch)?;
    let expected = first.shape();
    if let Some((index, found)) = pixel_arrays
        .iter()
        .enumerate()
        .find(|(_, a)| a.shape() != expected)
    {
        return Err(NormalizeError::ShapeMismatch {
            index,
            expected: expected.to_vec(),
            found: found.shape().to_vec(),
        });
    }

    let views: Vec<ArrayView3<'_, u8>> = pixel_arrays.iter().map(|a| a.view()).collect();
    let batch = ndarray::stack(Axis(0), &views)?.mapv(f32::from);

    // Accumulate in f64; a large u8 batch loses precision summed in f32.
    let n = batch.len() as f64;
    let mean = batch.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = batch.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();

    if std == 0.0 {
        return Err(NormalizeError::DegenerateBatch { mean: mean as f32 });
    }

    tracing::debug!(
        images = pixel_arrays.len(),
        shape = ?batch.shape(),
        mean,
        std,
        "normalized batch"
    );

    let (mean, std) = (mean as f32, std as f32);
    Ok(batch.mapv_into(|x| (x - mean) / std))
}
