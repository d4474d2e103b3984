//! Generalized (f-)means.
//!
//! An f-mean transforms every value with an invertible function `f`, takes
//! the arithmetic mean of the results and maps it back with `f⁻¹`:
//!
//! ```text
//! M_f(x₁ … xₙ) = f⁻¹( (f(x₁) + … + f(xₙ)) / n )
//! ```
//!
//! With `f(x) = 1/x` ([`Reciprocal`]) this is the harmonic mean, which is
//! pulled towards the smallest values.  The pipeline uses it for every
//! distance aggregate so a few near returns in a cell or blob dominate many
//! far ones.

/// An invertible function used for generalized f-means.
pub trait Bijection {
    fn forward(&self, x: f32) -> f32;
    fn inverse(&self, y: f32) -> f32;
}

/// `f(x) = 1/x`; its f-mean is the harmonic mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reciprocal;

impl Bijection for Reciprocal {
    fn forward(&self, x: f32) -> f32 {
        1.0 / x
    }

    fn inverse(&self, y: f32) -> f32 {
        1.0 / y
    }
}

/// `f(x) = x`; its f-mean is the arithmetic mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl Bijection for Identity {
    fn forward(&self, x: f32) -> f32 {
        x
    }

    fn inverse(&self, y: f32) -> f32 {
        y
    }
}

/// Compute the f-mean of `values`, where `transform` represents `f`.
///
/// Returns `None` for an empty sequence.  Float semantics apply otherwise:
/// under [`Reciprocal`] a zero value contributes `+inf`, which makes the
/// whole mean `0.0`.
pub fn generalized_mean<I, B>(values: I, transform: &B) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
    B: Bijection + ?Sized,
{
    let mut sum = 0.0f32;
    let mut size = 0usize;
    for v in values {
        sum += transform.forward(v);
        size += 1;
    }
    if size == 0 {
        return None;
    }
    Some(transform.inverse(sum / size as f32))
}
