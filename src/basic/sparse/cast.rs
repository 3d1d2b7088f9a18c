use nalgebra_sparse::CsrMatrix;
use num_traits::AsPrimitive;

/// Working precision of a factorization backend.
///
/// The public interface of every solver is `f64`; a backend may factorize and
/// solve in a narrower type and convert at the boundary.
pub trait Scalar: Copy + Default + Send + Sync + 'static {
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
    /// Short name used in log messages.
    const NAME: &'static str;
}

impl Scalar for f64 {
    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v
    }
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }
    const NAME: &'static str = "f64";
}

impl Scalar for f32 {
    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v.as_()
    }
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self.as_()
    }
    const NAME: &'static str = "f32";
}

pub(crate) trait Cast<T> {
    type Output;

    /// Converts the stored values into the target precision.
    fn cast(&self) -> Self::Output;
}

impl<T: Scalar> Cast<T> for CsrMatrix<f64> {
    type Output = Vec<T>;

    fn cast(&self) -> Self::Output {
        self.values().iter().map(|&x| T::from_f64(x)).collect()
    }
}

impl<T: Scalar> Cast<T> for [f64] {
    type Output = Vec<T>;

    fn cast(&self) -> Self::Output {
        self.iter().map(|&x| T::from_f64(x)).collect()
    }
}

/// Writes `src` into `dst`, widening back to `f64`.
#[inline(always)]
pub(crate) fn widen_into<T: Scalar>(src: &[T], dst: &mut [f64]) {
    dst.iter_mut().zip(src).for_each(|(d, s)| *d = s.to_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    #[test]
    fn test_cast_values_to_f32() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 1.5);
        coo.push(1, 1, 0.1);
        let csr = CsrMatrix::from(&coo);
        let v: Vec<f32> = Cast::<f32>::cast(&csr);
        assert_eq!(v, vec![1.5f32, 0.1f32]);
    }

    #[test]
    fn test_widen_round_trip_is_identity_for_f64() {
        let src = [1.0f64, -2.25, 3.125];
        let narrowed: Vec<f64> = Cast::<f64>::cast(&src[..]);
        let mut dst = [0.0; 3];
        widen_into(&narrowed, &mut dst);
        assert_eq!(dst, src);
        assert_eq!(<f32 as Scalar>::NAME, "f32");
    }
}
