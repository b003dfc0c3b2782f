//! In-place radix-2 Cooley-Tukey FFT.

use std::f64::consts::PI;

/// Performs an in-place radix-2 Cooley-Tukey FFT.
/// `real` and `imag` must have the same power-of-2 length.
pub fn fft(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    debug_assert_eq!(n, imag.len());
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    // Reorder into bit-reversed index positions.
    let shift = usize::BITS - n.trailing_zeros();
    for i in 0..n {
        let r = i.reverse_bits() >> shift;
        if i < r {
            real.swap(i, r);
            imag.swap(i, r);
        }
    }

    // Butterfly stages of doubling span.
    let mut span = 2;
    while span <= n {
        let half = span / 2;
        let step = -2.0 * PI / span as f64;
        for base in (0..n).step_by(span) {
            for k in 0..half {
                let (sin, cos) = (step * k as f64).sin_cos();
                let lo = base + k;
                let hi = lo + half;

                let tr = cos * real[hi] - sin * imag[hi];
                let ti = cos * imag[hi] + sin * real[hi];
                real[hi] = real[lo] - tr;
                imag[hi] = imag[lo] - ti;
                real[lo] += tr;
                imag[lo] += ti;
            }
        }
        span *= 2;
    }
}
