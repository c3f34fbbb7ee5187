//! Bracketed Halley iteration shared by the logicle-family transforms.
//!
//! Every forward evaluation of logicle and hyperlog is a root of a strictly
//! increasing function on a known bracket. Halley steps converge cubically
//! from a good start; any step that leaves the bracket falls back to
//! bisection, so the iteration always terminates inside the bracket.

/// Upper bound on iterations. Bisection alone halves the bracket each step,
/// so 200 steps exhaust `f64` resolution for any finite bracket.
const MAX_ITERATIONS: usize = 200;

/// Relative step tolerance, in units of machine epsilon.
pub(crate) const STEP_TOLERANCE: f64 = 4.0 * f64::EPSILON;

/// Value, first and second derivative of the function being solved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Evaluation {
    pub value: f64,
    pub slope: f64,
    pub curvature: f64,
}

/// Find `x` in `[lo, hi]` with `f(x) = 0`, where `f` is increasing,
/// `f(lo) <= 0 <= f(hi)`.
pub(crate) fn solve_increasing<F>(mut f: F, mut lo: f64, mut hi: f64, guess: f64) -> f64
where
    F: FnMut(f64) -> Evaluation,
{
    let mut x = if guess > lo && guess < hi {
        guess
    } else {
        0.5 * (lo + hi)
    };

    for _ in 0..MAX_ITERATIONS {
        let eval = f(x);
        if eval.value == 0.0 {
            return x;
        }
        if eval.value < 0.0 {
            lo = x;
        } else {
            hi = x;
        }

        let step = halley_step(eval);
        let mut next = x - step;
        if !next.is_finite() || next <= lo || next >= hi {
            next = 0.5 * (lo + hi);
        }

        let scale = next.abs().max(1.0);
        if (next - x).abs() <= STEP_TOLERANCE * scale || hi - lo <= STEP_TOLERANCE * scale {
            return next;
        }
        x = next;
    }
    x
}

fn halley_step(eval: Evaluation) -> f64 {
    let Evaluation {
        value,
        slope,
        curvature,
    } = eval;
    if slope == 0.0 {
        return f64::NAN;
    }
    let denominator = slope * (1.0 - value * curvature / (2.0 * slope * slope));
    value / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_cubic() {
        // x^3 - 8 = 0 on [0, 10]
        let root = solve_increasing(
            |x| Evaluation {
                value: x * x * x - 8.0,
                slope: 3.0 * x * x,
                curvature: 6.0 * x,
            },
            0.0,
            10.0,
            1.0,
        );
        assert!((root - 2.0).abs() < 1e-14);
    }

    #[test]
    fn bad_guess_falls_back_to_bisection() {
        let root = solve_increasing(
            |x| Evaluation {
                value: x.exp() - 3.0,
                slope: x.exp(),
                curvature: x.exp(),
            },
            -5.0,
            5.0,
            100.0,
        );
        assert!((root - 3f64.ln()).abs() < 1e-14);
    }
}
