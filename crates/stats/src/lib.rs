//! Statistical helper functions shared by the gridmatch crates.

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().sum();
    sum / data.len() as f64
}

/// Median of pre-sorted data. For even length, averages the middle two values.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn median(sorted: &[f64]) -> f64 {
    assert!(!sorted.is_empty(), "median: input must not be empty");
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Single-pass mean and sample variance (Welford's algorithm).
///
/// Lets callers compute the variance of a column spread across several
/// matrices without concatenating them first.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningVariance {
    n: usize,
    mean: f64,
    m2: f64,
}

impl RunningVariance {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation.
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Number of observations seen so far.
    pub fn count(&self) -> usize {
        self.n
    }

    /// Mean of the observations. Returns 0.0 if empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance with N-1 denominator. Returns 0.0 if fewer than 2 observations.
    pub fn variance(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        self.m2 / (self.n - 1) as f64
    }
}

/// Location and spread of a set of distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of finite values summarised.
    pub count: usize,
    /// Number of NaN values skipped.
    pub n_nan: usize,
    /// Smallest finite value.
    pub min: f64,
    /// Largest finite value.
    pub max: f64,
    /// Mean of the finite values.
    pub mean: f64,
    /// Median of the finite values.
    pub median: f64,
}

/// Summarises the non-NaN values of `data`.
///
/// Returns `None` if there is no non-NaN value.
pub fn summarize(data: &[f64]) -> Option<Summary> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(Summary {
        count: sorted.len(),
        n_nan: data.len() - sorted.len(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean: mean(&sorted),
        median: median(&sorted),
    })
}
