//! # Parameter series
//!
//! The two horizon-length series of guidance parameters kept between
//! adaptation ticks.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Desired speed and look-ahead distance over the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct MppiSeries {
    pub speed_ms: Vec<f64>,
    pub look_ahead_m: Vec<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MppiSeries {
    /// Create series of length `len` holding constant values.
    pub fn new(len: usize, speed_ms: f64, look_ahead_m: f64) -> Self {
        Self {
            speed_ms: vec![speed_ms; len],
            look_ahead_m: vec![look_ahead_m; len]
        }
    }

    pub fn len(&self) -> usize {
        self.speed_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speed_ms.is_empty()
    }

    /// The first sample of each series, `None` if the series are empty.
    pub fn first(&self) -> Option<(f64, f64)> {
        Some((*self.speed_ms.first()?, *self.look_ahead_m.first()?))
    }

    /// Advance both series by one sample.
    pub fn shift_append(&mut self) {
        shift_append(&mut self.speed_ms);
        shift_append(&mut self.look_ahead_m);
    }

    /// Raise every element to at least the given minimums.
    pub fn clamp_min(&mut self, min_speed_ms: f64, min_look_ahead_m: f64) {
        self.speed_ms.iter_mut().for_each(|u| *u = u.max(min_speed_ms));
        self.look_ahead_m.iter_mut().for_each(|u| *u = u.max(min_look_ahead_m));
    }

    /// Low-pass filter both series along the horizon.
    ///
    /// `alpha` is the ratio of the sample time to the filter time constant
    /// and must lie in (0, 1].
    pub fn low_pass(&mut self, alpha: f64) {
        low_pass(&mut self.speed_ms, alpha);
        low_pass(&mut self.look_ahead_m, alpha);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Shift the series left by one sample and append the midpoint of the
/// maximum and minimum of the shifted samples.
///
/// The length is preserved. An empty series is left unchanged.
pub fn shift_append(series: &mut [f64]) {
    let n = series.len();
    if n == 0 {
        return
    }

    series.copy_within(1.., 0);

    let rest = &series[..n - 1];
    if !rest.is_empty() {
        let max = rest.iter().cloned().fold(std::f64::NEG_INFINITY, f64::max);
        let min = rest.iter().cloned().fold(std::f64::INFINITY, f64::min);
        series[n - 1] = 0.5 * (max + min);
    }
}

/// First-order low-pass filter along the series, applied in place so each
/// sample is filtered against the already filtered previous sample.
fn low_pass(series: &mut [f64], alpha: f64) {
    for i in 1..series.len() {
        series[i] = series[i - 1] + alpha * (series[i] - series[i - 1]);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shift_append() {
        let mut s = vec![1.0, 5.0, 2.0, 4.0];
        shift_append(&mut s);

        // Shifted samples are 5, 2, 4
        assert_eq!(s, vec![5.0, 2.0, 4.0, 3.5]);

        for _ in 0..20 {
            shift_append(&mut s);
            assert_eq!(s.len(), 4);
        }
    }

    #[test]
    fn test_shift_append_short() {
        let mut empty: Vec<f64> = vec![];
        shift_append(&mut empty);
        assert!(empty.is_empty());

        let mut one = vec![2.0];
        shift_append(&mut one);
        assert_eq!(one, vec![2.0]);
    }

    #[test]
    fn test_clamp_min() {
        let mut s = MppiSeries {
            speed_ms: vec![0.5, 3.0],
            look_ahead_m: vec![10.0, 0.1]
        };
        s.clamp_min(1.0, 2.0);

        assert_eq!(s.speed_ms, vec![1.0, 3.0]);
        assert_eq!(s.look_ahead_m, vec![10.0, 2.0]);
    }

    #[test]
    fn test_low_pass() {
        let mut s = vec![0.0, 10.0, 10.0];
        low_pass(&mut s, 0.5);
        assert_eq!(s, vec![0.0, 5.0, 7.5]);

        // Unity ratio passes the series through
        let mut s = vec![0.0, 10.0, 10.0];
        low_pass(&mut s, 1.0);
        assert_eq!(s, vec![0.0, 10.0, 10.0]);
    }
}
