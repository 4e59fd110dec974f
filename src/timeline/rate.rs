use crate::foundation::error::IndexError;

/// Sampling rates recorded matches are known to use, in ticks per second.
pub const SUPPORTED_TICK_RATES: [u32; 2] = [64, 128];

/// Relative tolerance between the median tick delta and a supported tick period.
pub const RATE_TOLERANCE: f64 = 0.05;

/// Minimum fraction of tick deltas that must sit within [`RATE_TOLERANCE`] of the detected period.
pub const RATE_CONSISTENCY: f64 = 0.9;

/// Detected sampling rate of a timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TickRate(pub u32);

impl TickRate {
    /// Ticks per second.
    pub fn per_sec(self) -> f64 {
        f64::from(self.0)
    }

    /// Duration of one tick in seconds.
    pub fn period_secs(self) -> f64 {
        1.0 / self.per_sec()
    }

    /// Ticks spanned by `secs` seconds, rounded to nearest.
    pub fn secs_to_ticks(self, secs: f64) -> u64 {
        crate::foundation::math::secs_to_ticks_round(secs, self.per_sec())
    }

    /// Seconds spanned by `ticks` ticks.
    pub fn ticks_to_secs(self, ticks: u64) -> f64 {
        ticks as f64 / self.per_sec()
    }
}

/// Infer the tick rate from tick timestamps (seconds, strictly increasing).
///
/// The median of consecutive deltas must fall within [`RATE_TOLERANCE`] of the period of one of
/// [`SUPPORTED_TICK_RATES`], and at least [`RATE_CONSISTENCY`] of all deltas must fall within the
/// same tolerance of that period. Anything else is reported as [`IndexError::AmbiguousRate`].
pub fn detect_tick_rate(times: &[f64]) -> Result<TickRate, IndexError> {
    if times.len() < 2 {
        return Err(IndexError::Empty {
            min: 2,
            got: times.len(),
        });
    }

    let deltas: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let median = median(&deltas);
    if !median.is_finite() || median <= 0.0 {
        return Err(IndexError::AmbiguousRate {
            median_secs: median,
            consistent: 0.0,
        });
    }

    let Some(rate) = SUPPORTED_TICK_RATES
        .iter()
        .copied()
        .map(TickRate)
        .find(|r| near_period(median, r.period_secs()))
    else {
        return Err(IndexError::AmbiguousRate {
            median_secs: median,
            consistent: 0.0,
        });
    };

    let period = rate.period_secs();
    let on_period = deltas.iter().filter(|&&d| near_period(d, period)).count();
    let consistent = on_period as f64 / deltas.len() as f64;
    if consistent < RATE_CONSISTENCY {
        tracing::warn!(
            rate = rate.0,
            median_secs = median,
            consistent,
            "tick deltas too irregular to trust the median"
        );
        return Err(IndexError::AmbiguousRate {
            median_secs: median,
            consistent,
        });
    }
    Ok(rate)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn near_period(delta: f64, period: f64) -> bool {
    ((delta - period) / period).abs() <= RATE_TOLERANCE
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/rate.rs"]
mod tests;
