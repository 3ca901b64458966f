//! Billing of ended sessions

/// Seconds per billed hour
pub const SECS_PER_HOUR: f64 = 3600.0;

/// Amount owed for a session, both figures rounded to cents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bill {
    pub total_hours: f64,
    pub total_cost: f64,
}

impl Bill {
    /// Bill `total_time` seconds at `rate` per hour.
    ///
    /// Cost is computed from the unrounded hours; each figure is rounded
    /// independently.
    pub fn compute(total_time: f64, rate: f64) -> Self {
        let hours = total_time / SECS_PER_HOUR;
        Self {
            total_hours: round_cents(hours),
            total_cost: round_cents(hours * rate),
        }
    }
}

/// Scale used to snap a cent amount to its nearest decimal value before rounding
const CENT_SNAP: f64 = 1e6;

/// Round to two decimals, decimal halves going up.
///
/// `1.005 * 100.0` is `100.49999999999999` in binary, so the scaled value is
/// snapped to six decimals first and a decimal half stays a half.
pub fn round_cents(value: f64) -> f64 {
    let cents = ((value * 100.0) * CENT_SNAP).round() / CENT_SNAP;
    cents.round() / 100.0
}
