//! Time-based billing rule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Flat fee up to a threshold, then a per-second penalty for every whole
/// second beyond it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingPolicy {
    /// Seconds covered by the base fee (`T`).
    pub threshold_secs: f64,
    /// Fee charged for any stay up to and including the threshold (`B`).
    pub base_fee: f64,
    /// Charge per whole second beyond the threshold (`P`).
    pub penalty_per_sec: f64,
    /// Currency label used in user-facing text.
    pub currency: String,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            threshold_secs: 30.0,
            base_fee: 100.0,
            penalty_per_sec: 1.0,
            currency: "Tk".to_string(),
        }
    }
}

impl BillingPolicy {
    /// Bill for a stay of `elapsed`.
    pub fn compute_bill(&self, elapsed: Duration) -> f64 {
        self.compute_bill_secs(elapsed.as_secs_f64())
    }

    /// Bill for a stay of `elapsed_secs` seconds.
    pub fn compute_bill_secs(&self, elapsed_secs: f64) -> f64 {
        if elapsed_secs <= self.threshold_secs {
            return self.base_fee;
        }
        let extra = (elapsed_secs - self.threshold_secs).floor();
        self.base_fee + extra * self.penalty_per_sec
    }

    /// Whether a stay of `elapsed` is past the flat-rate threshold.
    pub fn is_overstay(&self, elapsed: Duration) -> bool {
        elapsed.as_secs_f64() > self.threshold_secs
    }

    /// Whole seconds beyond the threshold, zero when within it.
    pub fn overage_secs(&self, elapsed: Duration) -> u64 {
        let over = elapsed.as_secs_f64() - self.threshold_secs;
        if over <= 0.0 {
            0
        } else {
            over.floor() as u64
        }
    }

    /// Penalty accrued on top of the base fee.
    pub fn penalty(&self, elapsed: Duration) -> f64 {
        self.overage_secs(elapsed) as f64 * self.penalty_per_sec
    }

    /// Format an amount the way receipts and the HUD show it.
    pub fn format_amount(&self, amount: f64) -> String {
        format!("{amount:.0} {}", self.currency)
    }

    /// One-line rule summary for the help bar.
    pub fn describe(&self) -> String {
        format!(
            "First {}s = {} | After that +{}/sec",
            self.threshold_secs,
            self.format_amount(self.base_fee),
            self.format_amount(self.penalty_per_sec)
        )
    }
}

/// `m:ss` of the whole seconds in `elapsed`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
