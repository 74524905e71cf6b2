use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Value shape of a metric, used to pick a plausible sample range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Price per kilogram
    Price,
    /// Head count
    Slaughter,
    /// Average live weight in kilograms
    Weight,
    /// Price difference, may be negative
    Spread,
    /// Percentage
    Ratio,
    Other,
}

/// Ordered classification table, first match wins.
///
/// Each entry pairs the English token with the localized one used in
/// metric keys derived from source sheet headers.
const CLASSIFICATION: [(MetricKind, &str, &str); 5] = [
    (MetricKind::Price, "PRICE", "价格"),
    (MetricKind::Slaughter, "SLAUGHTER", "屠宰"),
    (MetricKind::Weight, "WEIGHT", "均重"),
    (MetricKind::Spread, "SPREAD", "价差"),
    (MetricKind::Ratio, "RATIO", "占比"),
];

/// Sampling range of a kind, in units of `10^-scale`, half-open
struct SampleRange {
    low: i64,
    high: i64,
    scale: u32,
}

impl MetricKind {
    /// Classifies a metric key by case-sensitive substring match
    pub fn classify(metric_key: &str) -> Self {
        CLASSIFICATION
            .iter()
            .find(|(_, english, localized)| {
                metric_key.contains(english) || metric_key.contains(localized)
            })
            .map(|(kind, _, _)| *kind)
            .unwrap_or(MetricKind::Other)
    }

    fn range(self) -> SampleRange {
        match self {
            MetricKind::Price => SampleRange { low: 1_000, high: 2_000, scale: 2 },
            MetricKind::Slaughter => SampleRange { low: 1_000, high: 10_000, scale: 0 },
            MetricKind::Weight => SampleRange { low: 10_000, high: 15_000, scale: 2 },
            MetricKind::Spread => SampleRange { low: -200, high: 200, scale: 2 },
            MetricKind::Ratio => SampleRange { low: 0, high: 10_000, scale: 2 },
            MetricKind::Other => SampleRange { low: 1_000, high: 10_000, scale: 2 },
        }
    }

    /// Draws a sample value for this kind.
    ///
    /// Values are drawn on the decimal grid of the kind's scale, so the
    /// rendered value always stays strictly below the upper bound.
    /// `index` is the position of the row in the generated script and does
    /// not influence the value yet.
    pub fn sample<R: Rng + ?Sized>(self, _index: usize, rng: &mut R) -> Decimal {
        let range = self.range();
        Decimal::new(rng.gen_range(range.low..range.high), range.scale)
    }
}

/// Classifies `metric_key` and draws one sample value for it
pub fn synthesize<R: Rng + ?Sized>(metric_key: &str, index: usize, rng: &mut R) -> Decimal {
    MetricKind::classify(metric_key).sample(index, rng)
}
