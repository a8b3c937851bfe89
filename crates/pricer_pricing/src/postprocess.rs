//! Post-processing of Heston-priced quotes.
//!
//! Three rules, applied in order:
//!
//! 1. **Deep-OTM dampening**: Heston prices of quotes with
//!    `strike > otm_moneyness_threshold × spot` are multiplied by
//!    `otm_damping_factor`.
//! 2. **Outlier rejection**: the absolute error `|heston - market|` is
//!    computed for every quote carrying both prices; quotes whose error is
//!    strictly above the `outlier_percentile` nearest-rank percentile are
//!    dropped. All errors are materialised before anything is removed.
//! 3. **Missing prices**: quotes without a finite Heston price are dropped.
//!
//! With `N` measurable errors, rule 2 keeps at least `⌈p·N⌉` of them.

use pricer_models::instruments::QuoteSet;
use tracing::info;

use crate::error::PipelineError;

/// Post-processing thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PostProcessConfig {
    /// Strike/spot ratio above which a quote counts as deep out of the money.
    pub otm_moneyness_threshold: f64,
    /// Multiplier applied to deep-OTM Heston prices.
    pub otm_damping_factor: f64,
    /// Error percentile above which quotes are dropped, in (0, 1].
    pub outlier_percentile: f64,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            otm_moneyness_threshold: 1.5,
            otm_damping_factor: 0.95,
            outlier_percentile: 0.975,
        }
    }
}

impl PostProcessConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.otm_moneyness_threshold > 0.0 && self.otm_moneyness_threshold.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "otm_moneyness_threshold must be positive, got {}",
                self.otm_moneyness_threshold
            )));
        }
        if !(self.otm_damping_factor > 0.0 && self.otm_damping_factor.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "otm_damping_factor must be positive, got {}",
                self.otm_damping_factor
            )));
        }
        if !(self.outlier_percentile > 0.0 && self.outlier_percentile <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "outlier_percentile must lie in (0, 1], got {}",
                self.outlier_percentile
            )));
        }
        Ok(())
    }
}

/// Counts of what each rule did.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PostProcessReport {
    /// Quotes received.
    pub input: usize,
    /// Heston prices dampened by rule 1.
    pub dampened: usize,
    /// Error cutoff used by rule 2, if any error was measurable.
    pub outlier_cutoff: Option<f64>,
    /// Quotes dropped by rule 2.
    pub outliers_dropped: usize,
    /// Quotes dropped by rule 3.
    pub missing_price_dropped: usize,
    /// Quotes returned.
    pub output: usize,
}

/// Applies dampening, outlier rejection and missing-price removal.
///
/// # Examples
/// ```
/// use pricer_core::types::OptionKind;
/// use pricer_models::instruments::{OptionQuote, QuoteSet};
/// use pricer_pricing::postprocess::{PostProcessConfig, PostProcessor};
///
/// let mut deep = OptionQuote::new("A", 100.0, 200.0, 0.5, OptionKind::Call, 0.0, 0.8);
/// deep.heston_price = Some(2.0);
///
/// let processor = PostProcessor::new(PostProcessConfig::default()).unwrap();
/// let (adjusted, report) = processor.adjust(QuoteSet::new(vec![deep]));
///
/// assert_eq!(adjusted.quotes()[0].heston_price, Some(2.0 * 0.95));
/// assert_eq!(report.dampened, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessor {
    config: PostProcessConfig,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self {
            config: PostProcessConfig::default(),
        }
    }
}

impl PostProcessor {
    /// Validate the thresholds and build a processor.
    pub fn new(config: PostProcessConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Thresholds in use.
    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    /// Apply the three rules, returning the surviving quotes in their
    /// original order.
    pub fn adjust(&self, priced: QuoteSet) -> (QuoteSet, PostProcessReport) {
        let mut report = PostProcessReport {
            input: priced.len(),
            ..Default::default()
        };
        let mut quotes = priced.into_quotes();

        // Rule 1
        for quote in quotes.iter_mut() {
            if quote.strike > self.config.otm_moneyness_threshold * quote.spot {
                if let Some(price) = quote.heston_price.as_mut() {
                    *price *= self.config.otm_damping_factor;
                    report.dampened += 1;
                }
            }
        }

        // Rule 2
        let errors: Vec<Option<f64>> = quotes
            .iter()
            .map(|q| match (q.heston_price, q.market_price) {
                (Some(h), Some(m)) => Some((h - m).abs()).filter(|e| e.is_finite()),
                _ => None,
            })
            .collect();
        let measurable: Vec<f64> = errors.iter().flatten().copied().collect();
        report.outlier_cutoff = nearest_rank_percentile(&measurable, self.config.outlier_percentile);

        if let Some(cutoff) = report.outlier_cutoff {
            let before = quotes.len();
            quotes = quotes
                .into_iter()
                .zip(errors)
                .filter(|(_, error)| !matches!(error, Some(e) if *e > cutoff))
                .map(|(q, _)| q)
                .collect();
            report.outliers_dropped = before - quotes.len();
        }

        // Rule 3
        let before = quotes.len();
        quotes.retain(|q| q.heston_price.is_some_and(f64::is_finite));
        report.missing_price_dropped = before - quotes.len();

        report.output = quotes.len();
        info!(
            input = report.input,
            dampened = report.dampened,
            outliers = report.outliers_dropped,
            missing = report.missing_price_dropped,
            output = report.output,
            "post-processing complete"
        );
        (QuoteSet::new(quotes), report)
    }
}

/// Nearest-rank percentile: the smallest value with at least `p·N` values at
/// or below it. `None` for an empty slice.
pub fn nearest_rank_percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (p * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}
