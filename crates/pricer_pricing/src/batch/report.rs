//! Success and failure accounting for a pricing pass.

use std::collections::BTreeMap;

use pricer_core::types::PricingError;

/// A quote that could not be priced.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteFailure {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Why pricing failed.
    pub error: PricingError,
}

/// Outcome of one pricing pass over a quote set.
///
/// `attempted == priced + failures.len()`; quotes the pass does not apply
/// to are counted in `skipped` and never attempted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Quotes the pricer was run on.
    pub attempted: usize,
    /// Quotes that received a price.
    pub priced: usize,
    /// Quotes outside the pass (e.g. no market price for Heston).
    pub skipped: usize,
    /// Per-quote failures in quote order.
    pub failures: Vec<QuoteFailure>,
}

impl PassReport {
    /// Number of failed quotes.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every attempted quote was priced.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure counts keyed by error category, in category order.
    pub fn failures_by_category(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.error.category()).or_insert(0) += 1;
        }
        counts
    }

    pub(crate) fn record(
        &mut self,
        instrument_id: &str,
        outcome: Result<f64, PricingError>,
    ) -> Option<f64> {
        self.attempted += 1;
        match outcome {
            Ok(price) => {
                self.priced += 1;
                Some(price)
            }
            Err(error) => {
                self.failures.push(QuoteFailure {
                    instrument_id: instrument_id.to_string(),
                    error,
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut report = PassReport::default();
        assert_eq!(report.record("A", Ok(1.0)), Some(1.0));
        assert_eq!(
            report.record("B", Err(PricingError::InvalidInput("strike".into()))),
            None
        );
        assert_eq!(
            report.record("C", Err(PricingError::InvalidInput("spot".into()))),
            None
        );
        report.skipped += 1;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.priced, 1);
        assert_eq!(report.failed(), 2);
        assert!(!report.is_clean());
        assert_eq!(report.failures_by_category().get("InvalidInput"), Some(&2));
        assert_eq!(report.failures[0].instrument_id, "B");
    }
}
