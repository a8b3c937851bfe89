//! Option quotes and ordered quote collections.

use pricer_core::types::{OptionKind, PricingError};

/// One European option observed at one point in time.
///
/// Construction does not validate; pricers call [`OptionQuote::validate`]
/// and report violations as `PricingError::InvalidInput` against the quote,
/// so a bad row never aborts a batch.
///
/// Model prices start empty and are attached by pricing passes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptionQuote {
    /// Stable instrument identifier (e.g. `BTC-27JUN25-60000-C`).
    pub instrument_id: String,
    /// Underlying spot price.
    pub spot: f64,
    /// Strike price.
    pub strike: f64,
    /// Time to expiry in years.
    pub time_to_expiry: f64,
    /// Call or put.
    pub kind: OptionKind,
    /// Continuously compounded risk-free rate (may be negative).
    pub rate: f64,
    /// Annualised implied volatility as a decimal.
    pub volatility: f64,
    /// Observed market premium in quote currency.
    pub market_price: Option<f64>,
    /// Black-Scholes model premium.
    pub bs_price: Option<f64>,
    /// Heston model premium.
    pub heston_price: Option<f64>,
}

impl OptionQuote {
    /// Create a quote without market or model prices.
    pub fn new(
        instrument_id: impl Into<String>,
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        kind: OptionKind,
        rate: f64,
        volatility: f64,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            spot,
            strike,
            time_to_expiry,
            kind,
            rate,
            volatility,
            market_price: None,
            bs_price: None,
            heston_price: None,
        }
    }

    /// Attach an observed market price.
    pub fn with_market_price(mut self, price: f64) -> Self {
        self.market_price = Some(price);
        self
    }

    /// Check the pricing preconditions: spot, strike, expiry and volatility
    /// strictly positive and finite, rate finite.
    pub fn validate(&self) -> Result<(), PricingError> {
        let positive = [
            ("spot", self.spot),
            ("strike", self.strike),
            ("time to expiry", self.time_to_expiry),
            ("volatility", self.volatility),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(PricingError::InvalidInput(format!(
                    "{}: {} must be positive and finite, got {}",
                    self.instrument_id, name, value
                )));
            }
        }
        if !self.rate.is_finite() {
            return Err(PricingError::InvalidInput(format!(
                "{}: rate must be finite, got {}",
                self.instrument_id, self.rate
            )));
        }
        Ok(())
    }

    /// Strike over spot.
    #[inline]
    pub fn moneyness(&self) -> f64 {
        self.strike / self.spot
    }

    /// Market price if present, finite and strictly positive.
    pub fn positive_market_price(&self) -> Option<f64> {
        self.market_price.filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// Ordered collection of [`OptionQuote`].
///
/// Membership is fixed for the lifetime of a value: pricing passes attach
/// prices through [`QuoteSet::quotes_mut`], which hands out a slice, and any
/// filtering produces a new set.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct QuoteSet {
    quotes: Vec<OptionQuote>,
}

impl QuoteSet {
    /// Wrap quotes, preserving order.
    pub fn new(quotes: Vec<OptionQuote>) -> Self {
        Self { quotes }
    }

    /// Number of quotes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Quotes in order.
    pub fn quotes(&self) -> &[OptionQuote] {
        &self.quotes
    }

    /// Mutable access for attaching derived prices.
    pub fn quotes_mut(&mut self) -> &mut [OptionQuote] {
        &mut self.quotes
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, OptionQuote> {
        self.quotes.iter()
    }

    /// Look up a quote by instrument id.
    pub fn get(&self, instrument_id: &str) -> Option<&OptionQuote> {
        self.quotes.iter().find(|q| q.instrument_id == instrument_id)
    }

    /// New set with the quotes satisfying `keep`, order preserved.
    pub fn filtered<F>(&self, keep: F) -> QuoteSet
    where
        F: Fn(&OptionQuote) -> bool,
    {
        self.quotes.iter().filter(|q| keep(q)).cloned().collect()
    }

    /// Consume the set.
    pub fn into_quotes(self) -> Vec<OptionQuote> {
        self.quotes
    }
}

impl FromIterator<OptionQuote> for QuoteSet {
    fn from_iter<I: IntoIterator<Item = OptionQuote>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a QuoteSet {
    type Item = &'a OptionQuote;
    type IntoIter = std::slice::Iter<'a, OptionQuote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.iter()
    }
}

impl IntoIterator for QuoteSet {
    type Item = OptionQuote;
    type IntoIter = std::vec::IntoIter<OptionQuote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.into_iter()
    }
}
