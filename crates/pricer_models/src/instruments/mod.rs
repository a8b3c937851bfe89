//! Market instruments.
//!
//! - [`OptionQuote`]: one European call or put with its market context
//! - [`QuoteSet`]: ordered, membership-stable collection of quotes

mod quote;

pub use pricer_core::types::OptionKind;
pub use quote::{OptionQuote, QuoteSet};
