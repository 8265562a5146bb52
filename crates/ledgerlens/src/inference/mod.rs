//! Column type inference.

mod classifier;
mod matchers;

pub use classifier::{ClassifierConfig, TypeClassifier, ValueMatch};
pub use matchers::{DATE_MATCHERS, DateMatcher, DatePattern, NumberMatch, match_date, match_number};
