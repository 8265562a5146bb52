//! Column type classification from a bounded sample of raw values.

use indexmap::IndexMap;

use crate::schema::{ClassificationResult, RawColumn, RawValue, SemanticType};

use super::matchers::{NumberMatch, match_date, match_number};

/// Configuration for the type classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Maximum non-null values examined per column.
    pub sample_size: usize,
    /// Date score a column must exceed to classify as `Date`.
    pub date_threshold: f64,
    /// Number score a column must exceed to classify as `Number`.
    pub number_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            date_threshold: 0.7,
            number_threshold: 0.7,
        }
    }
}

/// What a single sampled value looked like.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueMatch {
    Date { hint: &'static str },
    Number(NumberMatch),
}

impl ValueMatch {
    pub fn hint(&self) -> &str {
        match self {
            ValueMatch::Date { hint } => hint,
            ValueMatch::Number(m) => &m.format,
        }
    }
}

/// Infers a column's semantic type with a confidence score.
#[derive(Debug, Clone, Default)]
pub struct TypeClassifier {
    config: ClassifierConfig,
}

impl TypeClassifier {
    /// Create a classifier with default settings.
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }

    /// Create a classifier with custom configuration.
    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one column.
    ///
    /// Only the first `sample_size` non-null values are examined, and the
    /// confidence is relative to that sample. Values with no textual form
    /// (infinite floats) stay in the denominator without matching anything.
    pub fn classify(&self, values: &[RawValue]) -> ClassificationResult {
        let sample: Vec<&RawValue> = values
            .iter()
            .filter(|v| !v.is_null())
            .take(self.config.sample_size.max(1))
            .collect();

        if sample.is_empty() {
            return ClassificationResult::new(SemanticType::Text, 1.0, Some("empty".to_string()));
        }

        let mut date_matches = 0usize;
        let mut number_matches = 0usize;
        let mut format_hint: Option<String> = None;

        for value in &sample {
            let Some(found) = self.classify_value(value) else {
                continue;
            };
            match found {
                ValueMatch::Date { .. } => date_matches += 1,
                ValueMatch::Number(_) => number_matches += 1,
            }
            if format_hint.is_none() {
                format_hint = Some(found.hint().to_string());
            }
        }

        let total = sample.len() as f64;
        let date_score = date_matches as f64 / total;
        let number_score = number_matches as f64 / total;

        if date_score > self.config.date_threshold {
            ClassificationResult::new(SemanticType::Date, round3(date_score), format_hint)
        } else if number_score > self.config.number_threshold {
            ClassificationResult::new(SemanticType::Number, round3(number_score), format_hint)
        } else {
            ClassificationResult::new(
                SemanticType::Text,
                round3(1.0 - date_score.max(number_score)),
                None,
            )
        }
    }

    /// Test one value against the date matchers, then the number matcher.
    pub fn classify_value(&self, value: &RawValue) -> Option<ValueMatch> {
        let text = value.canonical_text()?;
        if let Some(hint) = match_date(&text) {
            return Some(ValueMatch::Date { hint });
        }
        match_number(&text).map(ValueMatch::Number)
    }

    /// Classify every column, keyed by name in input order.
    pub fn classify_columns(
        &self,
        columns: &[RawColumn],
    ) -> IndexMap<String, ClassificationResult> {
        columns
            .iter()
            .map(|c| (c.name.clone(), self.classify(&c.values)))
            .collect()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<RawValue> {
        values.iter().map(|v| RawValue::from(*v)).collect()
    }

    #[test]
    fn test_empty_column_is_text() {
        let classifier = TypeClassifier::new();
        let result = classifier.classify(&[RawValue::Null, RawValue::Float(f64::NAN)]);
        assert_eq!(result.semantic_type, SemanticType::Text);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.format_hint.as_deref(), Some("empty"));
    }

    #[test]
    fn test_date_threshold() {
        let mut values = texts(&[
            "2023-01-01", "2023-01-02", "2023-01-03", "2023-01-04",
            "2023-01-05", "2023-01-06", "2023-01-07", "2023-01-08",
        ]);
        values.push(RawValue::from("pending"));
        values.push(RawValue::from("unknown"));

        let result = TypeClassifier::new().classify(&values);
        assert_eq!(result.semantic_type, SemanticType::Date);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.format_hint.as_deref(), Some("YYYY-MM-DD"));
    }

    #[test]
    fn test_threshold_is_strict() {
        let values = texts(&[
            "10.5", "20.5", "30.5", "40.5", "50.5", "60.5", "70.5", "a", "b", "c",
        ]);
        let result = TypeClassifier::new().classify(&values);
        assert_eq!(result.semantic_type, SemanticType::Text);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.format_hint, None);
    }

    #[test]
    fn test_date_precedence_over_number() {
        let classifier = TypeClassifier::new();
        assert_eq!(
            classifier.classify_value(&RawValue::Integer(44927)),
            Some(ValueMatch::Date { hint: "ExcelSerial" })
        );
        assert!(matches!(
            classifier.classify_value(&RawValue::Float(44927.0)),
            Some(ValueMatch::Number(_))
        ));
    }

    #[test]
    fn test_first_hint_wins() {
        let values = texts(&["€10", "$20", "$30", "$40"]);
        let result = TypeClassifier::new().classify(&values);
        assert_eq!(result.semantic_type, SemanticType::Number);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.format_hint.as_deref(), Some("Currency-EUR"));
    }

    #[test]
    fn test_non_finite_values_depress_scores() {
        let values = vec![
            RawValue::from("1.5k"),
            RawValue::from("2k"),
            RawValue::Float(f64::INFINITY),
            RawValue::Float(f64::NEG_INFINITY),
        ];
        let result = TypeClassifier::new().classify(&values);
        assert_eq!(result.semantic_type, SemanticType::Text);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_sample_is_bounded() {
        let config = ClassifierConfig {
            sample_size: 4,
            ..ClassifierConfig::default()
        };
        let mut values = texts(&["Q1 2023", "Q2 2023", "Q3 2023", "Q4 2023"]);
        values.extend(texts(&["x"; 20]));

        let result = TypeClassifier::with_config(config).classify(&values);
        assert_eq!(result.semantic_type, SemanticType::Date);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_nulls_are_not_sampled() {
        let values = vec![
            RawValue::Null,
            RawValue::from("(1,000.00)"),
            RawValue::Null,
            RawValue::from("250.00-"),
        ];
        let result = TypeClassifier::new().classify(&values);
        assert_eq!(result.semantic_type, SemanticType::Number);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.format_hint.as_deref(), Some("Decimal"));
    }

    #[test]
    fn test_classify_columns_preserves_order() {
        let columns = vec![
            RawColumn::new("Posted", ["2024-01-31", "2024-02-29"]),
            RawColumn::new("Memo", ["rent", "payroll"]),
        ];
        let results = TypeClassifier::new().classify_columns(&columns);
        let names: Vec<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Posted", "Memo"]);
        assert_eq!(results["Posted"].semantic_type, SemanticType::Date);
        assert_eq!(results["Memo"].semantic_type, SemanticType::Text);
    }
}
