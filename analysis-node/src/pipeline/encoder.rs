use std::collections::{HashMap, HashSet};

use ndarray::Array2;
use tracing::debug;

use crate::config::EncodingConfig;
use crate::dataset::RawTable;
use crate::error::{AnalysisError, Result};

/// Shared bucket rare categorical values collapse into
pub const OTHERS: &str = "others";

/// Vocabulary for one one-hot encoded column.
///
/// Values are the distinct post-collapse values in sorted order; the
/// lexicographically smallest becomes the dropped reference so the
/// indicator set is reproducible and linearly independent.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnVocabulary {
    /// Dataset column this vocabulary belongs to
    pub column: String,
    /// Dropped reference value
    pub reference: String,
    /// Values that become indicator columns, sorted
    pub indicators: Vec<String>,
}

/// Fitted categorical encoding state.
///
/// Produced by [`EncodingModel::fit`] over one batch and applied as a
/// pure lookup; the vocabulary is batch-relative by design, so two
/// batches generally produce different column sets.
#[derive(Debug, Clone)]
pub struct EncodingModel {
    /// Per collapse column, the set of values seen fewer times than the
    /// rarity threshold
    rare_values: HashMap<String, HashSet<String>>,
    /// Per one-hot column, the indicator vocabulary
    vocabularies: Vec<ColumnVocabulary>,
}

/// Encoded feature table: numeric columns plus 0/1 indicator columns
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTable {
    /// Column names, `bytes` first, then `<column>_<value>` indicators
    pub columns: Vec<String>,
    /// Row-major feature matrix, one row per surviving record
    pub matrix: Array2<f64>,
}

impl EncodingModel {
    /// Fit collapse tables and one-hot vocabularies on a batch
    pub fn fit(table: &RawTable, config: &EncodingConfig) -> Result<Self> {
        if table.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let mut rare_values = HashMap::new();
        for column in &config.collapse_columns {
            let values = table.categorical_column(column).ok_or_else(|| {
                AnalysisError::Encoding(format!("unknown collapse column '{}'", column))
            })?;

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for value in values {
                *counts.entry(value.as_str()).or_insert(0) += 1;
            }

            let rare: HashSet<String> = counts
                .iter()
                .filter(|(_, &count)| count < config.rarity_threshold)
                .map(|(&value, _)| value.to_string())
                .collect();

            debug!(
                column = %column,
                distinct = counts.len(),
                collapsed = rare.len(),
                "Fitted rarity collapse table"
            );
            rare_values.insert(column.clone(), rare);
        }

        let mut vocabularies = Vec::new();
        for column in &config.one_hot_columns {
            let values = table.categorical_column(column).ok_or_else(|| {
                AnalysisError::Encoding(format!("unknown one-hot column '{}'", column))
            })?;

            let rare = rare_values.get(column);
            let mut distinct: Vec<String> = values
                .iter()
                .map(|value| collapse_value(value, rare))
                .collect::<HashSet<String>>()
                .into_iter()
                .collect();
            distinct.sort();

            // First sorted value is the dropped reference
            let mut iter = distinct.into_iter();
            let reference = iter
                .next()
                .ok_or_else(|| AnalysisError::Encoding(format!("column '{}' has no values", column)))?;
            let indicators: Vec<String> = iter.collect();

            vocabularies.push(ColumnVocabulary {
                column: column.clone(),
                reference,
                indicators,
            });
        }

        Ok(Self {
            rare_values,
            vocabularies,
        })
    }

    /// Collapse a raw value through the fitted table for a column
    pub fn collapse(&self, column: &str, value: &str) -> String {
        collapse_value(value, self.rare_values.get(column))
    }

    /// Fitted vocabularies, in one-hot column order
    pub fn vocabularies(&self) -> &[ColumnVocabulary] {
        &self.vocabularies
    }

    /// Apply the fitted encoding to a batch.
    ///
    /// A value absent from a column's vocabulary (possible when the
    /// model is applied to a different batch than it was fitted on)
    /// falls back to all-zero indicators.
    pub fn apply(&self, table: &RawTable) -> Result<EncodedTable> {
        if table.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let rows = table.len();
        let width = 1 + self
            .vocabularies
            .iter()
            .map(|v| v.indicators.len())
            .sum::<usize>();

        let mut columns = Vec::with_capacity(width);
        let mut matrix = Array2::<f64>::zeros((rows, width));

        columns.push("bytes".to_string());
        for (row, &bytes) in table.bytes_sent.iter().enumerate() {
            matrix[[row, 0]] = bytes;
        }

        let mut offset = 1;
        for vocab in &self.vocabularies {
            let values = table.categorical_column(&vocab.column).ok_or_else(|| {
                AnalysisError::Encoding(format!("unknown one-hot column '{}'", vocab.column))
            })?;
            let rare = self.rare_values.get(&vocab.column);

            for indicator in &vocab.indicators {
                columns.push(format!("{}_{}", vocab.column, indicator));
            }

            for (row, value) in values.iter().enumerate() {
                let collapsed = collapse_value(value, rare);
                if let Some(position) = vocab.indicators.iter().position(|v| *v == collapsed) {
                    matrix[[row, offset + position]] = 1.0;
                }
            }
            offset += vocab.indicators.len();
        }

        Ok(EncodedTable { columns, matrix })
    }
}

fn collapse_value(value: &str, rare: Option<&HashSet<String>>) -> String {
    match rare {
        Some(rare) if rare.contains(value) => OTHERS.to_string(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    /// Table with a configurable country column; other columns constant
    fn table_with_countries(countries: Vec<&str>) -> RawTable {
        let n = countries.len();
        RawTable {
            client_ips: vec!["203.0.113.7".to_string(); n],
            verbs: vec!["GET".to_string(); n],
            http_versions: vec!["1.1".to_string(); n],
            response_codes: vec!["200".to_string(); n],
            bytes_sent: vec![100.0; n],
            devices: vec!["curl/8.0".to_string(); n],
            country_codes: countries.into_iter().map(String::from).collect(),
        }
    }

    fn encoding_config(rarity_threshold: usize) -> EncodingConfig {
        let mut config = AnalysisConfig::default().encoding;
        config.rarity_threshold = rarity_threshold;
        config
    }

    #[test]
    fn test_collapse_boundary_is_strictly_less_than() {
        // A:299, B:300, C:1 with threshold 300 -> A and C collapse, B stays
        let mut countries = vec!["AAA"; 299];
        countries.extend(vec!["BBB"; 300]);
        countries.push("CCC");
        let table = table_with_countries(countries);
        let config = encoding_config(300);

        let model = EncodingModel::fit(&table, &config).unwrap();

        assert_eq!(model.collapse("geoip.country_code3", "AAA"), OTHERS);
        assert_eq!(model.collapse("geoip.country_code3", "CCC"), OTHERS);
        assert_eq!(model.collapse("geoip.country_code3", "BBB"), "BBB");
    }

    #[test]
    fn test_collapse_applies_only_to_designated_columns() {
        // verb is one-hot encoded but not in the collapse set, so even a
        // one-off value keeps its own indicator
        let mut table = table_with_countries(vec!["USA"; 4]);
        table.verbs = vec![
            "GET".to_string(),
            "GET".to_string(),
            "GET".to_string(),
            "POST".to_string(),
        ];
        let config = encoding_config(300);

        let model = EncodingModel::fit(&table, &config).unwrap();
        let encoded = model.apply(&table).unwrap();

        assert!(encoded.columns.contains(&"verb_POST".to_string()));
        assert!(!encoded.columns.iter().any(|c| c == "verb_others"));
    }

    #[test]
    fn test_one_hot_drops_lexicographically_first_value() {
        let table = table_with_countries(vec!["XXX", "YYY", "ZZZ"]);
        let config = encoding_config(1);

        let model = EncodingModel::fit(&table, &config).unwrap();
        let encoded = model.apply(&table).unwrap();

        let country_columns: Vec<&String> = encoded
            .columns
            .iter()
            .filter(|c| c.starts_with("geoip.country_code3_"))
            .collect();

        assert_eq!(
            country_columns,
            vec!["geoip.country_code3_YYY", "geoip.country_code3_ZZZ"]
        );

        let vocab = model
            .vocabularies()
            .iter()
            .find(|v| v.column == "geoip.country_code3")
            .unwrap();
        assert_eq!(vocab.reference, "XXX");
    }

    #[test]
    fn test_indicator_values_follow_rows() {
        let table = table_with_countries(vec!["XXX", "YYY", "ZZZ"]);
        let config = encoding_config(1);

        let model = EncodingModel::fit(&table, &config).unwrap();
        let encoded = model.apply(&table).unwrap();

        let yyy = encoded
            .columns
            .iter()
            .position(|c| c == "geoip.country_code3_YYY")
            .unwrap();
        let zzz = encoded
            .columns
            .iter()
            .position(|c| c == "geoip.country_code3_ZZZ")
            .unwrap();

        // Row 0 holds the reference value: all indicators zero
        assert_eq!(encoded.matrix[[0, yyy]], 0.0);
        assert_eq!(encoded.matrix[[0, zzz]], 0.0);
        assert_eq!(encoded.matrix[[1, yyy]], 1.0);
        assert_eq!(encoded.matrix[[1, zzz]], 0.0);
        assert_eq!(encoded.matrix[[2, zzz]], 1.0);
    }

    #[test]
    fn test_single_valued_column_yields_no_indicators() {
        // Every value below threshold collapses into one bucket, which
        // then becomes the dropped reference
        let table = table_with_countries(vec!["XXX", "YYY", "ZZZ"]);
        let config = encoding_config(300);

        let model = EncodingModel::fit(&table, &config).unwrap();
        let encoded = model.apply(&table).unwrap();

        assert!(!encoded
            .columns
            .iter()
            .any(|c| c.starts_with("geoip.country_code3_")));
    }

    #[test]
    fn test_unknown_value_at_apply_time_gets_zero_indicators() {
        let fit_table = table_with_countries(vec!["XXX", "YYY", "ZZZ"]);
        let config = encoding_config(1);
        let model = EncodingModel::fit(&fit_table, &config).unwrap();

        let apply_table = table_with_countries(vec!["QQQ"]);
        let encoded = model.apply(&apply_table).unwrap();

        let country_values: Vec<f64> = encoded
            .columns
            .iter()
            .zip(encoded.matrix.row(0).iter())
            .filter(|(c, _)| c.starts_with("geoip.country_code3_"))
            .map(|(_, &v)| v)
            .collect();

        assert!(country_values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_fit_on_empty_table_fails() {
        let table = table_with_countries(vec![]);
        let config = encoding_config(300);

        assert!(matches!(
            EncodingModel::fit(&table, &config),
            Err(AnalysisError::EmptyDataset)
        ));
    }

    #[test]
    fn test_bytes_column_passes_through() {
        let mut table = table_with_countries(vec!["USA", "USA"]);
        table.bytes_sent = vec![123.0, 456.0];
        let config = encoding_config(1);

        let model = EncodingModel::fit(&table, &config).unwrap();
        let encoded = model.apply(&table).unwrap();

        assert_eq!(encoded.columns[0], "bytes");
        assert_eq!(encoded.matrix[[0, 0]], 123.0);
        assert_eq!(encoded.matrix[[1, 0]], 456.0);
    }
}
