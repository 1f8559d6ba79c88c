use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::super::error::ValuationError;

/// Strategy for collapsing adjusted comparable prices into one reference price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationMethod {
    #[default]
    Mean,
    WeightedMean,
    Median,
}

impl AggregationMethod {
    pub const fn ordered() -> [Self; 3] {
        [Self::Mean, Self::WeightedMean, Self::Median]
    }

    pub const fn key(self) -> &'static str {
        match self {
            AggregationMethod::Mean => "mean",
            AggregationMethod::WeightedMean => "weighted-mean",
            AggregationMethod::Median => "median",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AggregationMethod::Mean => "Arithmetic mean",
            AggregationMethod::WeightedMean => "Weighted mean",
            AggregationMethod::Median => "Median",
        }
    }
}

impl FromStr for AggregationMethod {
    type Err = ValuationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "mean" | "average" => Ok(Self::Mean),
            "weighted-mean" | "weighted" => Ok(Self::WeightedMean),
            "median" => Ok(Self::Median),
            _ => Err(ValuationError::invalid(
                "method",
                format!("unknown aggregation method '{value}'"),
            )),
        }
    }
}

/// One adjusted price and its weight under the weighted-mean method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub price: f64,
    pub weight: f64,
}

impl PricePoint {
    pub fn unweighted(price: f64) -> Self {
        Self { price, weight: 1.0 }
    }
}

pub fn aggregate(points: &[PricePoint], method: AggregationMethod) -> Result<f64, ValuationError> {
    if points.is_empty() {
        return Err(ValuationError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    match method {
        AggregationMethod::Mean => Ok(mean(points)),
        AggregationMethod::WeightedMean => weighted_mean(points),
        AggregationMethod::Median => Ok(median(points)),
    }
}

/// Aggregate bare prices, treating every comparable as equally weighted.
pub fn aggregate_prices(prices: &[f64], method: AggregationMethod) -> Result<f64, ValuationError> {
    let points: Vec<PricePoint> = prices.iter().copied().map(PricePoint::unweighted).collect();
    aggregate(&points, method)
}

fn mean(points: &[PricePoint]) -> f64 {
    points.iter().map(|point| point.price).sum::<f64>() / points.len() as f64
}

fn weighted_mean(points: &[PricePoint]) -> Result<f64, ValuationError> {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (index, point) in points.iter().enumerate() {
        if !point.weight.is_finite() || point.weight <= 0.0 {
            return Err(ValuationError::invalid(
                format!("weights[{index}]"),
                format!("weight must be a positive number, got {}", point.weight),
            ));
        }
        weighted_sum += point.price * point.weight;
        total_weight += point.weight;
    }

    Ok(weighted_sum / total_weight)
}

fn median(points: &[PricePoint]) -> f64 {
    let mut prices: Vec<f64> = points.iter().map(|point| point.price).collect();
    prices.sort_by(f64::total_cmp);

    let middle = prices.len() / 2;
    if prices.len() % 2 == 1 {
        prices[middle]
    } else {
        (prices[middle - 1] + prices[middle]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_insufficient_for_every_method() {
        for method in AggregationMethod::ordered() {
            match aggregate_prices(&[], method) {
                Err(ValuationError::InsufficientData { actual, .. }) => assert_eq!(actual, 0),
                other => panic!("{method:?}: expected insufficient data, got {other:?}"),
            }
        }
    }

    #[test]
    fn single_value_is_returned_by_every_method() {
        for method in AggregationMethod::ordered() {
            assert_eq!(aggregate_prices(&[1234.5], method), Ok(1234.5));
        }
    }

    #[test]
    fn two_comparables_agree_on_mean_and_median() {
        let prices = [1130.0, 1080.0];
        assert_eq!(aggregate_prices(&prices, AggregationMethod::Mean), Ok(1105.0));
        assert_eq!(aggregate_prices(&prices, AggregationMethod::Median), Ok(1105.0));
        assert_eq!(
            aggregate_prices(&prices, AggregationMethod::WeightedMean),
            Ok(1105.0)
        );
    }

    #[test]
    fn median_takes_middle_of_sorted_odd_set() {
        let prices = [1300.0, 900.0, 1100.0, 1500.0, 1000.0];
        assert_eq!(aggregate_prices(&prices, AggregationMethod::Median), Ok(1100.0));
    }

    #[test]
    fn median_averages_two_middle_values_of_even_set() {
        let prices = [1500.0, 900.0, 1100.0, 1000.0];
        assert_eq!(aggregate_prices(&prices, AggregationMethod::Median), Ok(1050.0));
    }

    #[test]
    fn weighted_mean_honours_explicit_weights() {
        let points = [
            PricePoint {
                price: 1000.0,
                weight: 3.0,
            },
            PricePoint {
                price: 2000.0,
                weight: 1.0,
            },
        ];
        assert_eq!(aggregate(&points, AggregationMethod::WeightedMean), Ok(1250.0));
        assert_eq!(aggregate(&points, AggregationMethod::Mean), Ok(1500.0));
    }

    #[test]
    fn weighted_mean_rejects_non_positive_weight() {
        let points = [PricePoint {
            price: 1000.0,
            weight: 0.0,
        }];
        let err = aggregate(&points, AggregationMethod::WeightedMean).expect_err("zero weight");
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn method_keys_round_trip_through_parsing() {
        for method in AggregationMethod::ordered() {
            assert_eq!(method.key().parse::<AggregationMethod>(), Ok(method));
        }
        assert_eq!(
            "weighted_mean".parse::<AggregationMethod>(),
            Ok(AggregationMethod::WeightedMean)
        );
        assert!("mode".parse::<AggregationMethod>().is_err());
    }
}
