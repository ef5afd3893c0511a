use serde_json::Value as Json;
use tracing::debug;

use super::{matching_rows, optional_filter};
use crate::{
    analysis::{self, Trendline as Fit},
    error::{CompileError, Result},
    filter::Filter,
    json::{self, Object},
    path::Path,
    schema::{Row, ROW_DATE_TIME, ROW_QUANTITY, ROW_UNIT_VALUE},
    storage::Storage,
};

const FITS: &[&str] = &["linear"];
const MEASURES: &[&str] = &["revenue", "unitsSold"];

/// What a trendline plots against time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measure {
    /// `unitValueCents * quantity`
    Revenue,
    UnitsSold,
}

impl Measure {
    /// `(epoch, y)` for one row, or `None` if the row lacks the needed cells.
    fn sample(self, row: &Row) -> Option<(i64, i64)> {
        let epoch = row.get(ROW_DATE_TIME).as_date_time()?.epoch_seconds();
        let quantity = row.get(ROW_QUANTITY).as_integer()?;
        let y = match self {
            Measure::Revenue => row.get(ROW_UNIT_VALUE).as_integer()?.saturating_mul(quantity),
            Measure::UnitsSold => quantity,
        };
        Some((epoch, y))
    }
}

/// Fits a line through a measure bucketed over time.
#[derive(Clone, Debug, PartialEq)]
pub struct Trendline {
    pub measure: Measure,
    pub cumulative: bool,
    /// Bucket width in seconds; 0 keeps every distinct timestamp.
    pub granularity: i64,
    pub filter: Option<Filter>,
}

impl Trendline {
    pub fn parse(obj: &Object, path: &Path) -> Result<Self, CompileError> {
        // Only a linear fit exists, so the value is checked and dropped.
        json::expect_one_of(json::require_str(obj, "fit", path)?, FITS, "fit", path)?;

        let measure = match json::expect_one_of(json::require_str(obj, "y", path)?, MEASURES, "y", path)? {
            "revenue" => Measure::Revenue,
            _ => Measure::UnitsSold,
        };
        let cumulative = json::require_bool(obj, "cumulative", path)?;
        let granularity = match obj.get("granularity") {
            Some(value) => {
                let granularity = json::expect_i64(value, "granularity", path)?;
                json::expect_at_least(granularity, 0, "granularity", path)?
            }
            None => 0,
        };

        Ok(Self {
            measure,
            cumulative,
            granularity,
            filter: optional_filter(obj, path)?,
        })
    }

    pub fn execute<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<Json> {
        let rows = matching_rows(storage, self.filter.as_ref())?;
        let series = analysis::bucket_series(
            rows.iter().filter_map(|row| self.measure.sample(row)),
            self.granularity,
            self.cumulative,
        );
        debug!(rows = rows.len(), buckets = series.len(), "series bucketed");
        let fit = Fit::fit(&series)?;
        Ok(serde_json::to_value(fit)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        error::ValidationError,
        schema::{Row, Value},
    };

    fn parse(body: Json) -> Result<Trendline, CompileError> {
        Trendline::parse(body.as_object().unwrap(), Path::root())
    }

    #[test]
    fn granularity_defaults_to_zero() {
        let trendline = parse(json!({ "fit": "linear", "y": "revenue", "cumulative": true })).unwrap();
        assert_eq!(trendline.granularity, 0);
        assert_eq!(trendline.measure, Measure::Revenue);
        assert!(trendline.cumulative);
        assert_eq!(trendline.filter, None);
    }

    #[test]
    fn rejects_unknown_choices() {
        let err = parse(json!({ "fit": "cubic", "y": "revenue", "cumulative": true })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "key \"fit\" out of range: expected one of {linear}, was \"cubic\" at [fit]"
        );
        let err = parse(json!({ "fit": "linear", "y": "profit", "cumulative": true })).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Validation(ValidationError::OutOfRange { ref key, .. }) if key == "y"
        ));
    }

    #[test]
    fn granularity_is_a_non_negative_integer() {
        let err = parse(json!({
            "fit": "linear", "y": "unitsSold", "cumulative": false, "granularity": -60
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Validation(ValidationError::OutOfRange { ref key, .. }) if key == "granularity"
        ));

        let err = parse(json!({
            "fit": "linear", "y": "unitsSold", "cumulative": false, "granularity": "hourly"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Validation(ValidationError::WrongType { ref key, .. }) if key == "granularity"
        ));
    }

    #[test]
    fn measures() {
        let row: Row = [
            ("dateTime", Value::DateTime("19700101T000100Z".parse().unwrap())),
            ("quantity", Value::Integer(3)),
            ("unitValueCents", Value::Integer(250)),
        ]
        .into_iter()
        .collect();
        assert_eq!(Measure::Revenue.sample(&row), Some((60, 750)));
        assert_eq!(Measure::UnitsSold.sample(&row), Some((60, 3)));
        assert_eq!(Measure::UnitsSold.sample(&Row::new()), None);
    }
}
