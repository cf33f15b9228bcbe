//! Pay period and public holiday models.
//!
//! This module contains the [`PayPeriod`] and [`PublicHoliday`] types used to define
//! the calculation context for payroll. A pay period is derived fresh for every
//! call and is only ever persisted embedded in a payroll record.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Represents a public holiday returned by the holiday calendar.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PublicHoliday;
/// use chrono::NaiveDate;
///
/// let holiday = PublicHoliday {
///     date: NaiveDate::from_ymd_opt(2024, 3, 29).unwrap(),
///     name: "Good Friday".to_string(),
///     region: "national".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicHoliday {
    /// The date of the public holiday.
    pub date: NaiveDate,
    /// The name of the public holiday.
    pub name: String,
    /// The region where this holiday applies (e.g., "national", "lagos").
    pub region: String,
}

/// The period a payroll run covers.
///
/// `month` and `year` identify the period for idempotence checks; the date
/// range is what the calculation walks.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayPeriod::for_month(2024, 2).unwrap();
/// assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
/// assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    /// The period month (1-12).
    pub month: u32,
    /// The period year.
    pub year: i32,
    /// The start date of the pay period (inclusive).
    pub start_date: NaiveDate,
    /// The end date of the pay period (inclusive).
    pub end_date: NaiveDate,
    /// The date salaries for this period are paid.
    pub pay_date: NaiveDate,
}

impl PayPeriod {
    /// Builds the calendar-month period for `year`/`month`.
    ///
    /// The period runs from the first to the last day of the month and is
    /// paid on the last day.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `month` is outside 1-12 or the year is
    /// out of chrono's range.
    pub fn for_month(year: i32, month: u32) -> EngineResult<Self> {
        let start_date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            EngineError::validation("month", format!("{}/{} is not a valid month", month, year))
        })?;
        let end_date = last_day_of_month(start_date).ok_or_else(|| {
            EngineError::validation("month", format!("{}/{} has no last day", month, year))
        })?;

        Ok(Self {
            month,
            year,
            start_date,
            end_date,
            pay_date: end_date,
        })
    }
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let (next_year, next_month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// PP-001: March has 31 days
    #[test]
    fn test_for_month_march() {
        let period = PayPeriod::for_month(2024, 3).unwrap();
        assert_eq!(period.start_date, date(2024, 3, 1));
        assert_eq!(period.end_date, date(2024, 3, 31));
        assert_eq!(period.pay_date, date(2024, 3, 31));
        assert_eq!(period.month, 3);
        assert_eq!(period.year, 2024);
    }

    /// PP-002: December rolls the year for the end computation
    #[test]
    fn test_for_month_december() {
        let period = PayPeriod::for_month(2024, 12).unwrap();
        assert_eq!(period.end_date, date(2024, 12, 31));
    }

    /// PP-003: leap and non-leap February
    #[test]
    fn test_for_month_february() {
        assert_eq!(
            PayPeriod::for_month(2024, 2).unwrap().end_date,
            date(2024, 2, 29)
        );
        assert_eq!(
            PayPeriod::for_month(2023, 2).unwrap().end_date,
            date(2023, 2, 28)
        );
    }

    #[test]
    fn test_for_month_rejects_month_13() {
        match PayPeriod::for_month(2024, 13) {
            Err(EngineError::ValidationError { field, .. }) => assert_eq!(field, "month"),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_serialize_pay_period() {
        let period = PayPeriod::for_month(2024, 3).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert!(json.contains("\"start_date\":\"2024-03-01\""));
        assert!(json.contains("\"pay_date\":\"2024-03-31\""));
        assert!(json.contains("\"month\":3"));
    }

    #[test]
    fn test_deserialize_public_holiday() {
        let json = r#"{
            "date": "2024-12-25",
            "name": "Christmas Day",
            "region": "national"
        }"#;
        let holiday: PublicHoliday = serde_json::from_str(json).unwrap();
        assert_eq!(holiday.date, date(2024, 12, 25));
        assert_eq!(holiday.name, "Christmas Day");
    }
}
