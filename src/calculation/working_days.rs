//! Working-day classification and counting.
//!
//! This module classifies each calendar day as a holiday, a working day or a
//! weekend day and counts them over an inclusive date range. Proration is
//! measured in these working days.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A set of holiday dates.
pub type HolidaySet = BTreeSet<NaiveDate>;

/// The weekdays an organization works.
///
/// Deserialized from a list of weekday names such as
/// `[Mon, Tue, Wed, Thu, Fri]`.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::Workweek;
/// use chrono::Weekday;
///
/// let workweek = Workweek::default();
/// assert!(workweek.contains(Weekday::Mon));
/// assert!(!workweek.contains(Weekday::Sat));
///
/// let six_day = Workweek::from(vec![
///     Weekday::Mon, Weekday::Tue, Weekday::Wed,
///     Weekday::Thu, Weekday::Fri, Weekday::Sat,
/// ]);
/// assert!(six_day.contains(Weekday::Sat));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Weekday>", into = "Vec<Weekday>")]
pub struct Workweek {
    days: [bool; 7],
}

impl Workweek {
    /// Returns true if `weekday` is a working day.
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.days[weekday.num_days_from_monday() as usize]
    }

    /// Returns true if no weekday is a working day.
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|working| !working)
    }
}

impl Default for Workweek {
    /// Monday to Friday.
    fn default() -> Self {
        Self {
            days: [true, true, true, true, true, false, false],
        }
    }
}

impl From<Vec<Weekday>> for Workweek {
    fn from(weekdays: Vec<Weekday>) -> Self {
        let mut days = [false; 7];
        for weekday in weekdays {
            days[weekday.num_days_from_monday() as usize] = true;
        }
        Self { days }
    }
}

impl From<Workweek> for Vec<Weekday> {
    fn from(workweek: Workweek) -> Self {
        let mut weekday = Weekday::Mon;
        let mut result = Vec::new();
        for working in workweek.days {
            if working {
                result.push(weekday);
            }
            weekday = weekday.succ();
        }
        result
    }
}

/// How a single calendar day counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClass {
    /// A public holiday, regardless of weekday.
    Holiday,
    /// A workweek day that is not a holiday.
    Working,
    /// Any other day.
    Weekend,
}

/// Classifies a date. Holiday takes precedence over the workweek.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{classify_day, DayClass, HolidaySet, Workweek};
/// use chrono::NaiveDate;
///
/// let good_friday = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
/// let holidays: HolidaySet = [good_friday].into_iter().collect();
///
/// assert_eq!(classify_day(good_friday, &Workweek::default(), &holidays), DayClass::Holiday);
/// ```
pub fn classify_day(date: NaiveDate, workweek: &Workweek, holidays: &HolidaySet) -> DayClass {
    if holidays.contains(&date) {
        DayClass::Holiday
    } else if workweek.contains(date.weekday()) {
        DayClass::Working
    } else {
        DayClass::Weekend
    }
}

/// Day counts over an inclusive date range.
///
/// `total_days == working_days + weekends + holidays` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkingDaysCount {
    /// Calendar days in the range.
    pub total_days: u32,
    /// Workweek days that are not holidays.
    pub working_days: u32,
    /// Non-workweek days that are not holidays.
    pub weekends: u32,
    /// Holidays, whatever weekday they fall on.
    pub holidays: u32,
}

/// Counts working days, weekends and holidays from `start` to `end`
/// inclusive.
///
/// Time of day plays no part: the walk is over calendar dates. A reversed
/// range (`start > end`) yields all zeros.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{count_working_days, HolidaySet, Workweek};
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
/// let count = count_working_days(start, end, &Workweek::default(), &HolidaySet::new());
///
/// assert_eq!(count.total_days, 31);
/// assert_eq!(count.working_days, 21);
/// assert_eq!(count.weekends, 10);
/// ```
pub fn count_working_days(
    start: NaiveDate,
    end: NaiveDate,
    workweek: &Workweek,
    holidays: &HolidaySet,
) -> WorkingDaysCount {
    let mut count = WorkingDaysCount::default();
    if start > end {
        return count;
    }

    for date in start.iter_days().take_while(|date| *date <= end) {
        count.total_days += 1;
        match classify_day(date, workweek, holidays) {
            DayClass::Holiday => count.holidays += 1,
            DayClass::Working => count.working_days += 1,
            DayClass::Weekend => count.weekends += 1,
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn holidays(dates: &[NaiveDate]) -> HolidaySet {
        dates.iter().copied().collect()
    }

    /// WD-001: March 2024, Mon-Fri, no holidays
    #[test]
    fn test_wd_001_march_2024_weekdays() {
        let count = count_working_days(
            date(2024, 3, 1),
            date(2024, 3, 31),
            &Workweek::default(),
            &HolidaySet::new(),
        );
        assert_eq!(count.total_days, 31);
        assert_eq!(count.working_days, 21);
        assert_eq!(count.weekends, 10);
        assert_eq!(count.holidays, 0);
    }

    /// WD-002: 15-31 March 2024 has 11 working days
    #[test]
    fn test_wd_002_second_half_of_march() {
        let count = count_working_days(
            date(2024, 3, 15),
            date(2024, 3, 31),
            &Workweek::default(),
            &HolidaySet::new(),
        );
        assert_eq!(count.working_days, 11);
        assert_eq!(count.weekends, 6);
    }

    /// WD-003: holiday on a working day is a holiday, not a working day
    #[test]
    fn test_wd_003_holiday_on_weekday() {
        // 2024-03-29 is a Friday, 2024-04-01 a Monday
        let count = count_working_days(
            date(2024, 3, 1),
            date(2024, 3, 31),
            &Workweek::default(),
            &holidays(&[date(2024, 3, 29)]),
        );
        assert_eq!(count.working_days, 20);
        assert_eq!(count.holidays, 1);
        assert_eq!(count.weekends, 10);
    }

    /// WD-004: holiday on a weekend is a holiday, not a weekend
    #[test]
    fn test_wd_004_holiday_on_weekend() {
        // 2024-03-30 is a Saturday
        let count = count_working_days(
            date(2024, 3, 1),
            date(2024, 3, 31),
            &Workweek::default(),
            &holidays(&[date(2024, 3, 30)]),
        );
        assert_eq!(count.working_days, 21);
        assert_eq!(count.weekends, 9);
        assert_eq!(count.holidays, 1);
    }

    /// WD-005: reversed range is all zeros
    #[test]
    fn test_wd_005_reversed_range() {
        let count = count_working_days(
            date(2024, 3, 31),
            date(2024, 3, 1),
            &Workweek::default(),
            &HolidaySet::new(),
        );
        assert_eq!(count, WorkingDaysCount::default());
    }

    #[test]
    fn test_single_day_range() {
        // 2024-03-04 is a Monday
        let count = count_working_days(
            date(2024, 3, 4),
            date(2024, 3, 4),
            &Workweek::default(),
            &HolidaySet::new(),
        );
        assert_eq!(count.total_days, 1);
        assert_eq!(count.working_days, 1);
    }

    #[test]
    fn test_holiday_outside_range_is_ignored() {
        let count = count_working_days(
            date(2024, 3, 1),
            date(2024, 3, 31),
            &Workweek::default(),
            &holidays(&[date(2024, 4, 1)]),
        );
        assert_eq!(count.holidays, 0);
    }

    #[test]
    fn test_sunday_to_thursday_workweek() {
        let workweek = Workweek::from(vec![
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
        ]);
        // 2024-03-01 is a Friday, 2024-03-03 a Sunday
        let count = count_working_days(
            date(2024, 3, 1),
            date(2024, 3, 3),
            &workweek,
            &HolidaySet::new(),
        );
        assert_eq!(count.working_days, 1);
        assert_eq!(count.weekends, 2);
    }

    #[test]
    fn test_workweek_serde_round_trip() {
        let workweek: Workweek = serde_json::from_str(r#"["Mon","Wed","Fri"]"#).unwrap();
        assert!(workweek.contains(Weekday::Wed));
        assert!(!workweek.contains(Weekday::Tue));
        let json = serde_json::to_string(&workweek).unwrap();
        assert_eq!(json, r#"["Mon","Wed","Fri"]"#);
    }

    #[test]
    fn test_empty_workweek() {
        assert!(Workweek::from(Vec::new()).is_empty());
        assert!(!Workweek::default().is_empty());
    }

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..3000).prop_map(|offset| date(2020, 1, 1) + chrono::Duration::days(offset))
    }

    fn any_workweek() -> impl Strategy<Value = Workweek> {
        proptest::array::uniform7(any::<bool>()).prop_map(|days| Workweek { days })
    }

    proptest! {
        #[test]
        fn prop_categories_sum_to_total(
            start in any_date(),
            end in any_date(),
            workweek in any_workweek(),
            holiday_dates in proptest::collection::vec(any_date(), 0..20),
        ) {
            let holidays: HolidaySet = holiday_dates.into_iter().collect();
            let count = count_working_days(start, end, &workweek, &holidays);
            prop_assert_eq!(
                count.total_days,
                count.working_days + count.weekends + count.holidays
            );
            if start <= end {
                prop_assert_eq!(i64::from(count.total_days), (end - start).num_days() + 1);
            } else {
                prop_assert_eq!(count.total_days, 0);
            }
        }
    }
}
