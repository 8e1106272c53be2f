//! New Zealand business calendar
//!
//! Business time is Monday to Friday within the configured working hours,
//! in Pacific/Auckland local time, excluding national public holidays and
//! any configured extra closure days.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Pacific::Auckland;
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::traits::BusinessCalendar;
use crate::types::{LedgerError, LedgerResult};

const NZST_OFFSET_HOURS: i64 = 12;

/// A public holiday on its observed (possibly Mondayised) date
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

impl Holiday {
    fn new(date: NaiveDate, name: &str) -> Self {
        Self {
            date,
            name: name.to_string(),
        }
    }
}

/// Read-only outlook on the next public holiday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HolidayStatus {
    Next { name: String, date: NaiveDate },
    NoneUpcoming,
    /// Holiday data could not be obtained
    Unavailable,
}

/// UTC offset of Pacific/Auckland at an instant, in whole hours
pub fn nz_offset_hours(instant: DateTime<Utc>) -> i64 {
    i64::from(instant.with_timezone(&Auckland).offset().fix().local_minus_utc()) / 3600
}

/// Wall-clock time in Auckland
pub fn to_nz_local(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&Auckland).naive_local()
}

/// Instant at which a local Auckland date begins.
///
/// Daylight transitions happen at 02:00/03:00, so local midnight always
/// exists exactly once.
pub fn nz_start_of_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    Auckland
        .from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| (midnight - Duration::hours(NZST_OFFSET_HOURS)).and_utc())
}

/// Easter Sunday (anonymous Gregorian algorithm)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Matariki dates fixed by the Te Kāhui o Matariki Public Holiday Act 2022
fn matariki(year: i32) -> Option<NaiveDate> {
    let (month, day) = match year {
        2022 => (6, 24),
        2023 => (7, 14),
        2024 => (6, 28),
        2025 => (6, 20),
        2026 => (7, 10),
        2027 => (6, 25),
        2028 => (7, 14),
        2029 => (7, 6),
        2030 => (6, 21),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Weekend holidays move to the following Monday
fn mondayise(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date + Duration::days(2),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// Observed dates of a consecutive holiday pair (New Year, Christmas)
fn mondayise_pair(first: NaiveDate) -> (NaiveDate, NaiveDate) {
    let second = first + Duration::days(1);
    match first.weekday() {
        Weekday::Fri => (first, first + Duration::days(3)),
        Weekday::Sat => (first + Duration::days(2), first + Duration::days(3)),
        Weekday::Sun => (first + Duration::days(2), second),
        _ => (first, second),
    }
}

/// National public holidays for a year, ordered by observed date
pub fn nz_public_holidays(year: i32) -> Vec<Holiday> {
    let mut holidays = Vec::new();

    if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
        let (first, second) = mondayise_pair(new_year);
        holidays.push(Holiday::new(first, "New Year's Day"));
        holidays.push(Holiday::new(second, "Day after New Year's Day"));
    }
    if let Some(waitangi) = NaiveDate::from_ymd_opt(year, 2, 6) {
        holidays.push(Holiday::new(mondayise(waitangi), "Waitangi Day"));
    }
    if let Some(easter) = easter_sunday(year) {
        holidays.push(Holiday::new(easter - Duration::days(2), "Good Friday"));
        holidays.push(Holiday::new(easter + Duration::days(1), "Easter Monday"));
    }
    if let Some(anzac) = NaiveDate::from_ymd_opt(year, 4, 25) {
        holidays.push(Holiday::new(mondayise(anzac), "ANZAC Day"));
    }
    if let Some(birthday) = NaiveDate::from_weekday_of_month_opt(year, 6, Weekday::Mon, 1) {
        let name = if year >= 2023 {
            "King's Birthday"
        } else {
            "Queen's Birthday"
        };
        holidays.push(Holiday::new(birthday, name));
    }
    if let Some(date) = matariki(year) {
        holidays.push(Holiday::new(date, "Matariki"));
    }
    if let Some(labour) = NaiveDate::from_weekday_of_month_opt(year, 10, Weekday::Mon, 4) {
        holidays.push(Holiday::new(labour, "Labour Day"));
    }
    if let Some(christmas) = NaiveDate::from_ymd_opt(year, 12, 25) {
        let (first, second) = mondayise_pair(christmas);
        holidays.push(Holiday::new(first, "Christmas Day"));
        holidays.push(Holiday::new(second, "Boxing Day"));
    }

    holidays.sort();
    holidays
}

/// Business calendar for New Zealand, built from the ledger configuration
#[derive(Debug, Clone)]
pub struct NzBusinessCalendar {
    jurisdiction: String,
    hours_start: NaiveTime,
    hours_end: NaiveTime,
    extra_holidays: Vec<NaiveDate>,
    holiday_data: bool,
}

impl NzBusinessCalendar {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            jurisdiction: config.jurisdiction.to_lowercase(),
            hours_start: config.business_hours_start,
            hours_end: config.business_hours_end,
            extra_holidays: config.extra_holidays.clone(),
            holiday_data: config.capabilities.holiday_calendar,
        }
    }

    fn holidays_for_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<Holiday>> {
        if !self.holiday_data {
            return Err(LedgerError::DependencyUnavailable(
                "holiday data not available".to_string(),
            ));
        }

        let mut holidays: Vec<Holiday> = (start.year()..=end.year())
            .flat_map(nz_public_holidays)
            .chain(
                self.extra_holidays
                    .iter()
                    .map(|date| Holiday::new(*date, "Business closure")),
            )
            .filter(|holiday| holiday.date >= start && holiday.date <= end)
            .collect();
        holidays.sort();
        holidays.dedup_by(|a, b| a.date == b.date);
        Ok(holidays)
    }

    /// Whether a local date is a holiday; always false when holiday data is
    /// switched off.
    fn is_holiday(&self, date: NaiveDate) -> LedgerResult<bool> {
        if !self.holiday_data {
            return Ok(false);
        }
        Ok(!self.holidays_for_range(date, date)?.is_empty())
    }

    pub fn is_business_day(&self, date: NaiveDate) -> LedgerResult<bool> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(false);
        }
        Ok(!self.is_holiday(date)?)
    }

    /// First business day strictly after `date`
    pub fn next_business_day(&self, date: NaiveDate) -> LedgerResult<NaiveDate> {
        let mut candidate = date + Duration::days(1);
        while !self.is_business_day(candidate)? {
            candidate += Duration::days(1);
        }
        Ok(candidate)
    }

    /// Business days in `[from, to)`
    pub fn business_days_until(&self, from: NaiveDate, to: NaiveDate) -> LedgerResult<u32> {
        let mut count = 0;
        let mut day = from;
        while day < to {
            if self.is_business_day(day)? {
                count += 1;
            }
            day += Duration::days(1);
        }
        Ok(count)
    }
}

impl BusinessCalendar for NzBusinessCalendar {
    fn holidays_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        jurisdiction: &str,
    ) -> LedgerResult<Vec<Holiday>> {
        if !jurisdiction.eq_ignore_ascii_case(&self.jurisdiction) {
            return Err(LedgerError::DependencyUnavailable(format!(
                "no holiday data for jurisdiction '{}'",
                jurisdiction
            )));
        }
        self.holidays_for_range(start, end)
    }

    fn is_business_time(&self, instant: DateTime<Utc>) -> LedgerResult<bool> {
        let local = to_nz_local(instant);
        let time = local.time();
        if time < self.hours_start || time >= self.hours_end {
            return Ok(false);
        }
        self.is_business_day(local.date())
    }
}

/// Next upcoming holiday within a year of `today`.
///
/// Status queries never fail: missing holiday data reports `Unavailable`.
pub fn next_holiday_status(
    calendar: &dyn BusinessCalendar,
    jurisdiction: &str,
    today: NaiveDate,
) -> HolidayStatus {
    match calendar.holidays_between(today, today + Duration::days(365), jurisdiction) {
        Ok(holidays) => match holidays.into_iter().next() {
            Some(holiday) => HolidayStatus::Next {
                name: holiday.name,
                date: holiday.date,
            },
            None => HolidayStatus::NoneUpcoming,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Holiday outlook unavailable");
            HolidayStatus::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> NzBusinessCalendar {
        NzBusinessCalendar::new(&LedgerConfig::default())
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2024), Some(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(date(2025, 4, 20)));
    }

    #[test]
    fn test_holidays_2024() {
        let dates: Vec<NaiveDate> = nz_public_holidays(2024).into_iter().map(|h| h.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 2),
                date(2024, 2, 6),
                date(2024, 3, 29),
                date(2024, 4, 1),
                date(2024, 4, 25),
                date(2024, 6, 3),
                date(2024, 6, 28),
                date(2024, 10, 28),
                date(2024, 12, 25),
                date(2024, 12, 26),
            ]
        );
    }

    #[test]
    fn test_christmas_mondayisation() {
        // 2021: Christmas on Saturday, Boxing Day on Sunday
        let holidays = nz_public_holidays(2021);
        assert!(holidays.contains(&Holiday::new(date(2021, 12, 27), "Christmas Day")));
        assert!(holidays.contains(&Holiday::new(date(2021, 12, 28), "Boxing Day")));

        // 2022: Christmas on Sunday, Boxing Day stays on Monday
        let holidays = nz_public_holidays(2022);
        assert!(holidays.contains(&Holiday::new(date(2022, 12, 27), "Christmas Day")));
        assert!(holidays.contains(&Holiday::new(date(2022, 12, 26), "Boxing Day")));
    }

    #[test]
    fn test_daylight_saving_offsets() {
        assert_eq!(nz_offset_hours(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()), 13);
        assert_eq!(nz_offset_hours(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()), 12);
        // DST ended at 2024-04-07 03:00 NZDT = 2024-04-06 14:00 UTC
        assert_eq!(nz_offset_hours(Utc.with_ymd_and_hms(2024, 4, 6, 13, 59, 0).unwrap()), 13);
        assert_eq!(nz_offset_hours(Utc.with_ymd_and_hms(2024, 4, 6, 14, 0, 0).unwrap()), 12);
        // DST began at 2024-09-29 02:00 NZST = 2024-09-28 14:00 UTC
        assert_eq!(nz_offset_hours(Utc.with_ymd_and_hms(2024, 9, 28, 14, 0, 0).unwrap()), 13);
    }

    #[test]
    fn test_business_time() {
        let calendar = calendar();
        // Monday 4 March 2024, 14:00 NZDT
        assert!(calendar
            .is_business_time(Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap())
            .unwrap());
        // Monday 1 July 2024, 18:00 NZST
        assert!(!calendar
            .is_business_time(Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap())
            .unwrap());
        // Saturday 2 March 2024, 11:00 NZDT
        assert!(!calendar
            .is_business_time(Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap())
            .unwrap());
        // Thursday 25 April 2024 (ANZAC Day), 11:00 NZST
        assert!(!calendar
            .is_business_time(Utc.with_ymd_and_hms(2024, 4, 24, 23, 0, 0).unwrap())
            .unwrap());
    }

    #[test]
    fn test_business_hours_edges() {
        let calendar = calendar();
        // Tuesday 2 July 2024: 09:00 NZST is 21:00 UTC the previous day
        assert!(calendar
            .is_business_time(Utc.with_ymd_and_hms(2024, 7, 1, 21, 0, 0).unwrap())
            .unwrap());
        // 17:00 NZST is outside the window
        assert!(!calendar
            .is_business_time(Utc.with_ymd_and_hms(2024, 7, 2, 5, 0, 0).unwrap())
            .unwrap());
    }

    #[test]
    fn test_degraded_calendar_ignores_holidays() {
        let mut config = LedgerConfig::default();
        config.capabilities.holiday_calendar = false;
        let calendar = NzBusinessCalendar::new(&config);

        assert!(calendar
            .is_business_time(Utc.with_ymd_and_hms(2024, 4, 24, 23, 0, 0).unwrap())
            .unwrap());
        assert_eq!(
            next_holiday_status(&calendar, "nz", date(2024, 4, 1)),
            HolidayStatus::Unavailable
        );
    }

    #[test]
    fn test_extra_holidays_and_business_days() {
        let mut config = LedgerConfig::default();
        config.extra_holidays = vec![date(2024, 3, 5)];
        let calendar = NzBusinessCalendar::new(&config);

        assert!(!calendar.is_business_day(date(2024, 3, 5)).unwrap());
        assert_eq!(calendar.next_business_day(date(2024, 3, 4)).unwrap(), date(2024, 3, 6));
        // Thursday 28 March -> Good Friday, weekend, Easter Monday
        assert_eq!(calendar.next_business_day(date(2024, 3, 28)).unwrap(), date(2024, 4, 2));
        assert_eq!(
            calendar.business_days_until(date(2024, 3, 25), date(2024, 4, 3)).unwrap(),
            5
        );
    }

    #[test]
    fn test_next_holiday_status() {
        let calendar = calendar();
        assert_eq!(
            next_holiday_status(&calendar, "NZ", date(2024, 4, 2)),
            HolidayStatus::Next {
                name: "ANZAC Day".to_string(),
                date: date(2024, 4, 25),
            }
        );
        assert_eq!(
            next_holiday_status(&calendar, "au", date(2024, 4, 2)),
            HolidayStatus::Unavailable
        );
    }

    #[test]
    fn test_local_start_of_day() {
        assert_eq!(
            nz_start_of_day(date(2024, 1, 1)),
            Utc.with_ymd_and_hms(2023, 12, 31, 11, 0, 0).unwrap()
        );
        assert_eq!(
            nz_start_of_day(date(2024, 7, 1)),
            Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
        );
        assert_eq!(to_nz_local(nz_start_of_day(date(2024, 9, 29))).time(), NaiveTime::MIN);
    }
}
