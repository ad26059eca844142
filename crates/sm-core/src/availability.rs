//! Available working hours per calendar day.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::breaks::BreakStrategy;
use crate::policy::WorkingHoursPolicy;
use crate::record::seconds_of_day;

/// How many hours a day contributes to the availability envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvailabilityStrategy {
    /// Today runs from the window start up to `now`, less the penalties of
    /// breaks that are already over. Every other date counts the whole window
    /// less the past-day allowance.
    DynamicWorkdayWithBreaks,
    /// Every date counts the same number of hours.
    FlatDailyConstant(f64),
}

/// Hours available on one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyAvailability {
    pub date: NaiveDate,
    pub hours: f64,
}

impl AvailabilityStrategy {
    /// Available hours on `date` as seen at `now`.
    pub fn day_hours(self, policy: &WorkingHoursPolicy, date: NaiveDate, now: NaiveDateTime) -> f64 {
        match self {
            Self::FlatDailyConstant(hours) => hours,
            Self::DynamicWorkdayWithBreaks if date == now.date() => {
                let now_seconds = seconds_of_day(now.time());
                if now_seconds < policy.day_start_seconds {
                    return 0.0;
                }
                let end = now_seconds.min(policy.day_end_seconds);
                let gross = f64::from(end - policy.day_start_seconds) / 3600.0;
                BreakStrategy::Subtraction.apply(
                    &policy.breaks,
                    policy.day_start_seconds,
                    now_seconds,
                    gross,
                )
            }
            Self::DynamicWorkdayWithBreaks => {
                policy.window_hours() - policy.past_day_allowance_hours
            }
        }
    }

    /// Availability for each distinct date, in date order.
    pub fn daily<'d, I>(
        self,
        policy: &WorkingHoursPolicy,
        dates: I,
        now: NaiveDateTime,
    ) -> Vec<DailyAvailability>
    where
        I: IntoIterator<Item = &'d NaiveDate>,
    {
        let distinct: BTreeSet<NaiveDate> = dates.into_iter().copied().collect();
        distinct
            .into_iter()
            .map(|date| DailyAvailability {
                date,
                hours: self.day_hours(policy, date, now),
            })
            .collect()
    }

    /// Sum of available hours over the distinct dates.
    pub fn total_hours<'d, I>(self, policy: &WorkingHoursPolicy, dates: I, now: NaiveDateTime) -> f64
    where
        I: IntoIterator<Item = &'d NaiveDate>,
    {
        self.daily(policy, dates, now)
            .iter()
            .map(|day| day.hours)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn at(day: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{day} {time}"), "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn today_at_three_pm() {
        let policy = WorkingHoursPolicy::default();
        let hours = AvailabilityStrategy::DynamicWorkdayWithBreaks.day_hours(
            &policy,
            date("2025-01-06"),
            at("2025-01-06", "15:00"),
        );
        assert!((hours - 5.75).abs() < 1e-9, "{hours}");
    }

    #[test]
    fn today_before_window_opens_is_zero() {
        let policy = WorkingHoursPolicy::default();
        let hours = AvailabilityStrategy::DynamicWorkdayWithBreaks.day_hours(
            &policy,
            date("2025-01-06"),
            at("2025-01-06", "07:30"),
        );
        assert!(hours.abs() < f64::EPSILON);
    }

    #[test]
    fn today_after_close_charges_every_break() {
        let policy = WorkingHoursPolicy::default();
        let hours = AvailabilityStrategy::DynamicWorkdayWithBreaks.day_hours(
            &policy,
            date("2025-01-06"),
            at("2025-01-06", "21:00"),
        );
        let expected = policy.window_hours() - 60.0 / 60.0;
        assert!((hours - expected).abs() < 1e-9, "{hours}");
    }

    #[test]
    fn past_date_uses_flat_allowance() {
        let policy = WorkingHoursPolicy::default();
        let hours = AvailabilityStrategy::DynamicWorkdayWithBreaks.day_hours(
            &policy,
            date("2025-01-03"),
            at("2025-01-06", "15:00"),
        );
        assert!((hours - 10.1667).abs() < 1e-3, "{hours}");
    }

    #[test]
    fn totals_count_each_date_once() {
        let policy = WorkingHoursPolicy::default();
        let now = at("2025-01-06", "15:00");
        let dates = [
            date("2025-01-03"),
            date("2025-01-06"),
            date("2025-01-03"),
        ];

        let dynamic = AvailabilityStrategy::DynamicWorkdayWithBreaks.total_hours(&policy, &dates, now);
        assert!((dynamic - (40_200.0 / 3600.0 - 1.0 + 5.75)).abs() < 1e-9);

        let flat = AvailabilityStrategy::FlatDailyConstant(11.0).total_hours(&policy, &dates, now);
        assert!((flat - 22.0).abs() < f64::EPSILON);

        let daily = AvailabilityStrategy::FlatDailyConstant(11.0).daily(&policy, &dates, now);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, date("2025-01-03"));
    }
}
