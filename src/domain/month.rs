//! Month-end calendar helpers.
//!
//! Every monthly table in the crate is keyed by the last calendar day of the
//! month, so data from different providers joins on equal dates.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Month-end of the month after the one containing `date`.
pub fn next_month_end(date: NaiveDate) -> NaiveDate {
    let end = month_end(date);
    end.succ_opt().map(month_end).unwrap_or(end)
}

/// Consecutive month-ends from the month of `first` to the month of `last`.
pub fn month_ends_between(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let last = month_end(last);
    let mut cur = month_end(first);
    while cur <= last {
        out.push(cur);
        let next = next_month_end(cur);
        if next == cur {
            break;
        }
        cur = next;
    }
    out
}

/// How daily observations collapse into one monthly value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlyAgg {
    Mean,
    Last,
}

/// Resample dated observations onto a continuous month-end grid.
///
/// Months between the first and last observation with no finite value are
/// kept as NaN, so positional shifts downstream stay calendar-aligned.
pub fn resample_monthly(obs: &[(NaiveDate, f64)], agg: MonthlyAgg) -> Vec<(NaiveDate, f64)> {
    let Some(first) = obs.iter().map(|(d, _)| *d).min() else {
        return Vec::new();
    };
    let last = obs.iter().map(|(d, _)| *d).max().unwrap_or(first);

    let mut buckets: BTreeMap<NaiveDate, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for &(date, value) in obs {
        if value.is_finite() {
            buckets.entry(month_end(date)).or_default().push((date, value));
        }
    }

    month_ends_between(first, last)
        .into_iter()
        .map(|m| {
            let value = match buckets.get_mut(&m) {
                None => f64::NAN,
                Some(values) => match agg {
                    MonthlyAgg::Mean => {
                        values.iter().map(|(_, v)| v).sum::<f64>() / values.len() as f64
                    }
                    MonthlyAgg::Last => {
                        values.sort_by_key(|(d, _)| *d);
                        values.last().map(|(_, v)| *v).unwrap_or(f64::NAN)
                    }
                },
            };
            (m, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_end_handles_leap_years_and_december() {
        assert_eq!(month_end(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_end(d(2023, 2, 1)), d(2023, 2, 28));
        assert_eq!(month_end(d(2021, 12, 5)), d(2021, 12, 31));
        assert_eq!(month_end(d(2021, 1, 31)), d(2021, 1, 31));
    }

    #[test]
    fn month_range_is_inclusive() {
        let months = month_ends_between(d(2021, 11, 15), d(2022, 2, 1));
        assert_eq!(
            months,
            vec![d(2021, 11, 30), d(2021, 12, 31), d(2022, 1, 31), d(2022, 2, 28)]
        );
    }

    #[test]
    fn resample_fills_gaps_and_aggregates() {
        let obs = vec![
            (d(2021, 1, 4), 1.0),
            (d(2021, 1, 20), 3.0),
            (d(2021, 3, 2), f64::NAN),
            (d(2021, 3, 31), 5.0),
        ];
        let mean = resample_monthly(&obs, MonthlyAgg::Mean);
        assert_eq!(mean.len(), 3);
        assert_eq!(mean[0], (d(2021, 1, 31), 2.0));
        assert!(mean[1].1.is_nan());
        assert_eq!(mean[2], (d(2021, 3, 31), 5.0));

        let last = resample_monthly(&obs, MonthlyAgg::Last);
        assert_eq!(last[0].1, 3.0);
    }
}
