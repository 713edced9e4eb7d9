//! Dashboard metric calculations.
//!
//! Every percentage shown on a card goes through [`calculate_change`], which
//! returns 0 instead of dividing by a zero baseline.

use chrono::NaiveDate;
use serde::Serialize;

use crate::attendance::{AttendanceRecord, AttendanceSource};
use crate::error::Result;
use crate::types::DateRange;

/// Percent change from `previous` to `current`; 0 when `previous` is 0.
#[allow(clippy::float_cmp)]
pub fn calculate_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Mean of the non-NaN values, or 0 when there are none.
#[allow(clippy::cast_precision_loss)]
pub fn calculate_average(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// A single dashboard card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Card title.
    pub title: String,
    /// Headline value (rounded period average).
    pub value: i64,
    /// Percent change versus the previous period.
    pub change: f64,
    /// Per-service data points for the chart.
    pub trend: Vec<TrendPoint>,
}

/// Attendance counts for one service date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// Service date.
    pub date: NaiveDate,
    /// Everyone.
    pub total: u32,
    /// Adults.
    pub adults: u32,
    /// Youth.
    pub youth: u32,
    /// Children.
    pub kids: u32,
}

impl From<&AttendanceRecord> for TrendPoint {
    fn from(r: &AttendanceRecord) -> Self {
        Self {
            date: r.date,
            total: r.total,
            adults: r.adult,
            youth: r.youth,
            kids: r.kids,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum AttendanceColumn {
    Total,
    Adult,
    Youth,
    Kids,
}

impl AttendanceColumn {
    const ALL: [Self; 4] = [Self::Total, Self::Adult, Self::Youth, Self::Kids];

    const fn title(self) -> &'static str {
        match self {
            Self::Total => "Total Attendance",
            Self::Adult => "Adult Attendance",
            Self::Youth => "Youth Attendance",
            Self::Kids => "Kids Attendance",
        }
    }

    const fn count(self, r: &AttendanceRecord) -> u32 {
        match self {
            Self::Total => r.total,
            Self::Adult => r.adult,
            Self::Youth => r.youth,
            Self::Kids => r.kids,
        }
    }

    fn average(self, records: &[AttendanceRecord]) -> f64 {
        let values: Vec<f64> = records.iter().map(|r| f64::from(self.count(r))).collect();
        calculate_average(&values)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_count(value: f64) -> i64 {
    value.round() as i64
}

/// Zero-valued attendance cards, shown when the period has no data.
pub fn empty_attendance_metrics() -> Vec<Metric> {
    AttendanceColumn::ALL
        .iter()
        .map(|col| Metric {
            title: col.title().to_string(),
            value: 0,
            change: 0.0,
            trend: Vec::new(),
        })
        .collect()
}

/// Attendance cards for `range`, compared with the preceding period of equal length.
pub async fn attendance_metrics(source: &dyn AttendanceSource, range: &DateRange) -> Result<Vec<Metric>> {
    let mut current = source.fetch_attendance(range).await?;
    if current.is_empty() {
        return Ok(empty_attendance_metrics());
    }
    current.sort_by_key(|r| r.date);

    let previous = source.fetch_attendance(&range.previous()).await?;
    let trend: Vec<TrendPoint> = current.iter().map(TrendPoint::from).collect();

    Ok(AttendanceColumn::ALL
        .iter()
        .map(|col| {
            let now = col.average(&current);
            let before = col.average(&previous);
            Metric {
                title: col.title().to_string(),
                value: round_count(now),
                change: calculate_change(now, before),
                trend: trend.clone(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    #[test]
    fn change_matches_scenarios() {
        assert_eq!(calculate_change(450.0, 400.0), 12.5);
        assert_eq!(calculate_change(0.0, 0.0), 0.0);
        assert_eq!(calculate_change(100.0, 0.0), 0.0);
        assert_eq!(calculate_change(300.0, 400.0), -25.0);
    }

    #[test]
    fn change_with_zero_baseline_is_always_zero() {
        for current in [-5.0, 0.0, 1e-9, 42.0, f64::MAX] {
            assert_eq!(calculate_change(current, 0.0), 0.0);
        }
        assert_eq!(calculate_change(7.0, -0.0), 0.0);
    }

    #[test]
    fn change_is_exact_for_nonzero_baselines() {
        for (current, previous) in [(1.0, 3.0), (10.0, 1e-12), (-4.0, 8.0)] {
            assert_eq!(calculate_change(current, previous), (current - previous) / previous * 100.0);
        }
    }

    #[test]
    fn average_skips_nan_and_handles_empty() {
        assert_eq!(calculate_average(&[]), 0.0);
        assert_eq!(calculate_average(&[f64::NAN]), 0.0);
        assert_eq!(calculate_average(&[1.0, f64::NAN, 3.0]), 2.0);
    }

    struct FakeSource {
        current: Vec<AttendanceRecord>,
        previous: Vec<AttendanceRecord>,
        split: NaiveDate,
    }

    #[async_trait]
    impl AttendanceSource for FakeSource {
        async fn fetch_attendance(&self, range: &DateRange) -> Result<Vec<AttendanceRecord>> {
            Ok(if range.start_date() >= self.split {
                self.current.clone()
            } else {
                self.previous.clone()
            })
        }
    }

    fn record(day: u32, adult: u32, kids: u32, youth: u32) -> AttendanceRecord {
        AttendanceRecord {
            row_id: i64::from(day),
            date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            adult,
            kids,
            youth,
            total: adult + kids + youth,
        }
    }

    fn february() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn empty_period_yields_zero_cards() {
        let source = FakeSource {
            current: vec![],
            previous: vec![record(1, 1, 1, 1)],
            split: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        let metrics = attendance_metrics(&source, &february()).await.unwrap();
        assert_eq!(metrics, empty_attendance_metrics());
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[3].title, "Kids Attendance");
    }

    #[tokio::test]
    async fn cards_compare_with_previous_period() {
        let source = FakeSource {
            current: vec![record(18, 320, 80, 50), record(4, 300, 60, 40)],
            previous: vec![record(1, 300, 70, 30)],
            split: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        let metrics = attendance_metrics(&source, &february()).await.unwrap();

        let total = &metrics[0];
        assert_eq!(total.title, "Total Attendance");
        assert_eq!(total.value, 425);
        assert_eq!(total.change, calculate_change(425.0, 400.0));

        let adult = &metrics[1];
        assert_eq!(adult.value, 310);
        assert_eq!(adult.change, calculate_change(310.0, 300.0));

        // Trend is sorted chronologically.
        assert_eq!(total.trend[0].date, NaiveDate::from_ymd_opt(2024, 2, 4).unwrap());
        assert_eq!(total.trend[1].adults, 320);
    }

    #[tokio::test]
    async fn missing_previous_period_reports_no_change() {
        let source = FakeSource {
            current: vec![record(4, 10, 0, 0)],
            previous: vec![],
            split: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        let metrics = attendance_metrics(&source, &february()).await.unwrap();
        assert!(metrics.iter().all(|m| m.change == 0.0));
    }
}
