//! Time index types: range, integer and datetime labels

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use std::fmt;

/// Spacing between consecutive datetime labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Fixed-length step (days, hours, minutes, ...)
    Fixed(Duration),
    /// Calendar step of `n` months, anchored on the day of month
    Months(u32),
    /// Calendar step of `n` months, anchored on the last day of the month
    MonthEnd(u32),
}

impl Frequency {
    pub fn days(n: i64) -> Self {
        Frequency::Fixed(Duration::days(n))
    }

    pub fn hours(n: i64) -> Self {
        Frequency::Fixed(Duration::hours(n))
    }

    pub fn minutes(n: i64) -> Self {
        Frequency::Fixed(Duration::minutes(n))
    }

    pub fn months(n: u32) -> Self {
        Frequency::Months(n)
    }

    pub fn month_end(n: u32) -> Self {
        Frequency::MonthEnd(n)
    }

    /// Parse a pandas-style offset alias such as `D`, `3h`, `15min`, `MS`.
    ///
    /// `M`, `Q` and `Y` (and their `E` forms) are month-end anchored.
    pub fn parse(alias: &str) -> Result<Self> {
        let alias = alias.trim();
        let split = alias
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(alias.len());
        let (count, unit) = alias.split_at(split);
        let n: i64 = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| {
                ForecastError::value_error(format!("Invalid frequency alias '{}'.", alias))
            })?
        };
        if n < 1 {
            return Err(ForecastError::value_error(format!(
                "Frequency multiplier must be positive. Got '{}'.",
                alias
            )));
        }

        let months = |factor: i64| {
            n.checked_mul(factor)
                .and_then(|m| u32::try_from(m).ok())
                .ok_or_else(|| {
                    ForecastError::value_error(format!("Invalid frequency alias '{}'.", alias))
                })
        };

        let freq = match unit {
            "D" => Frequency::Fixed(Duration::days(n)),
            "W" => Frequency::Fixed(Duration::weeks(n)),
            "h" | "H" => Frequency::Fixed(Duration::hours(n)),
            "min" | "T" => Frequency::Fixed(Duration::minutes(n)),
            "s" | "S" => Frequency::Fixed(Duration::seconds(n)),
            "ms" | "L" => Frequency::Fixed(Duration::milliseconds(n)),
            "MS" => Frequency::Months(months(1)?),
            "QS" => Frequency::Months(months(3)?),
            "YS" | "AS" => Frequency::Months(months(12)?),
            "M" | "ME" => Frequency::MonthEnd(months(1)?),
            "Q" | "QE" => Frequency::MonthEnd(months(3)?),
            "Y" | "YE" | "A" => Frequency::MonthEnd(months(12)?),
            _ => {
                return Err(ForecastError::value_error(format!(
                    "Invalid frequency alias '{}'.",
                    alias
                )))
            }
        };
        Ok(freq)
    }

    /// Move `dt` forward (or backward for negative `n`) by `n` steps.
    pub fn advance(&self, dt: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
        match *self {
            Frequency::Fixed(step) => {
                let shift = step.checked_mul(i32::try_from(n).ok()?)?;
                dt.checked_add_signed(shift)
            }
            Frequency::Months(m) => shift_months(dt, m, n),
            Frequency::MonthEnd(m) => {
                let shifted = shift_months(dt, m, n)?;
                let last_day = last_day_of_month(shifted.year(), shifted.month())?;
                Some(last_day.and_time(dt.time()))
            }
        }
    }

    /// Largest `k` such that `from + k * freq <= to`. Zero when `to < from`.
    pub fn steps_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> usize {
        if to < from {
            return 0;
        }
        match *self {
            Frequency::Fixed(step) => {
                let step_ms = step.num_milliseconds();
                if step_ms <= 0 {
                    return 0;
                }
                (to.signed_duration_since(from).num_milliseconds() / step_ms) as usize
            }
            Frequency::Months(_) | Frequency::MonthEnd(_) => {
                let mut k = 0usize;
                while let Some(next) = self.advance(from, k as i64 + 1) {
                    if next > to {
                        break;
                    }
                    k += 1;
                }
                k
            }
        }
    }

    /// Infer the frequency of regularly spaced datetimes.
    pub fn infer(values: &[NaiveDateTime]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let step = values[1].signed_duration_since(values[0]);
        if step > Duration::zero()
            && values
                .windows(2)
                .all(|w| w[1].signed_duration_since(w[0]) == step)
        {
            return Some(Frequency::Fixed(step));
        }

        let month_diff = (values[1].year() - values[0].year()) * 12 + values[1].month() as i32
            - values[0].month() as i32;
        if month_diff <= 0 {
            return None;
        }
        let month_end = values
            .iter()
            .all(|v| last_day_of_month(v.year(), v.month()) == Some(v.date()));
        let freq = if month_end {
            Frequency::MonthEnd(month_diff as u32)
        } else {
            Frequency::Months(month_diff as u32)
        };
        let regular = values
            .windows(2)
            .all(|w| freq.advance(w[0], 1) == Some(w[1]));
        regular.then_some(freq)
    }
}

fn shift_months(dt: NaiveDateTime, m: u32, n: i64) -> Option<NaiveDateTime> {
    let total = (m as i64).checked_mul(n.checked_abs()?)?;
    let months = Months::new(u32::try_from(total).ok()?);
    if n >= 0 {
        dt.checked_add_months(months)
    } else {
        dt.checked_sub_months(months)
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Kind of a [`TimeIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Range,
    Int,
    Datetime,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Range => "RangeIndex",
            IndexKind::Int => "Index",
            IndexKind::Datetime => "DatetimeIndex",
        };
        f.write_str(name)
    }
}

/// A single index label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexLabel {
    Int(i64),
    Datetime(NaiveDateTime),
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexLabel::Int(v) => write!(f, "{}", v),
            IndexLabel::Datetime(dt) => write!(f, "{}", dt),
        }
    }
}

/// Row labels of a [`Frame`](super::Frame)
#[derive(Debug, Clone, PartialEq)]
pub enum TimeIndex {
    /// Evenly spaced integers `start, start + step, ...`
    Range { start: i64, step: i64, len: usize },
    /// Arbitrary integer labels
    Int(Vec<i64>),
    /// Datetime labels, optionally with a known frequency
    Datetime {
        values: Vec<NaiveDateTime>,
        freq: Option<Frequency>,
    },
}

impl TimeIndex {
    /// `RangeIndex(start, stop)` with unit step
    pub fn range(start: i64, stop: i64) -> Self {
        TimeIndex::Range {
            start,
            step: 1,
            len: (stop - start).max(0) as usize,
        }
    }

    /// Datetime index whose frequency is inferred from the values
    pub fn datetime(values: Vec<NaiveDateTime>) -> Self {
        let freq = Frequency::infer(&values);
        TimeIndex::Datetime { values, freq }
    }

    /// `periods` datetimes starting at `start`, spaced by `freq`
    pub fn date_range(start: NaiveDateTime, periods: usize, freq: Frequency) -> Result<Self> {
        let values = (0..periods as i64)
            .map(|i| {
                freq.advance(start, i).ok_or_else(|| {
                    ForecastError::value_error("Date range is out of the supported bounds.")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TimeIndex::Datetime {
            values,
            freq: Some(freq),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            TimeIndex::Range { len, .. } => *len,
            TimeIndex::Int(v) => v.len(),
            TimeIndex::Datetime { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            TimeIndex::Range { .. } => IndexKind::Range,
            TimeIndex::Int(_) => IndexKind::Int,
            TimeIndex::Datetime { .. } => IndexKind::Datetime,
        }
    }

    pub fn freq(&self) -> Option<Frequency> {
        match self {
            TimeIndex::Datetime { freq, .. } => *freq,
            _ => None,
        }
    }

    pub fn as_datetimes(&self) -> Option<&[NaiveDateTime]> {
        match self {
            TimeIndex::Datetime { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Label at position `i`
    pub fn label(&self, i: usize) -> Option<IndexLabel> {
        if i >= self.len() {
            return None;
        }
        let label = match self {
            TimeIndex::Range { start, step, .. } => IndexLabel::Int(start + step * i as i64),
            TimeIndex::Int(v) => IndexLabel::Int(v[i]),
            TimeIndex::Datetime { values, .. } => IndexLabel::Datetime(values[i]),
        };
        Some(label)
    }

    pub fn labels(&self) -> Vec<IndexLabel> {
        (0..self.len()).filter_map(|i| self.label(i)).collect()
    }

    pub fn first(&self) -> Option<IndexLabel> {
        self.label(0)
    }

    pub fn last(&self) -> Option<IndexLabel> {
        self.len().checked_sub(1).and_then(|i| self.label(i))
    }

    /// Whether two indexes hold the same labels, regardless of variant
    pub fn labels_equal(&self, other: &TimeIndex) -> bool {
        self.len() == other.len() && (0..self.len()).all(|i| self.label(i) == other.label(i))
    }

    /// Position of `label`, if present
    pub fn position_of(&self, label: IndexLabel) -> Option<usize> {
        match (self, label) {
            (TimeIndex::Range { start, step, len }, IndexLabel::Int(v)) => {
                let offset = v - start;
                if *step == 0 || offset % step != 0 {
                    return None;
                }
                let pos = offset / step;
                (pos >= 0 && (pos as usize) < *len).then_some(pos as usize)
            }
            _ => (0..self.len()).find(|&i| self.label(i) == Some(label)),
        }
    }

    /// RangeIndex, or a DatetimeIndex with a known frequency
    pub fn is_regular(&self) -> bool {
        match self {
            TimeIndex::Range { .. } => true,
            TimeIndex::Datetime { freq, .. } => freq.is_some(),
            TimeIndex::Int(_) => false,
        }
    }

    /// Contiguous slice `[start, end)` keeping the index structure
    pub fn slice(&self, start: usize, end: usize) -> TimeIndex {
        let end = end.min(self.len());
        let start = start.min(end);
        match self {
            TimeIndex::Range { start: s, step, .. } => TimeIndex::Range {
                start: s + step * start as i64,
                step: *step,
                len: end - start,
            },
            TimeIndex::Int(v) => TimeIndex::Int(v[start..end].to_vec()),
            TimeIndex::Datetime { values, freq } => TimeIndex::Datetime {
                values: values[start..end].to_vec(),
                freq: *freq,
            },
        }
    }

    /// Labels at arbitrary positions. The result carries no frequency.
    pub fn take(&self, positions: &[usize]) -> Result<TimeIndex> {
        let mut out_int = Vec::new();
        let mut out_dt = Vec::new();
        for &p in positions {
            match self.label(p) {
                Some(IndexLabel::Int(v)) => out_int.push(v),
                Some(IndexLabel::Datetime(v)) => out_dt.push(v),
                None => {
                    return Err(ForecastError::Shape {
                        expected: format!("position < {}", self.len()),
                        actual: p.to_string(),
                    })
                }
            }
        }
        Ok(match self.kind() {
            IndexKind::Datetime => TimeIndex::Datetime {
                values: out_dt,
                freq: None,
            },
            _ => TimeIndex::Int(out_int),
        })
    }

    /// Stack indexes end to end. All parts must be of the same family.
    pub fn concat(parts: &[&TimeIndex]) -> Result<TimeIndex> {
        let is_datetime = parts.first().map_or(false, |p| p.kind() == IndexKind::Datetime);
        if parts
            .iter()
            .any(|p| (p.kind() == IndexKind::Datetime) != is_datetime)
        {
            return Err(ForecastError::type_error(
                "Cannot concatenate a DatetimeIndex with a non datetime index.",
            ));
        }
        if is_datetime {
            let values = parts
                .iter()
                .flat_map(|p| p.as_datetimes().unwrap_or(&[]).iter().copied())
                .collect();
            Ok(TimeIndex::Datetime { values, freq: None })
        } else {
            let values = parts
                .iter()
                .flat_map(|p| p.labels())
                .filter_map(|l| match l {
                    IndexLabel::Int(v) => Some(v),
                    IndexLabel::Datetime(_) => None,
                })
                .collect();
            Ok(TimeIndex::Int(values))
        }
    }

    /// The `steps` labels that follow the last label
    pub fn extend_future(&self, steps: usize) -> Result<TimeIndex> {
        match self {
            TimeIndex::Range { start, step, len } => Ok(TimeIndex::Range {
                start: start + step * *len as i64,
                step: *step,
                len: steps,
            }),
            TimeIndex::Int(values) => {
                let last = values.last().copied().unwrap_or(-1);
                Ok(TimeIndex::Range {
                    start: last + 1,
                    step: 1,
                    len: steps,
                })
            }
            TimeIndex::Datetime { values, freq } => {
                let freq = freq.ok_or_else(|| {
                    ForecastError::value_error(
                        "The DatetimeIndex has no frequency. Future labels cannot be generated.",
                    )
                })?;
                let last = values.last().copied().ok_or_else(|| {
                    ForecastError::value_error("Cannot extend an empty index.")
                })?;
                let start = freq.advance(last, 1).ok_or_else(|| {
                    ForecastError::value_error("Date range is out of the supported bounds.")
                })?;
                TimeIndex::date_range(start, steps, freq)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1990, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_range_labels_and_slice() {
        let idx = TimeIndex::range(6, 16);
        assert_eq!(idx.len(), 10);
        assert_eq!(idx.label(0), Some(IndexLabel::Int(6)));
        assert_eq!(idx.last(), Some(IndexLabel::Int(15)));

        let sliced = idx.slice(5, 10);
        assert_eq!(sliced, TimeIndex::Range { start: 11, step: 1, len: 5 });
        assert_eq!(idx.position_of(IndexLabel::Int(9)), Some(3));
        assert_eq!(idx.position_of(IndexLabel::Int(20)), None);
    }

    #[test]
    fn test_frequency_inference() {
        let values: Vec<_> = (1..=5).map(day).collect();
        let idx = TimeIndex::datetime(values);
        assert_eq!(idx.freq(), Some(Frequency::days(1)));

        let monthly = vec![
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        ];
        assert_eq!(Frequency::infer(&monthly), Some(Frequency::Months(1)));

        let irregular = vec![day(1), day(2), day(5)];
        assert_eq!(Frequency::infer(&irregular), None);
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!(Frequency::parse("D").unwrap(), Frequency::days(1));
        assert_eq!(Frequency::parse("15min").unwrap(), Frequency::minutes(15));
        assert_eq!(Frequency::parse("MS").unwrap(), Frequency::Months(1));
        assert_eq!(Frequency::parse("ME").unwrap(), Frequency::MonthEnd(1));
        assert_eq!(Frequency::parse("Q").unwrap(), Frequency::MonthEnd(3));
        assert!(Frequency::parse("fortnight").is_err());
    }

    #[test]
    fn test_month_end_frequency() {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let idx = TimeIndex::datetime(vec![
            ymd(2020, 1, 31),
            ymd(2020, 2, 29),
            ymd(2020, 3, 31),
            ymd(2020, 4, 30),
        ]);
        assert_eq!(idx.freq(), Some(Frequency::MonthEnd(1)));

        let future = idx.extend_future(2).unwrap();
        assert_eq!(future.as_datetimes().unwrap(), &[ymd(2020, 5, 31), ymd(2020, 6, 30)]);
        assert_eq!(
            Frequency::MonthEnd(1).steps_between(ymd(2020, 4, 30), ymd(2020, 6, 30)),
            2
        );
    }

    #[test]
    fn test_advance_out_of_range_steps() {
        let freq = Frequency::days(1);
        assert_eq!(freq.advance(day(1), i64::MAX), None);
        assert_eq!(freq.advance(day(1), i64::from(i32::MAX) + 1), None);
        let expected = NaiveDate::from_ymd_opt(1989, 12, 30).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(freq.advance(day(1), -2), Some(expected));
    }

    #[test]
    fn test_steps_between() {
        let freq = Frequency::days(1);
        assert_eq!(freq.steps_between(day(3), day(7)), 4);
        assert_eq!(freq.steps_between(day(7), day(3)), 0);
    }

    #[test]
    fn test_extend_future() {
        let idx = TimeIndex::date_range(day(1), 3, Frequency::days(1)).unwrap();
        let future = idx.extend_future(2).unwrap();
        assert_eq!(future.as_datetimes().unwrap(), &[day(4), day(5)]);

        let idx = TimeIndex::range(0, 7);
        assert_eq!(
            idx.extend_future(3).unwrap(),
            TimeIndex::Range { start: 7, step: 1, len: 3 }
        );
    }

    #[test]
    fn test_concat_rejects_mixed_kinds() {
        let a = TimeIndex::range(0, 3);
        let b = TimeIndex::datetime(vec![day(1), day(2)]);
        assert!(TimeIndex::concat(&[&a, &b]).is_err());

        let c = TimeIndex::range(3, 5);
        let joined = TimeIndex::concat(&[&a, &c]).unwrap();
        assert_eq!(joined, TimeIndex::Int(vec![0, 1, 2, 3, 4]));
    }
}
