use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::error::PipelineError;
use crate::models::{AcademicPeriod, Bimester, BimesterStatus, PeriodStatus};

pub const BIMESTERS_PER_PERIOD: usize = 4;

pub fn parse_period_dates(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), PipelineError> {
    let start_date = parse_date("start_date", start)?;
    let end_date = parse_date("end_date", end)?;
    if end_date < start_date {
        return Err(PipelineError::InvertedPeriod {
            start: start_date,
            end: end_date,
        });
    }
    Ok((start_date, end_date))
}

pub fn parse_date(field: &'static str, value: Option<&str>) -> Result<NaiveDate, PipelineError> {
    let raw = value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or(PipelineError::MissingDate { field })?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| PipelineError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

pub fn split_into_bimesters(
    period: &AcademicPeriod,
    today: NaiveDate,
) -> Result<[Bimester; BIMESTERS_PER_PERIOD], PipelineError> {
    split_range(period.start_date, period.end_date, today)
}

/// Slices `[start, end]` into four quarters of `ceil(days / 4)` days each.
/// The last quarter always ends on `end`.
pub fn split_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<[Bimester; BIMESTERS_PER_PERIOD], PipelineError> {
    if end < start {
        return Err(PipelineError::InvertedPeriod { start, end });
    }

    let total_days = (end - start).num_days();
    let per_slice = ((total_days + 3) / 4).max(1);
    debug!(%start, %end, total_days, per_slice, "splitting period into bimesters");

    Ok(std::array::from_fn(|index| {
        build_slice(index, start, total_days, per_slice, today)
    }))
}

// Offsets are kept within 0..=total_days so date arithmetic never leaves the period.
fn build_slice(
    index: usize,
    start: NaiveDate,
    total_days: i64,
    per_slice: i64,
    today: NaiveDate,
) -> Bimester {
    let number = index as u8 + 1;
    let end = start + Duration::days(total_days);
    let first_offset = index as i64 * per_slice;

    if first_offset > total_days {
        let status = if today > end {
            BimesterStatus::Completed
        } else {
            BimesterStatus::Upcoming
        };
        return Bimester {
            number,
            name: bimester_name(number),
            start_date: end,
            end_date: end,
            days: 0,
            status,
            progress: progress_for(status, end, end, today),
        };
    }

    let last_offset = if index + 1 == BIMESTERS_PER_PERIOD {
        total_days
    } else {
        (first_offset + per_slice - 1).min(total_days)
    };
    let slice_start = start + Duration::days(first_offset);
    let slice_end = start + Duration::days(last_offset);
    let status = status_for(slice_start, slice_end, today);

    Bimester {
        number,
        name: bimester_name(number),
        start_date: slice_start,
        end_date: slice_end,
        days: last_offset - first_offset + 1,
        status,
        progress: progress_for(status, slice_start, slice_end, today),
    }
}

fn bimester_name(number: u8) -> String {
    format!("Bimestre {number}")
}

pub fn status_for(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> BimesterStatus {
    if today > end {
        BimesterStatus::Completed
    } else if today >= start {
        BimesterStatus::Active
    } else {
        BimesterStatus::Upcoming
    }
}

pub fn progress_for(
    status: BimesterStatus,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> u8 {
    match status {
        BimesterStatus::Completed => 100,
        BimesterStatus::Upcoming => 0,
        BimesterStatus::Active => {
            let span = (end - start).num_days();
            if span <= 0 {
                return 1;
            }
            let elapsed = (today - start).num_days();
            let percent = (100.0 * elapsed as f64 / span as f64).round() as i64;
            percent.clamp(1, 99) as u8
        }
    }
}

/// Cancelled periods stay cancelled; every other period is placed by its dates.
pub fn derive_period_status(period: &AcademicPeriod, today: NaiveDate) -> PeriodStatus {
    if period.status == PeriodStatus::Cancelled {
        return PeriodStatus::Cancelled;
    }
    match status_for(period.start_date, period.end_date, today) {
        BimesterStatus::Upcoming => PeriodStatus::Upcoming,
        BimesterStatus::Active => PeriodStatus::Active,
        BimesterStatus::Completed => PeriodStatus::Completed,
    }
}

pub fn current_period(
    periods: &[AcademicPeriod],
) -> Result<Option<&AcademicPeriod>, PipelineError> {
    let current: Vec<&AcademicPeriod> = periods.iter().filter(|period| period.is_current).collect();
    match current.as_slice() {
        [] => Ok(None),
        [period] => Ok(Some(*period)),
        many => Err(PipelineError::MultipleCurrentPeriods(
            many.iter().map(|period| period.id.clone()).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn period(start: NaiveDate, end: NaiveDate) -> AcademicPeriod {
        AcademicPeriod {
            id: "2024".to_string(),
            name: "Ciclo 2024".to_string(),
            start_date: start,
            end_date: end,
            status: PeriodStatus::Active,
            is_current: true,
        }
    }

    fn assert_covers(slices: &[Bimester; 4], start: NaiveDate, end: NaiveDate) {
        let live: Vec<&Bimester> = slices.iter().filter(|slice| slice.days > 0).collect();
        assert_eq!(live.first().unwrap().start_date, start);
        assert_eq!(live.last().unwrap().end_date, end);
        for pair in live.windows(2) {
            assert_eq!(pair[1].start_date, pair[0].end_date + Duration::days(1));
        }
        let covered: i64 = live.iter().map(|slice| slice.days).sum();
        assert_eq!(covered, (end - start).num_days() + 1);
        for slice in slices {
            assert!(slice.end_date >= slice.start_date);
        }
    }

    #[test]
    fn school_year_splits_into_ninety_one_day_quarters() {
        let start = date(2024, 1, 1);
        let end = date(2024, 12, 30);
        let slices = split_into_bimesters(&period(start, end), date(2024, 6, 1)).unwrap();

        let starts: Vec<NaiveDate> = slices.iter().map(|slice| slice.start_date).collect();
        assert_eq!(
            starts,
            vec![date(2024, 1, 1), date(2024, 4, 1), date(2024, 7, 1), date(2024, 9, 30)]
        );
        assert_eq!(slices[0].end_date, date(2024, 3, 31));
        assert_eq!(slices[3].end_date, end);
        assert_eq!(slices[0].days, 91);
        assert_eq!(slices[1].days, 91);
        assert_eq!(slices[2].days, 91);
        assert_covers(&slices, start, end);
        assert_eq!(slices[2].name, "Bimestre 3");
    }

    #[test]
    fn slices_cover_period_for_many_lengths() {
        let start = date(2025, 3, 1);
        for total in 0..60 {
            let end = start + Duration::days(total);
            let slices = split_range(start, end, start).unwrap();
            assert_covers(&slices, start, end);
        }
    }

    #[test]
    fn short_period_produces_degenerate_trailing_slices() {
        let start = date(2025, 3, 1);
        let end = date(2025, 3, 2);
        let slices = split_range(start, end, date(2025, 2, 1)).unwrap();
        assert_eq!(slices[0].days, 1);
        assert_eq!(slices[1].days, 1);
        assert_eq!(slices[2].days, 0);
        assert_eq!(slices[3].days, 0);
        assert_eq!(slices[3].start_date, end);
        assert_eq!(slices[3].end_date, end);
    }

    #[test]
    fn before_start_everything_is_upcoming() {
        let start = date(2024, 1, 1);
        let end = date(2024, 12, 30);
        let slices = split_range(start, end, date(2023, 12, 31)).unwrap();
        for slice in &slices {
            assert_eq!(slice.status, BimesterStatus::Upcoming);
            assert_eq!(slice.progress, 0);
        }
    }

    #[test]
    fn after_end_everything_is_completed() {
        let start = date(2025, 3, 1);
        let end = date(2025, 3, 2);
        let slices = split_range(start, end, date(2025, 3, 3)).unwrap();
        for slice in &slices {
            assert_eq!(slice.status, BimesterStatus::Completed);
            assert_eq!(slice.progress, 100);
        }
    }

    #[test]
    fn active_slice_reports_clamped_progress() {
        let start = date(2024, 1, 1);
        let end = date(2024, 12, 30);

        let first_day = split_range(start, end, start).unwrap();
        assert_eq!(first_day[0].status, BimesterStatus::Active);
        assert_eq!(first_day[0].progress, 1);
        assert_eq!(first_day[1].status, BimesterStatus::Upcoming);

        let midway = split_range(start, end, date(2024, 5, 16)).unwrap();
        assert_eq!(midway[0].status, BimesterStatus::Completed);
        assert_eq!(midway[1].status, BimesterStatus::Active);
        assert_eq!(midway[1].progress, 50);

        let last_day = split_range(start, end, end).unwrap();
        assert_eq!(last_day[3].status, BimesterStatus::Active);
        assert_eq!(last_day[3].progress, 99);
    }

    #[test]
    fn inverted_period_is_rejected() {
        let result = split_range(date(2024, 2, 1), date(2024, 1, 1), date(2024, 1, 1));
        assert!(matches!(result, Err(PipelineError::InvertedPeriod { .. })));
    }

    #[test]
    fn unparseable_dates_are_reported_not_defaulted() {
        assert_eq!(
            parse_period_dates(Some("2024-13-01"), Some("2024-12-30")),
            Err(PipelineError::InvalidDate {
                field: "start_date",
                value: "2024-13-01".to_string()
            })
        );
        assert_eq!(
            parse_period_dates(Some("2024-01-01"), Some("  ")),
            Err(PipelineError::MissingDate { field: "end_date" })
        );
        assert_eq!(
            parse_period_dates(Some("2024-01-01"), Some("2024-12-30")),
            Ok((date(2024, 1, 1), date(2024, 12, 30)))
        );
    }

    #[test]
    fn period_status_respects_cancellation() {
        let mut school_year = period(date(2024, 1, 1), date(2024, 12, 30));
        assert_eq!(derive_period_status(&school_year, date(2023, 5, 1)), PeriodStatus::Upcoming);
        assert_eq!(derive_period_status(&school_year, date(2024, 5, 1)), PeriodStatus::Active);
        assert_eq!(derive_period_status(&school_year, date(2025, 1, 1)), PeriodStatus::Completed);
        school_year.status = PeriodStatus::Cancelled;
        assert_eq!(derive_period_status(&school_year, date(2024, 5, 1)), PeriodStatus::Cancelled);
    }

    #[test]
    fn only_one_period_may_be_current() {
        let mut first = period(date(2024, 1, 1), date(2024, 12, 30));
        let mut second = period(date(2025, 1, 1), date(2025, 12, 30));
        second.id = "2025".to_string();
        assert_eq!(
            current_period(&[first.clone(), second.clone()]).unwrap_err(),
            PipelineError::MultipleCurrentPeriods(vec!["2024".to_string(), "2025".to_string()])
        );

        second.is_current = false;
        let periods = [first.clone(), second.clone()];
        let current = current_period(&periods).unwrap();
        assert_eq!(current.map(|found| found.id.as_str()), Some("2024"));

        first.is_current = false;
        assert_eq!(current_period(&[first, second]).unwrap(), None);
    }
}
