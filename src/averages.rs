use crate::models::{SubjectSummary, Unit, UnitAverages};

pub fn compute_unit_averages(regular_subjects: &[SubjectSummary]) -> UnitAverages {
    let unit_mean = |unit: Unit| {
        mean(
            regular_subjects
                .iter()
                .filter_map(|summary| summary.unit(unit).and_then(|value| value.as_number())),
        )
    };

    UnitAverages {
        u1: unit_mean(Unit::U1),
        u2: unit_mean(Unit::U2),
        u3: unit_mean(Unit::U3),
        u4: unit_mean(Unit::U4),
    }
}

/// Mean of the numeric units a subject has; `None` when it has none.
pub fn final_grade(summary: &SubjectSummary) -> Option<f64> {
    let values: Vec<f64> = Unit::ALL
        .iter()
        .filter_map(|unit| summary.unit(*unit).and_then(|value| value.as_number()))
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(mean(values))
    }
}

pub fn final_average(subjects: &[SubjectSummary]) -> f64 {
    mean(subjects.iter().filter_map(final_grade))
}

fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (total, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(total, count), value| (total + value, count + 1));
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}
