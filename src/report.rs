use std::fmt::Write;

use chrono::NaiveDate;
use tracing::debug;

use crate::averages::{compute_unit_averages, final_average, final_grade};
use crate::classify::{classify, SubjectTypeTable};
use crate::error::PipelineError;
use crate::models::{
    AcademicPeriod, ClassifiedGradeSet, GradeRecord, Habits, ReportPayload, StudentIdentity,
    SubjectSummary, Unit, UnitValue,
};
use crate::periods::split_into_bimesters;

const NO_RECORDS: &str = "Sin registros";

/// Builds the plain-data payload handed to the report renderer. An empty
/// grade list still yields a full payload; only an invalid period fails.
pub fn assemble_report(
    period: &AcademicPeriod,
    records: &[GradeRecord],
    lookup: &SubjectTypeTable,
    today: NaiveDate,
) -> Result<ReportPayload, PipelineError> {
    let bimesters = split_into_bimesters(period, today)?;
    let classified = classify(records, lookup);
    let averages = compute_unit_averages(&classified.regular_subjects);

    let ClassifiedGradeSet {
        regular_subjects,
        extracurricular,
        habit_casa,
        habit_learning,
        habit_behavior,
    } = classified;

    debug!(
        period_id = %period.id,
        records = records.len(),
        subjects = regular_subjects.len(),
        "assembled report payload"
    );

    Ok(ReportPayload {
        bimesters: Vec::from(bimesters),
        subjects: regular_subjects,
        extracurricular,
        habits: Habits {
            casa: habit_casa,
            learning: habit_learning,
            behavior: habit_behavior,
        },
        averages,
    })
}

pub fn render_markdown(
    school_name: Option<&str>,
    student: &StudentIdentity,
    period: &AcademicPeriod,
    payload: &ReportPayload,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Boleta de Calificaciones");
    if let Some(school) = school_name {
        let _ = writeln!(output, "{school}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "- Estudiante: {} ({})", student.full_name, student.id);
    let _ = writeln!(
        output,
        "- Periodo: {} ({} a {})",
        period.name, period.start_date, period.end_date
    );
    for bimester in &payload.bimesters {
        let _ = writeln!(
            output,
            "- {}: {} a {} ({}, {}%)",
            bimester.name,
            bimester.start_date,
            bimester.end_date,
            bimester.status,
            bimester.progress
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Áreas Académicas");
    let _ = writeln!(output, "| Asignatura | U1 | U2 | U3 | U4 | Final |");
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    if payload.subjects.is_empty() {
        let _ = writeln!(output, "| {NO_RECORDS} | | | | | |");
    } else {
        for subject in &payload.subjects {
            let final_cell = final_grade(subject)
                .map(|value| format!("{value:.1}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(output, "| {} | {} |", unit_cells(subject), final_cell);
        }
        let averages = Unit::ALL
            .iter()
            .map(|unit| format!("{:.1}", payload.averages.get(*unit)))
            .collect::<Vec<_>>()
            .join(" | ");
        let _ = writeln!(
            output,
            "| Promedio | {} | {:.1} |",
            averages,
            final_average(&payload.subjects)
        );
    }

    write_unit_table(
        &mut output,
        "## Áreas Extracurriculares",
        "Actividad",
        &payload.extracurricular,
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Responsabilidades y Hábitos");
    write_unit_table(&mut output, "### Comportamiento", "Aspecto", &payload.habits.behavior);
    write_unit_table(
        &mut output,
        "### Responsabilidad en el aprendizaje",
        "Aspecto",
        &payload.habits.learning,
    );
    write_unit_table(&mut output, "### Hábitos en casa", "Aspecto", &payload.habits.casa);

    let comments: Vec<&SubjectSummary> = payload
        .subjects
        .iter()
        .chain(&payload.extracurricular)
        .chain(&payload.habits.behavior)
        .chain(&payload.habits.learning)
        .chain(&payload.habits.casa)
        .filter(|summary| summary.comment.is_some())
        .collect();
    if !comments.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Observaciones");
        for summary in comments {
            if let Some(comment) = &summary.comment {
                let _ = writeln!(output, "- {}: {}", summary.subject, comment);
            }
        }
    }

    output
}

fn write_unit_table(output: &mut String, heading: &str, label: &str, rows: &[SubjectSummary]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "{heading}");
    let _ = writeln!(output, "| {label} | U1 | U2 | U3 | U4 |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    if rows.is_empty() {
        let _ = writeln!(output, "| {NO_RECORDS} | | | | |");
        return;
    }
    for row in rows {
        let _ = writeln!(output, "| {} |", unit_cells(row));
    }
}

fn unit_cells(summary: &SubjectSummary) -> String {
    let mut cells = vec![summary.subject.clone()];
    cells.extend(Unit::ALL.iter().map(|unit| cell(summary.unit(*unit))));
    cells.join(" | ")
}

fn cell(value: Option<&UnitValue>) -> String {
    value.map(ToString::to_string).unwrap_or_else(|| "-".to_string())
}
