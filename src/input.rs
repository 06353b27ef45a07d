use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::classify::SubjectTypeTable;
use crate::error::PipelineError;
use crate::models::{
    AcademicPeriod, ConceptualGrade, GradeRecord, GradeValue, PeriodStatus, SubjectCategory,
};
use crate::periods::parse_period_dates;

#[derive(Debug, Deserialize)]
struct PeriodRow {
    id: String,
    name: String,
    start_date: Option<String>,
    end_date: Option<String>,
    status: String,
    is_current: bool,
}

impl TryFrom<PeriodRow> for AcademicPeriod {
    type Error = PipelineError;

    fn try_from(row: PeriodRow) -> Result<Self, Self::Error> {
        let (start_date, end_date) =
            parse_period_dates(row.start_date.as_deref(), row.end_date.as_deref())?;
        let status: PeriodStatus = row.status.parse()?;
        Ok(AcademicPeriod {
            id: row.id,
            name: row.name,
            start_date,
            end_date,
            status,
            is_current: row.is_current,
        })
    }
}

/// A grade as it arrives over the wire, with the value split across
/// `numeric_value` and `conceptual_value` according to `grade_kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGradeRecord {
    pub id: String,
    pub student_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub period_id: String,
    pub evaluation_type: String,
    pub grade_kind: String,
    pub numeric_value: Option<f64>,
    pub conceptual_value: Option<String>,
    pub comment: Option<String>,
    pub subject_type_id: String,
}

impl TryFrom<RawGradeRecord> for GradeRecord {
    type Error = PipelineError;

    fn try_from(raw: RawGradeRecord) -> Result<Self, Self::Error> {
        let conceptual = raw
            .conceptual_value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let value = match raw.grade_kind.trim().to_ascii_uppercase().as_str() {
            "NUMERIC" => match (raw.numeric_value, conceptual) {
                (Some(number), None) => {
                    if !(0.0..=100.0).contains(&number) {
                        return Err(PipelineError::NumericOutOfRange {
                            id: raw.id,
                            value: number,
                        });
                    }
                    GradeValue::Numeric(number)
                }
                _ => {
                    return Err(PipelineError::GradeValueMismatch {
                        id: raw.id,
                        kind: raw.grade_kind,
                        expected: "numeric_value and no conceptual_value",
                    })
                }
            },
            "CONCEPTUAL" => match (raw.numeric_value, conceptual) {
                (None, Some(label)) => GradeValue::Conceptual(label.parse::<ConceptualGrade>()?),
                _ => {
                    return Err(PipelineError::GradeValueMismatch {
                        id: raw.id,
                        kind: raw.grade_kind,
                        expected: "conceptual_value and no numeric_value",
                    })
                }
            },
            _ => {
                return Err(PipelineError::UnknownLabel {
                    what: "grade kind",
                    value: raw.grade_kind,
                })
            }
        };

        Ok(GradeRecord {
            id: raw.id,
            student_id: raw.student_id,
            subject_id: raw.subject_id,
            subject_name: raw.subject_name,
            period_id: raw.period_id,
            evaluation_type: raw.evaluation_type,
            value,
            comment: raw.comment,
            subject_type_id: raw.subject_type_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SubjectTypeRow {
    subject_type_id: String,
    category: String,
}

pub fn read_periods<R: Read>(reader: R) -> anyhow::Result<Vec<AcademicPeriod>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut periods = Vec::new();

    for (index, result) in reader.deserialize::<PeriodRow>().enumerate() {
        let row = result.with_context(|| format!("periods row {}", index + 1))?;
        let id = row.id.clone();
        let period = AcademicPeriod::try_from(row).with_context(|| format!("period {id}"))?;
        periods.push(period);
    }

    Ok(periods)
}

pub fn read_grades<R: Read>(reader: R) -> anyhow::Result<Vec<GradeRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut grades = Vec::new();

    for (index, result) in reader.deserialize::<RawGradeRecord>().enumerate() {
        let raw = result.with_context(|| format!("grades row {}", index + 1))?;
        grades.push(GradeRecord::try_from(raw)?);
    }

    Ok(grades)
}

pub fn read_subject_types<R: Read>(reader: R) -> anyhow::Result<SubjectTypeTable> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut table = SubjectTypeTable::new();

    for (index, result) in reader.deserialize::<SubjectTypeRow>().enumerate() {
        let row = result.with_context(|| format!("subject types row {}", index + 1))?;
        let category: SubjectCategory = row
            .category
            .parse()
            .with_context(|| format!("subject type {}", row.subject_type_id))?;
        table.insert(row.subject_type_id.trim(), category);
    }

    Ok(table)
}

pub fn load_periods(path: &Path) -> anyhow::Result<Vec<AcademicPeriod>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open periods file {}", path.display()))?;
    read_periods(file)
}

pub fn load_grades(path: &Path) -> anyhow::Result<Vec<GradeRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open grades file {}", path.display()))?;
    read_grades(file)
}

pub fn load_subject_types(path: &Path) -> anyhow::Result<SubjectTypeTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open subject types file {}", path.display()))?;
    read_subject_types(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const GRADES_HEADER: &str = "id,student_id,subject_id,subject_name,period_id,\
                                 evaluation_type,grade_kind,numeric_value,conceptual_value,\
                                 comment,subject_type_id\n";

    fn grades_csv(row: &str) -> String {
        format!("{GRADES_HEADER}{row}\n")
    }

    #[test]
    fn reads_periods_with_validated_dates() {
        let data = "id,name,start_date,end_date,status,is_current\n\
                    2024,Ciclo 2024,2024-01-01,2024-12-30,active,true\n\
                    2023,Ciclo 2023,2023-01-02,2023-12-15,completed,false\n";
        let periods = read_periods(data.as_bytes()).unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(periods[1].status, PeriodStatus::Completed);
        assert!(periods[0].is_current);
    }

    #[test]
    fn malformed_period_date_is_an_error() {
        let data = "id,name,start_date,end_date,status,is_current\n\
                    2024,Ciclo 2024,01/01/2024,2024-12-30,active,true\n";
        let error = read_periods(data.as_bytes()).unwrap_err();
        let cause = error.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(cause, PipelineError::InvalidDate { field: "start_date", .. }));

        let missing = "id,name,start_date,end_date,status,is_current\n\
                       2024,Ciclo 2024,2024-01-01,,active,true\n";
        assert!(read_periods(missing.as_bytes()).is_err());
    }

    #[test]
    fn reads_numeric_and_conceptual_grades() {
        let data = format!(
            "{GRADES_HEADER}\
             g1,st-1,math,Math,2024,PARCIAL_1,NUMERIC,87.5,,Buen trabajo,regular\n\
             g2,st-1,chess,Ajedrez,2024,PARCIAL_1,CONCEPTUAL,,DESTACA,,extra\n"
        );
        let grades = read_grades(data.as_bytes()).unwrap();
        assert_eq!(grades[0].value, GradeValue::Numeric(87.5));
        assert_eq!(grades[0].comment.as_deref(), Some("Buen trabajo"));
        assert_eq!(grades[1].value, GradeValue::Conceptual(ConceptualGrade::Destaca));
        assert_eq!(grades[1].comment, None);
    }

    #[test]
    fn grade_value_must_match_its_kind() {
        let both = grades_csv("g1,st-1,math,Math,2024,PARCIAL_1,NUMERIC,80,AVANZA,,regular");
        assert!(read_grades(both.as_bytes()).is_err());

        let missing = grades_csv("g2,st-1,art,Arte,2024,PARCIAL_1,CONCEPTUAL,,,,regular");
        assert!(read_grades(missing.as_bytes()).is_err());

        let out_of_range = grades_csv("g3,st-1,math,Math,2024,PARCIAL_1,NUMERIC,120,,,regular");
        let error = read_grades(out_of_range.as_bytes()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::NumericOutOfRange { .. })
        ));
    }

    #[test]
    fn reads_subject_type_table() {
        let data = "subject_type_id,category\n\
                    regular,REGULAR\n\
                    extra,EXTRACURRICULAR\n\
                    casa,habito_casa\n";
        let table = read_subject_types(data.as_bytes()).unwrap();
        assert_eq!(table.resolve("extra"), SubjectCategory::Extracurricular);
        assert_eq!(table.resolve("casa"), SubjectCategory::HabitoCasa);
        assert_eq!(table.resolve("unknown"), SubjectCategory::Regular);

        let bad = "subject_type_id,category\nx,SPORTS\n";
        assert!(read_subject_types(bad.as_bytes()).is_err());
    }
}
