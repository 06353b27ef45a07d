use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

impl FromStr for PeriodStatus {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(PipelineError::UnknownLabel {
                what: "period status",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicPeriod {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BimesterStatus {
    Upcoming,
    Active,
    Completed,
}

impl fmt::Display for BimesterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// One quarter slice of an academic period. `days` counts the slice
/// inclusively and is 0 for a degenerate trailing slice of a very short period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bimester {
    pub number: u8,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub status: BimesterStatus,
    pub progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConceptualGrade {
    Destaca,
    Avanza,
    NecesitaMejorar,
    Insatisfactorio,
}

impl ConceptualGrade {
    pub fn label(self) -> &'static str {
        match self {
            Self::Destaca => "Destaca",
            Self::Avanza => "Avanza",
            Self::NecesitaMejorar => "Necesita mejorar",
            Self::Insatisfactorio => "Insatisfactorio",
        }
    }
}

impl FromStr for ConceptualGrade {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DESTACA" => Ok(Self::Destaca),
            "AVANZA" => Ok(Self::Avanza),
            "NECESITA_MEJORAR" => Ok(Self::NecesitaMejorar),
            "INSATISFACTORIO" => Ok(Self::Insatisfactorio),
            _ => Err(PipelineError::UnknownLabel {
                what: "conceptual grade",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "grade_kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradeValue {
    Numeric(f64),
    Conceptual(ConceptualGrade),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: String,
    pub student_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub period_id: String,
    pub evaluation_type: String,
    pub value: GradeValue,
    pub comment: Option<String>,
    pub subject_type_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectCategory {
    Regular,
    Extracurricular,
    HabitoCasa,
    ResponsabilidadAprendizaje,
    Comportamiento,
}

impl FromStr for SubjectCategory {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "REGULAR" => Ok(Self::Regular),
            "EXTRACURRICULAR" => Ok(Self::Extracurricular),
            "HABITO_CASA" => Ok(Self::HabitoCasa),
            "RESPONSABILIDAD_APRENDIZAJE" => Ok(Self::ResponsabilidadAprendizaje),
            "COMPORTAMIENTO" => Ok(Self::Comportamiento),
            _ => Err(PipelineError::UnknownLabel {
                what: "subject category",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    U1,
    U2,
    U3,
    U4,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::U1, Unit::U2, Unit::U3, Unit::U4];

    pub fn from_number(number: u32) -> Option<Unit> {
        match number {
            1 => Some(Unit::U1),
            2 => Some(Unit::U2),
            3 => Some(Unit::U3),
            4 => Some(Unit::U4),
            _ => None,
        }
    }
}

/// A unit cell as shown on the report: a bare number or a conceptual label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitValue {
    Number(f64),
    Label(String),
}

impl UnitValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            UnitValue::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }
}

impl From<GradeValue> for UnitValue {
    fn from(value: GradeValue) -> Self {
        match value {
            GradeValue::Numeric(number) => UnitValue::Number(number),
            GradeValue::Conceptual(grade) => UnitValue::Label(grade.label().to_string()),
        }
    }
}

impl fmt::Display for UnitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitValue::Number(value) if value.fract() == 0.0 => write!(f, "{value:.0}"),
            UnitValue::Number(value) => write!(f, "{value:.1}"),
            UnitValue::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub u1: Option<UnitValue>,
    pub u2: Option<UnitValue>,
    pub u3: Option<UnitValue>,
    pub u4: Option<UnitValue>,
    pub comment: Option<String>,
}

impl SubjectSummary {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            u1: None,
            u2: None,
            u3: None,
            u4: None,
            comment: None,
        }
    }

    pub fn unit(&self, unit: Unit) -> Option<&UnitValue> {
        match unit {
            Unit::U1 => self.u1.as_ref(),
            Unit::U2 => self.u2.as_ref(),
            Unit::U3 => self.u3.as_ref(),
            Unit::U4 => self.u4.as_ref(),
        }
    }

    pub fn set_unit(&mut self, unit: Unit, value: UnitValue) {
        let slot = match unit {
            Unit::U1 => &mut self.u1,
            Unit::U2 => &mut self.u2,
            Unit::U3 => &mut self.u3,
            Unit::U4 => &mut self.u4,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedGradeSet {
    pub regular_subjects: Vec<SubjectSummary>,
    pub extracurricular: Vec<SubjectSummary>,
    pub habit_casa: Vec<SubjectSummary>,
    pub habit_learning: Vec<SubjectSummary>,
    pub habit_behavior: Vec<SubjectSummary>,
}

impl ClassifiedGradeSet {
    pub fn bucket_mut(&mut self, category: SubjectCategory) -> &mut Vec<SubjectSummary> {
        match category {
            SubjectCategory::Regular => &mut self.regular_subjects,
            SubjectCategory::Extracurricular => &mut self.extracurricular,
            SubjectCategory::HabitoCasa => &mut self.habit_casa,
            SubjectCategory::ResponsabilidadAprendizaje => &mut self.habit_learning,
            SubjectCategory::Comportamiento => &mut self.habit_behavior,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitAverages {
    pub u1: f64,
    pub u2: f64,
    pub u3: f64,
    pub u4: f64,
}

impl UnitAverages {
    pub fn get(&self, unit: Unit) -> f64 {
        match unit {
            Unit::U1 => self.u1,
            Unit::U2 => self.u2,
            Unit::U3 => self.u3,
            Unit::U4 => self.u4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Habits {
    pub casa: Vec<SubjectSummary>,
    pub learning: Vec<SubjectSummary>,
    pub behavior: Vec<SubjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub bimesters: Vec<Bimester>,
    pub subjects: Vec<SubjectSummary>,
    pub extracurricular: Vec<SubjectSummary>,
    pub habits: Habits,
    pub averages: UnitAverages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub id: String,
    pub full_name: String,
}
