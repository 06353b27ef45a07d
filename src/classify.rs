use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::{
    ClassifiedGradeSet, GradeRecord, SubjectCategory, SubjectSummary, Unit, UnitValue,
};

/// Maps subject-type ids to report categories. Ids that are not in the
/// table resolve to `Regular`.
#[derive(Debug, Clone, Default)]
pub struct SubjectTypeTable {
    categories: HashMap<String, SubjectCategory>,
}

impl SubjectTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject_type_id: impl Into<String>, category: SubjectCategory) {
        self.categories.insert(subject_type_id.into(), category);
    }

    pub fn resolve(&self, subject_type_id: &str) -> SubjectCategory {
        match self.categories.get(subject_type_id.trim()) {
            Some(category) => *category,
            None => {
                debug!(subject_type_id, "unknown subject type, treating as regular");
                SubjectCategory::Regular
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, SubjectCategory)> for SubjectTypeTable {
    fn from_iter<I: IntoIterator<Item = (K, SubjectCategory)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (subject_type_id, category) in iter {
            table.insert(subject_type_id, category);
        }
        table
    }
}

/// Reads the unit from the trailing digits of an evaluation tag
/// (`PARCIAL_1` is unit 1, `U3` is unit 3).
pub fn unit_from_evaluation_type(evaluation_type: &str) -> Option<Unit> {
    let tag = evaluation_type.trim_end();
    let prefix_len = tag.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    tag[prefix_len..].parse::<u32>().ok().and_then(Unit::from_number)
}

pub fn classify(records: &[GradeRecord], lookup: &SubjectTypeTable) -> ClassifiedGradeSet {
    let mut classified = ClassifiedGradeSet::default();
    let mut positions: HashMap<(SubjectCategory, String), usize> = HashMap::new();

    for record in records {
        let Some(unit) = unit_from_evaluation_type(&record.evaluation_type) else {
            warn!(
                grade_id = %record.id,
                evaluation_type = %record.evaluation_type,
                "grade has no unit 1-4 in its evaluation type, skipping"
            );
            continue;
        };

        let category = lookup.resolve(&record.subject_type_id);
        let subject = subject_label(record);
        let bucket = classified.bucket_mut(category);
        let index = *positions
            .entry((category, subject.to_string()))
            .or_insert_with(|| {
                bucket.push(SubjectSummary::new(subject));
                bucket.len() - 1
            });

        let summary = &mut bucket[index];
        // Duplicate (subject, unit) entries overwrite in input order.
        summary.set_unit(unit, UnitValue::from(record.value));
        if let Some(comment) = record
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
        {
            summary.comment = Some(comment.to_string());
        }
    }

    classified
}

fn subject_label(record: &GradeRecord) -> &str {
    let name = record.subject_name.trim();
    if name.is_empty() {
        record.subject_id.trim()
    } else {
        name
    }
}
