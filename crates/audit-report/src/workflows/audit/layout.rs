use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("sections '{first}' and '{second}' are both temperature sections")]
    DuplicateTemperatureSection { first: String, second: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    #[default]
    Standard,
    /// Cold/hot holding readings split into findings and compliant lists.
    Temperature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub key: String,
    pub title: String,
    pub score_field: String,
    #[serde(default)]
    pub kind: SectionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    pub score_field: String,
    pub section_keys: Vec<String>,
}

/// Ordered audit cycles of one round (e.g. six bi-monthly visits a year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleCalendar {
    pub labels: Vec<String>,
}

impl CycleCalendar {
    pub fn bi_monthly() -> Self {
        Self {
            labels: (1..=6).map(|index| format!("Cycle {index}")).collect(),
        }
    }

    pub fn position(&self, cycle_label: &str) -> Option<usize> {
        let wanted = cycle_label.trim().to_ascii_lowercase();
        self.labels
            .iter()
            .position(|label| label.to_ascii_lowercase() == wanted)
    }

    /// The `count` labels before `current`, most recent first, wrapping into
    /// the previous round. `None` when `current` is not on the calendar.
    pub fn trailing(&self, current: &str, count: usize) -> Option<Vec<String>> {
        let position = self.position(current)?;
        let len = self.labels.len();
        Some(
            (1..=count)
                .map(|offset| {
                    let index = (position + len * count.div_ceil(len.max(1)) - offset) % len;
                    self.labels[index].clone()
                })
                .collect(),
        )
    }
}

/// Shape of a report: which sections exist, how they roll up into
/// categories and which cycles are compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLayout {
    pub sections: Vec<SectionSpec>,
    pub categories: Vec<CategorySpec>,
    #[serde(default = "CycleCalendar::bi_monthly")]
    pub cycles: CycleCalendar,
}

impl AuditLayout {
    pub fn standard() -> Self {
        Self {
            sections: standard_sections(),
            categories: standard_categories(),
            cycles: CycleCalendar::bi_monthly(),
        }
    }

    /// Rejects layouts a report cannot represent: a document carries at most
    /// one temperature table.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut temperature = self
            .sections
            .iter()
            .filter(|section| section.kind == SectionKind::Temperature);
        if let (Some(first), Some(second)) = (temperature.next(), temperature.next()) {
            return Err(LayoutError::DuplicateTemperatureSection {
                first: first.key.clone(),
                second: second.key.clone(),
            });
        }
        Ok(())
    }

    /// Every header field the layout reads a score from.
    pub fn score_fields(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .map(|section| section.score_field.as_str())
            .chain(
                self.categories
                    .iter()
                    .map(|category| category.score_field.as_str()),
            )
    }
}

impl Default for AuditLayout {
    fn default() -> Self {
        Self::standard()
    }
}

fn section(key: &str, title: &str, score_field: &str, kind: SectionKind) -> SectionSpec {
    SectionSpec {
        key: key.to_string(),
        title: title.to_string(),
        score_field: score_field.to_string(),
        kind,
    }
}

fn standard_sections() -> Vec<SectionSpec> {
    vec![
        section(
            "personal_hygiene",
            "Personal Hygiene",
            "PersonalHygieneScore",
            SectionKind::Standard,
        ),
        section(
            "cleaning_sanitation",
            "Cleaning & Sanitation",
            "CleaningScore",
            SectionKind::Standard,
        ),
        section(
            "pest_control",
            "Pest Control",
            "PestControlScore",
            SectionKind::Standard,
        ),
        section(
            "receiving_storage",
            "Receiving & Storage",
            "StorageScore",
            SectionKind::Standard,
        ),
        section(
            "food_preparation",
            "Food Preparation",
            "PreparationScore",
            SectionKind::Standard,
        ),
        section(
            "temperature_control",
            "Temperature Control",
            "TemperatureScore",
            SectionKind::Temperature,
        ),
        section(
            "facilities_equipment",
            "Facilities & Equipment",
            "FacilitiesScore",
            SectionKind::Standard,
        ),
        section(
            "documentation_training",
            "Documentation & Training",
            "DocumentationScore",
            SectionKind::Standard,
        ),
    ]
}

fn standard_categories() -> Vec<CategorySpec> {
    vec![
        CategorySpec {
            name: "Hygiene & Sanitation".to_string(),
            score_field: "HygieneCategoryScore".to_string(),
            section_keys: vec![
                "personal_hygiene".to_string(),
                "cleaning_sanitation".to_string(),
                "pest_control".to_string(),
            ],
        },
        CategorySpec {
            name: "Food Handling".to_string(),
            score_field: "FoodHandlingCategoryScore".to_string(),
            section_keys: vec![
                "receiving_storage".to_string(),
                "food_preparation".to_string(),
                "temperature_control".to_string(),
            ],
        },
        CategorySpec {
            name: "Premises & Documentation".to_string(),
            score_field: "PremisesCategoryScore".to_string(),
            section_keys: vec![
                "facilities_equipment".to_string(),
                "documentation_training".to_string(),
            ],
        },
    ]
}
