use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::fields::MISSING_TEXT;
use super::sources::{ResponseProvider, SourceError, TemperatureSource};

fn missing_text() -> String {
    MISSING_TEXT.to_string()
}

/// One probe reading from the temperature log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    #[serde(default = "missing_text", alias = "Equipment", alias = "Location", alias = "Title")]
    pub equipment: String,
    #[serde(default = "missing_text", alias = "Product", alias = "Item")]
    pub product: String,
    #[serde(
        default,
        alias = "Temperature",
        alias = "measuredTemperature",
        deserialize_with = "deserialize_measurement"
    )]
    pub measured: Option<f64>,
    #[serde(default = "missing_text", alias = "Limit", alias = "Target", alias = "Standard")]
    pub limit: String,
    #[serde(default = "missing_text", alias = "Comment", alias = "Comments")]
    pub comment: String,
    #[serde(default = "missing_text", alias = "CorrectiveAction", alias = "Action")]
    pub corrective_action: String,
}

impl TemperatureReading {
    pub fn measured_label(&self) -> String {
        self.measured
            .map(|value| format!("{value:.1} °C"))
            .unwrap_or_else(missing_text)
    }
}

fn deserialize_measurement<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text
            .trim()
            .trim_end_matches("°C")
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok(),
        _ => None,
    };
    Ok(parsed.filter(|reading| reading.is_finite()))
}

/// Temperature section content: out-of-range findings and compliant readings
/// under one shared reference value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureTable {
    pub section_key: String,
    pub reference_value: String,
    pub findings: Vec<TemperatureReading>,
    pub compliant: Vec<TemperatureReading>,
}

impl TemperatureTable {
    pub fn load(
        responses: &dyn ResponseProvider,
        temperatures: &dyn TemperatureSource,
        document_id: &str,
        section_key: &str,
    ) -> Result<Self, SourceError> {
        let findings = temperatures.findings(document_id)?;
        let compliant = temperatures.compliant(document_id)?;
        let reference_value = responses
            .reference_value(document_id, section_key)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(missing_text);

        Ok(Self {
            section_key: section_key.to_string(),
            reference_value,
            findings,
            compliant,
        })
    }

    pub fn reading_count(&self) -> usize {
        self.findings.len() + self.compliant.len()
    }

    /// Share of compliant readings as a whole percentage; 0 without readings.
    pub fn compliance_rate(&self) -> f64 {
        let total = self.reading_count();
        if total == 0 {
            return 0.0;
        }
        (self.compliant.len() as f64 / total as f64 * 100.0).round()
    }
}
