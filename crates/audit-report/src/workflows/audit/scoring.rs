//! Pure scoring rules: item values, section scores, severity and pass/fail.

use serde::Serialize;

use super::domain::{Choice, ResponseItem, ScoreStatus, Severity};

/// Weighted value of a single answer. `None` excludes the item from scoring.
pub fn calculate_value(choice: Choice, coefficient: f64) -> Option<f64> {
    match choice {
        Choice::Yes => Some(coefficient),
        Choice::Partially => Some(coefficient / 2.0),
        Choice::No => Some(0.0),
        Choice::NotApplicable => None,
        Choice::Unrecognized => Some(0.0),
    }
}

/// Percentage score over the items that carry a value.
///
/// Not-applicable items leave both the numerator and the denominator.
pub fn calculate_section_score(items: &[ResponseItem]) -> f64 {
    let (total_value, total_coefficient) = items
        .iter()
        .filter_map(|item| item.value().map(|value| (value, item.coefficient())))
        .fold((0.0, 0.0), |(value_sum, coefficient_sum), (value, coefficient)| {
            (value_sum + value, coefficient_sum + coefficient)
        });

    if total_coefficient == 0.0 {
        0.0
    } else {
        (total_value / total_coefficient * 100.0).round()
    }
}

/// Infers how urgent a shortfall is from the achieved ratio.
///
/// A zero or missing input carries no ratio and falls back to `Medium`.
pub fn severity_from_score(value: Option<f64>, coefficient: f64) -> Severity {
    let value = value.unwrap_or(0.0);
    if value == 0.0 || coefficient == 0.0 || !value.is_finite() || !coefficient.is_finite() {
        return Severity::Medium;
    }

    let ratio = value / coefficient;
    if ratio < 0.5 {
        Severity::High
    } else if ratio < 0.8 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Upstream severity when present, otherwise the inferred one.
pub fn resolve_severity(item: &ResponseItem) -> Severity {
    item.severity
        .unwrap_or_else(|| severity_from_score(item.value(), item.coefficient()))
}

pub fn needs_corrective_action(item: &ResponseItem) -> bool {
    let value = item.value().unwrap_or(0.0);
    item.coefficient() != value && item.selected_choice() != Choice::NotApplicable
}

/// A score of zero means "no data" whatever the threshold.
pub fn score_status(score: f64, threshold: f64) -> ScoreStatus {
    if score == 0.0 {
        ScoreStatus::NoData
    } else if score >= threshold {
        ScoreStatus::Pass
    } else {
        ScoreStatus::Fail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Performance {
    pub score: f64,
    pub threshold: f64,
    pub status: ScoreStatus,
    pub label: &'static str,
    pub emoji: &'static str,
    pub css_class: &'static str,
    /// Points above (positive) or below the threshold; zero without data.
    pub margin: f64,
}

pub fn calculate_performance(score: f64, threshold: f64) -> Performance {
    let status = score_status(score, threshold);
    let margin = match status {
        ScoreStatus::NoData => 0.0,
        _ => score - threshold,
    };

    Performance {
        score,
        threshold,
        status,
        label: status.label(),
        emoji: status.emoji(),
        css_class: status.css_class(),
        margin,
    }
}

/// Formats a score for display, dropping the fraction for whole numbers.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{score:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(coefficient: f64, choice: Choice) -> ResponseItem {
        ResponseItem::new("q", coefficient, choice)
    }

    #[test]
    fn value_follows_choice() {
        assert_eq!(calculate_value(Choice::Yes, 4.0), Some(4.0));
        assert_eq!(calculate_value(Choice::Partially, 4.0), Some(2.0));
        assert_eq!(calculate_value(Choice::No, 4.0), Some(0.0));
        assert_eq!(calculate_value(Choice::NotApplicable, 4.0), None);
        assert_eq!(calculate_value(Choice::Unrecognized, 4.0), Some(0.0));
    }

    #[test]
    fn section_score_excludes_not_applicable_items() {
        let items = vec![item(4.0, Choice::Yes), item(2.0, Choice::NotApplicable)];
        assert_eq!(calculate_section_score(&items), 100.0);
    }

    #[test]
    fn section_score_rounds_weighted_ratio() {
        let items = vec![item(2.0, Choice::Yes), item(4.0, Choice::No)];
        assert_eq!(calculate_section_score(&items), 33.0);
    }

    #[test]
    fn section_score_is_zero_without_weight() {
        assert_eq!(calculate_section_score(&[]), 0.0);
        let all_na = vec![item(3.0, Choice::NotApplicable)];
        assert_eq!(calculate_section_score(&all_na), 0.0);
    }

    #[test]
    fn severity_bands_follow_ratio() {
        assert_eq!(severity_from_score(Some(1.0), 4.0), Severity::High);
        assert_eq!(severity_from_score(Some(3.0), 4.0), Severity::Medium);
        assert_eq!(severity_from_score(Some(4.0), 4.0), Severity::Low);
        assert_eq!(severity_from_score(Some(0.0), 4.0), Severity::Medium);
        assert_eq!(severity_from_score(None, 4.0), Severity::Medium);
        assert_eq!(severity_from_score(Some(2.0), 0.0), Severity::Medium);
    }

    #[test]
    fn upstream_severity_wins_over_inference() {
        let flagged = item(4.0, Choice::Partially).with_severity(Some(Severity::High));
        assert_eq!(resolve_severity(&flagged), Severity::High);
        assert_eq!(resolve_severity(&item(4.0, Choice::Partially)), Severity::Medium);
    }

    #[test]
    fn corrective_action_requires_shortfall_on_applicable_item() {
        assert!(needs_corrective_action(&item(4.0, Choice::No)));
        assert!(needs_corrective_action(&item(4.0, Choice::Partially)));
        assert!(!needs_corrective_action(&item(4.0, Choice::Yes)));
        assert!(!needs_corrective_action(&item(4.0, Choice::NotApplicable)));
        assert!(!needs_corrective_action(&item(0.0, Choice::No)));
    }

    #[test]
    fn corrective_and_compliant_items_partition_the_section() {
        let items = vec![
            item(4.0, Choice::Yes),
            item(4.0, Choice::No),
            item(2.0, Choice::NotApplicable),
            item(3.0, Choice::Partially),
            item(1.0, Choice::Unrecognized),
        ];
        let corrective = items.iter().filter(|i| needs_corrective_action(i)).count();
        let compliant = items.iter().filter(|i| !needs_corrective_action(i)).count();
        assert_eq!(corrective, 3);
        assert_eq!(corrective + compliant, items.len());
    }

    #[test]
    fn zero_score_is_always_no_data() {
        assert_eq!(score_status(0.0, 0.0), ScoreStatus::NoData);
        assert_eq!(score_status(0.0, 89.0), ScoreStatus::NoData);
        assert_eq!(score_status(89.0, 89.0), ScoreStatus::Pass);
        assert_eq!(score_status(88.0, 89.0), ScoreStatus::Fail);
        assert_eq!(score_status(95.0, 89.0).emoji(), "✅");
    }

    #[test]
    fn performance_reports_margin_against_threshold() {
        let performance = calculate_performance(80.0, 83.0);
        assert_eq!(performance.status, ScoreStatus::Fail);
        assert_eq!(performance.margin, -3.0);
        assert_eq!(performance.label, "Fail");
        assert_eq!(calculate_performance(0.0, 83.0).margin, 0.0);
    }

    #[test]
    fn whole_scores_format_without_fraction() {
        assert_eq!(format_score(85.0), "85");
        assert_eq!(format_score(85.5), "85.5");
    }
}
