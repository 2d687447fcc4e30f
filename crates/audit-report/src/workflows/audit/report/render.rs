//! Self-contained HTML rendering of an assembled audit.

use chrono::NaiveDate;

use super::super::domain::{AuditDocument, Category, ScoreStatus, ScoredItem, Section};
use super::super::evidence::EvidenceCell;
use super::super::fields::MISSING_TEXT;
use super::super::scoring::{calculate_performance, format_score};
use super::super::temperature::{TemperatureReading, TemperatureTable};
use super::views::{ChartSeriesEntry, TrendRowKind, TrendTable};

pub const MISSING_AFTER_MARKER: &str = "⚠ After photo missing";

/// Renders the full report page. Every piece of upstream text is escaped.
pub fn render_html(document: &AuditDocument) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Food Safety Audit - {title}</title>
    <style>{css}</style>
</head>
<body>
    <main class="report">
        {header}
        {score_card}
        {categories}
        {chart}
        {trend}
        {sections}
    </main>
</body>
</html>"#,
        title = escape_html(&document.store_name),
        css = inline_css(),
        header = render_header(document),
        score_card = render_score_card(document),
        categories = render_category_table(&document.categories),
        chart = render_chart_series(&document.chart_series),
        trend = render_trend_table(&document.trend),
        sections = document
            .sections
            .iter()
            .map(|section| match &document.temperature {
                Some(table) if table.section_key == section.key && !section.placeholder => {
                    render_temperature_section(section, table)
                }
                _ => render_section(section),
            })
            .collect::<String>(),
    )
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub(crate) fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%d %B %Y").to_string())
        .unwrap_or_else(|| MISSING_TEXT.to_string())
}

fn render_header(document: &AuditDocument) -> String {
    format!(
        r#"<header>
    <h1>{store}</h1>
    <dl class="meta">
        <dt>Document</dt><dd>{document_id}</dd>
        <dt>Store ID</dt><dd>{store_id}</dd>
        <dt>Audit date</dt><dd>{date}</dd>
        <dt>Auditor</dt><dd>{auditor}</dd>
        <dt>Cycle</dt><dd>{cycle}</dd>
    </dl>
</header>"#,
        store = escape_html(&document.store_name),
        document_id = escape_html(&document.document_id),
        store_id = escape_html(&document.store_id),
        date = format_date(document.audit_date),
        auditor = escape_html(&document.auditor),
        cycle = escape_html(&document.cycle_label),
    )
}

fn render_score_card(document: &AuditDocument) -> String {
    let performance = calculate_performance(document.overall_score, document.thresholds.overall);
    let previous = document
        .overall_history
        .first()
        .map(|value| value.display_label())
        .unwrap_or_else(|| MISSING_TEXT.to_string());

    format!(
        r#"<section class="score-card {class}">
    <div class="score">{emoji} {score}%</div>
    <div class="verdict">{label} (threshold {threshold}%)</div>
    <div class="previous">Previous cycle: {previous}</div>
    <div class="corrective">Corrective actions: {corrective}</div>
</section>"#,
        class = performance.css_class,
        emoji = performance.emoji,
        score = format_score(performance.score),
        label = performance.label,
        threshold = format_score(performance.threshold),
        previous = escape_html(&previous),
        corrective = document.corrective_action_count(),
    )
}

fn render_category_table(categories: &[Category]) -> String {
    if categories.is_empty() {
        return String::new();
    }

    let rows: String = categories
        .iter()
        .map(|category| {
            let subs: String = category
                .sub_sections
                .iter()
                .map(|sub| {
                    format!(
                        r#"<tr class="sub-section"><td class="indent">{title}</td><td>{score}</td><td></td><td class="{class}">{emoji}</td></tr>"#,
                        title = escape_html(&sub.title),
                        score = format_score(sub.score),
                        class = sub.status.css_class(),
                        emoji = sub.status.emoji(),
                    )
                })
                .collect();

            format!(
                r#"<tr class="category"><td>{name}</td><td>{score}</td><td>{average}</td><td class="{class}">{emoji}</td></tr>{subs}"#,
                name = escape_html(&category.name),
                score = format_score(category.category_score),
                average = format_score(category.sub_section_average),
                class = category.status.css_class(),
                emoji = category.status.emoji(),
            )
        })
        .collect();

    format!(
        r#"<section class="section">
    <h2>Category Summary</h2>
    <table>
        <thead><tr><th>Category</th><th>Score</th><th>Sub-section average</th><th>Status</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>
</section>"#
    )
}

fn render_chart_series(series: &[ChartSeriesEntry]) -> String {
    if series.is_empty() {
        return String::new();
    }

    let bars: String = series
        .iter()
        .map(|entry| {
            format!(
                r#"<li class="depth-{depth} {class}"><span class="label">{label}</span><span class="bar" style="width: {width}%"></span><span class="value">{score}</span></li>"#,
                depth = entry.depth,
                class = entry.status.css_class(),
                label = escape_html(&entry.label),
                width = entry.score.clamp(0.0, 100.0),
                score = format_score(entry.score),
            )
        })
        .collect();

    format!(
        r#"<section class="section">
    <h2>Scores</h2>
    <ul class="chart">{bars}</ul>
</section>"#
    )
}

fn render_trend_table(trend: &TrendTable) -> String {
    if trend.rows.is_empty() {
        return String::new();
    }

    let columns: String = trend
        .cycles
        .iter()
        .map(|cycle| format!("<th>{}</th>", escape_html(cycle)))
        .collect();

    let rows: String = trend
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .values
                .iter()
                .map(|value| format!("<td>{}</td>", escape_html(&value.display_label())))
                .collect();
            let class = match row.kind {
                TrendRowKind::Overall => "overall",
                TrendRowKind::Category => "category",
                TrendRowKind::Section => "sub-section",
            };
            format!(
                r#"<tr class="{class}"><td>{label}</td>{cells}</tr>"#,
                label = escape_html(&row.label),
            )
        })
        .collect();

    format!(
        r#"<section class="section">
    <h2>Trend</h2>
    <table class="trend">
        <thead><tr><th></th>{columns}</tr></thead>
        <tbody>{rows}</tbody>
    </table>
</section>"#
    )
}

fn render_section_heading(section: &Section) -> String {
    format!(
        r#"<h2>{title} <span class="{class}">{emoji} {score}</span></h2>"#,
        title = escape_html(&section.title),
        class = section.status.css_class(),
        emoji = section.status.emoji(),
        score = format_score(section.score),
    )
}

fn render_section(section: &Section) -> String {
    if section.placeholder {
        return format!(
            r#"<section class="section placeholder">
    {heading}
    <p class="{class}">{label}</p>
</section>"#,
            heading = render_section_heading(section),
            class = ScoreStatus::NoData.css_class(),
            label = ScoreStatus::NoData.label(),
        );
    }

    let items: String = section.items.iter().map(render_item_row).collect();
    let corrective: String = section.corrective_items().map(render_corrective_row).collect();
    let corrective_table = if corrective.is_empty() {
        r#"<p class="no-corrective">No corrective action required.</p>"#.to_string()
    } else {
        format!(
            r#"<table class="corrective">
        <thead><tr><th>Ref</th><th>Criteria</th><th>Finding</th><th>Corrective action</th><th>Severity</th><th>Before</th><th>After</th></tr></thead>
        <tbody>{corrective}</tbody>
    </table>"#
        )
    };

    format!(
        r#"<section class="section">
    {heading}
    <table class="items">
        <thead><tr><th>Ref</th><th>Criteria</th><th>Answer</th><th>Coefficient</th><th>Value</th><th>Comment</th></tr></thead>
        <tbody>{items}</tbody>
    </table>
    <h3>Corrective actions</h3>
    {corrective_table}
</section>"#,
        heading = render_section_heading(section),
    )
}

fn render_item_row(entry: &ScoredItem) -> String {
    let item = &entry.item;
    format!(
        r#"<tr class="{class}"><td>{reference}</td><td>{criteria}</td><td>{choice}</td><td>{coefficient}</td><td>{value}</td><td>{comment}</td></tr>"#,
        class = if entry.needs_corrective_action { "shortfall" } else { "met" },
        reference = escape_html(&item.reference_value),
        criteria = escape_html(&item.criteria_text),
        choice = item.selected_choice().label(),
        coefficient = format_score(item.coefficient()),
        value = item
            .value()
            .map(format_score)
            .unwrap_or_else(|| MISSING_TEXT.to_string()),
        comment = escape_html(&item.comment),
    )
}

fn render_corrective_row(entry: &ScoredItem) -> String {
    let item = &entry.item;
    format!(
        r#"<tr><td>{reference}</td><td>{criteria}</td><td>{finding}</td><td>{action}</td><td class="severity-{severity_class}">{severity}</td><td>{before}</td><td>{after}</td></tr>"#,
        reference = escape_html(&item.reference_value),
        criteria = escape_html(&item.criteria_text),
        finding = escape_html(&item.finding),
        action = escape_html(&item.corrective_action_text),
        severity_class = entry.severity.label().to_ascii_lowercase(),
        severity = entry.severity.label(),
        before = render_evidence_cell(&entry.before),
        after = render_evidence_cell(&entry.after),
    )
}

fn render_evidence_cell(cell: &EvidenceCell) -> String {
    match cell {
        EvidenceCell::Gallery(images) => {
            let figures: String = images
                .iter()
                .map(|image| {
                    format!(
                        r#"<img src="{src}" alt="{alt}" loading="lazy">"#,
                        src = escape_html(&image.src),
                        alt = escape_html(&image.caption),
                    )
                })
                .collect();
            format!(r#"<div class="gallery">{figures}</div>"#)
        }
        EvidenceCell::NoEvidence => format!(r#"<span class="no-evidence">{MISSING_TEXT}</span>"#),
        EvidenceCell::MissingAfter => {
            format!(r#"<span class="missing-after">{MISSING_AFTER_MARKER}</span>"#)
        }
    }
}

fn render_temperature_section(section: &Section, table: &TemperatureTable) -> String {
    format!(
        r#"<section class="section temperature">
    {heading}
    <p class="reference">Reference: {reference}</p>
    <h3>Findings</h3>
    {findings}
    <h3>Compliant readings</h3>
    {compliant}
</section>"#,
        heading = render_section_heading(section),
        reference = escape_html(&table.reference_value),
        findings = render_temperature_table(&table.findings, "temperature-findings"),
        compliant = render_temperature_table(&table.compliant, "temperature-compliant"),
    )
}

fn render_temperature_table(readings: &[TemperatureReading], class: &str) -> String {
    if readings.is_empty() {
        return format!(r#"<p class="{class} empty">{MISSING_TEXT}</p>"#);
    }

    let rows: String = readings
        .iter()
        .map(|reading| {
            format!(
                r#"<tr><td>{equipment}</td><td>{product}</td><td>{measured}</td><td>{limit}</td><td>{comment}</td><td>{action}</td></tr>"#,
                equipment = escape_html(&reading.equipment),
                product = escape_html(&reading.product),
                measured = escape_html(&reading.measured_label()),
                limit = escape_html(&reading.limit),
                comment = escape_html(&reading.comment),
                action = escape_html(&reading.corrective_action),
            )
        })
        .collect();

    format!(
        r#"<table class="{class}">
        <thead><tr><th>Equipment</th><th>Product</th><th>Measured</th><th>Limit</th><th>Comment</th><th>Corrective action</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>"#
    )
}

fn inline_css() -> &'static str {
    r#"
body { font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; color: #111827; margin: 0; }
.report { max-width: 1200px; margin: 0 auto; padding: 2rem; }
header h1 { margin-bottom: 0.5rem; }
.meta { display: grid; grid-template-columns: max-content 1fr; gap: 0.25rem 1rem; color: #4b5563; }
.section { margin-top: 2rem; }
table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
th, td { border: 1px solid #e5e7eb; padding: 0.4rem 0.6rem; text-align: left; vertical-align: top; }
thead th { background: #f3f4f6; }
.score-card { margin-top: 1.5rem; padding: 1rem 1.5rem; border-radius: 8px; background: #f9fafb; }
.score-card .score { font-size: 2.5rem; font-weight: 700; }
.status-pass { color: #047857; }
.status-fail { color: #b91c1c; }
.status-nodata { color: #6b7280; }
tr.category td { font-weight: 600; }
td.indent, li.depth-1 .label { padding-left: 1.5rem; }
.chart { list-style: none; padding: 0; }
.chart li { display: grid; grid-template-columns: 16rem 1fr 3rem; align-items: center; gap: 0.5rem; }
.chart .bar { display: block; height: 0.8rem; background: currentColor; border-radius: 4px; }
tr.shortfall td { background: #fef2f2; }
.severity-high { color: #b91c1c; font-weight: 600; }
.severity-medium { color: #b45309; }
.severity-low { color: #047857; }
.gallery img { max-width: 160px; max-height: 120px; margin: 0 0.25rem 0.25rem 0; border-radius: 4px; }
.no-evidence { color: #9ca3af; }
.missing-after { color: #b45309; font-weight: 600; }
.temperature-findings thead th { background: #fee2e2; }
.temperature-compliant thead th { background: #d1fae5; }
"#
}
