//! Report export: titled sections rendered as CSV, Markdown or JSON.

use anyhow::Result;
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use smartcart_core::analytics::DateRange;
use smartcart_core::{AnalyticsService, RecordStore};

/// Report kinds, one per analytics page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Sales,
    Inventory,
    Carts,
    Sessions,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Sales => "sales",
            ReportKind::Inventory => "inventory",
            ReportKind::Carts => "carts",
            ReportKind::Sessions => "sessions",
        }
    }

    /// Default report title, e.g. "SALES Report".
    pub fn title(&self) -> String {
        format!("{} Report", self.as_str().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Md,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Md => "md",
            ExportFormat::Json => "json",
        }
    }
}

/// One titled table.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Section {
    fn new(title: &'static str, headers: &[&'static str], rows: Vec<Vec<String>>) -> Self {
        Self {
            title,
            headers: headers.to_vec(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub kind: &'static str,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub generated: NaiveDate,
    pub sections: Vec<Section>,
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

/// Gather the sections of `kind` over `range`. `day` is used by the hourly
/// activity section only.
pub fn build_report<S: RecordStore + ?Sized>(
    service: &AnalyticsService<'_, S>,
    kind: ReportKind,
    range: DateRange,
    day: NaiveDate,
    generated: NaiveDate,
) -> Result<Report> {
    let from = range.from_date().format("%Y-%m-%d").to_string();
    let to = range.to_date().format("%Y-%m-%d").to_string();
    let (from, to) = (Some(from.as_str()), Some(to.as_str()));

    let sections = match kind {
        ReportKind::Sales => vec![
            Section::new(
                "Sales Trend Data",
                &["Date", "Sales ($)"],
                service
                    .sales_trend(from, to)?
                    .into_iter()
                    .map(|r| vec![r.date, money(r.sales)])
                    .collect(),
            ),
            Section::new(
                "Sales by Category Data",
                &["Category", "Sales ($)"],
                service
                    .sales_by_category(from, to)?
                    .into_iter()
                    .map(|r| vec![r.category, money(r.sales)])
                    .collect(),
            ),
        ],
        ReportKind::Inventory => vec![
            Section::new(
                "Inventory Levels Data",
                &["Category", "Stock"],
                service
                    .inventory_levels()?
                    .into_iter()
                    .map(|r| vec![r.category, r.stock.to_string()])
                    .collect(),
            ),
            Section::new(
                "Low Stock Items",
                &["Product", "Category", "Quantity"],
                service
                    .low_stock_items(None)?
                    .into_iter()
                    .map(|r| vec![r.name, r.category, r.quantity.to_string()])
                    .collect(),
            ),
        ],
        ReportKind::Carts => vec![
            Section::new(
                "Cart Status Data",
                &["Status", "Count"],
                service
                    .cart_status()?
                    .into_iter()
                    .map(|r| vec![r.name, r.value.to_string()])
                    .collect(),
            ),
            Section::new(
                "Cart Usage Data",
                &["Cart ID", "Sessions"],
                service
                    .cart_usage(from, to)?
                    .into_iter()
                    .map(|r| vec![r.cart, r.sessions.to_string()])
                    .collect(),
            ),
        ],
        ReportKind::Sessions => {
            let day = day.format("%Y-%m-%d").to_string();
            vec![
                Section::new(
                    "Average Session Value Data",
                    &["Date", "Value ($)"],
                    service
                        .avg_session_value(from, to)?
                        .into_iter()
                        .map(|r| vec![r.date, money(r.value)])
                        .collect(),
                ),
                Section::new(
                    "Hourly Session Activity Data",
                    &["Hour", "Sessions"],
                    service
                        .hourly_session_activity(Some(&day))?
                        .into_iter()
                        .map(|r| vec![r.hour, r.sessions.to_string()])
                        .collect(),
                ),
            ]
        }
    };

    Ok(Report {
        title: kind.title(),
        kind: kind.as_str(),
        from: range.from_date(),
        to: range.to_date(),
        generated,
        sections: sections.into_iter().filter(|s| !s.rows.is_empty()).collect(),
    })
}

/// `<title-slug>-<YYYY-MM-DD>.<ext>`
pub fn file_name(report: &Report, format: ExportFormat) -> String {
    let slug = report
        .title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!(
        "{}-{}.{}",
        slug,
        report.generated.format("%Y-%m-%d"),
        format.extension()
    )
}

pub fn render(report: &Report, format: ExportFormat) -> Result<String> {
    Ok(match format {
        ExportFormat::Csv => render_csv(report)?,
        ExportFormat::Md => render_markdown(report),
        ExportFormat::Json => serde_json::to_string_pretty(report)?,
    })
}

/// Sections separated by a blank line, CRLF line endings.
pub fn render_csv(report: &Report) -> Result<String> {
    let mut sections = Vec::with_capacity(report.sections.len());
    for section in &report.sections {
        // Title, header and data records differ in width
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        writer.write_record([section.title])?;
        writer.write_record(&section.headers)?;
        for row in &section.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush CSV section: {}", e.error()))?;
        sections.push(String::from_utf8(bytes)?);
    }
    Ok(sections.join("\r\n"))
}

pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", report.title));
    out.push_str(&format!(
        "Date Range: {} to {}  \nGenerated: {}\n",
        report.from.format("%Y-%m-%d"),
        report.to.format("%Y-%m-%d"),
        report.generated.format("%Y-%m-%d")
    ));

    if report.sections.is_empty() {
        out.push_str("\nNo data for this period.\n");
        return out;
    }

    for section in &report.sections {
        out.push_str(&format!("\n## {}\n\n", section.title));
        out.push_str(&format!("| {} |\n", section.headers.join(" | ")));
        out.push_str(&format!(
            "|{}\n",
            section.headers.iter().map(|_| "---|").collect::<String>()
        ));
        for row in &section.rows {
            let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        Report {
            title: ReportKind::Sales.title(),
            kind: "sales",
            from: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
            generated: NaiveDate::from_ymd_opt(2025, 4, 22).unwrap(),
            sections: vec![
                Section::new(
                    "Sales Trend Data",
                    &["Date", "Sales ($)"],
                    vec![vec!["04-21".to_string(), money(4.0)]],
                ),
                Section::new(
                    "Sales by Category Data",
                    &["Category", "Sales ($)"],
                    vec![vec!["Fruits, Fresh".to_string(), money(4.5)]],
                ),
            ],
        }
    }

    #[test]
    fn test_csv_layout() {
        let csv = render_csv(&sample()).unwrap();
        assert_eq!(
            csv,
            "Sales Trend Data\r\nDate,Sales ($)\r\n04-21,4.00\r\n\r\n\
             Sales by Category Data\r\nCategory,Sales ($)\r\n\"Fruits, Fresh\",4.50\r\n"
        );
    }

    #[test]
    fn test_csv_quotes_embedded_quotes_and_newlines() {
        let mut report = sample();
        report.sections.truncate(1);
        report.sections[0].rows = vec![vec!["say \"hi\"".to_string(), "two\nlines".to_string()]];
        let csv = render_csv(&report).unwrap();
        assert!(csv.ends_with("\"say \"\"hi\"\"\",\"two\nlines\"\r\n"));

        report.sections.clear();
        assert_eq!(render_csv(&report).unwrap(), "");
    }

    #[test]
    fn test_file_name() {
        let report = sample();
        assert_eq!(file_name(&report, ExportFormat::Csv), "sales-report-2025-04-22.csv");
        assert_eq!(file_name(&report, ExportFormat::Md), "sales-report-2025-04-22.md");
    }

    #[test]
    fn test_markdown_tables() {
        let md = render_markdown(&sample());
        assert!(md.starts_with("# SALES Report\n"));
        assert!(md.contains("## Sales Trend Data\n\n| Date | Sales ($) |\n|---|---|\n| 04-21 | 4.00 |\n"));
    }

    #[test]
    fn test_json_has_sections() {
        let json = render(&sample(), ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sections"].as_array().unwrap().len(), 2);
        assert_eq!(value["from"], "2025-04-15");
    }
}
