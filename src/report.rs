use std::fmt::Write;

use chrono::NaiveDate;

use crate::config::SessionConfig;
use crate::metrics;
use crate::models::{DailySummary, SalesRecord};

pub const CURRENCY: &str = "₺";

/// Whole currency units with `,` between thousands.
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Text meant to be pasted into the staff group chat. People copy it by
/// hand, so the layout and labels must not drift.
pub fn format_whatsapp_report(summary: &DailySummary, date: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "*Daily Sales Report {}*", date.format("%d.%m"));
    let _ = writeln!(
        output,
        "Collected: {} {}",
        format_amount(summary.total_collected),
        CURRENCY
    );
    let _ = writeln!(output, "Sales: {}", summary.total_sales_count);
    let _ = writeln!(output);

    for line in &summary.lines {
        let _ = writeln!(
            output,
            "{}: {} leads / {} sales",
            line.staff_name, line.leads_in, line.sales_count
        );
    }

    output
}

pub fn format_no_activity(date: NaiveDate) -> String {
    format!("*Daily Sales Report {}*\nNo activity recorded.\n", date.format("%d.%m"))
}

/// Markdown overview of the club: target progress, channel conversion,
/// leaderboard and the collected-per-day trend.
pub fn build_report(config: &SessionConfig, records: &[SalesRecord], period: &str) -> String {
    let kpis = metrics::club_kpis(records, config.monthly_target);
    let channels = metrics::channel_conversion(records);
    let leaderboard = metrics::staff_leaderboard(records);
    let trend = metrics::daily_collected(records);

    let mut output = String::new();

    let _ = writeln!(output, "# Sales Report");
    let _ = writeln!(output, "Period: {} ({} records)", period, records.len());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Target");
    let _ = writeln!(
        output,
        "- Collected: {} {}",
        format_amount(kpis.total_collected),
        CURRENCY
    );
    let _ = writeln!(output, "- Target: {} {}", format_amount(kpis.target), CURRENCY);
    let _ = writeln!(
        output,
        "- Remaining: {} {}",
        format_amount(kpis.remaining),
        CURRENCY
    );
    let _ = writeln!(output, "- Progress: {:.1}%", kpis.progress() * 100.0);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Channel Conversion");
    let _ = writeln!(output, "| Channel | Leads | Sales | Conversion |");
    let _ = writeln!(output, "|---|---:|---:|---:|");
    for row in &channels {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {:.1}% |",
            row.channel.label(),
            row.leads_in,
            row.sales,
            row.conversion_pct
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Leaderboard");
    if leaderboard.is_empty() {
        let _ = writeln!(output, "No sales recorded for this period.");
    } else {
        for row in &leaderboard {
            let marker = if row.top_performer { " (top performer)" } else { "" };
            let _ = writeln!(
                output,
                "- {}: {} {} across {} sales{}",
                row.staff_name,
                format_amount(row.total_collected),
                CURRENCY,
                row.total_sales,
                marker
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Collected");
    if trend.is_empty() {
        let _ = writeln!(output, "No collections recorded for this period.");
    } else {
        for point in &trend {
            let _ = writeln!(
                output,
                "- {}: {} {}",
                point.date,
                format_amount(point.collected),
                CURRENCY
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, StaffDayLine};

    #[test]
    fn amounts_are_grouped_by_thousands() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.4), "999");
        assert_eq!(format_amount(12_000.0), "12,000");
        assert_eq!(format_amount(1_234_567.6), "1,234,568");
        assert_eq!(format_amount(-4_500.0), "-4,500");
    }

    #[test]
    fn whatsapp_report_layout() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let summary = DailySummary {
            date,
            total_collected: 12_000.0,
            total_sales_count: 4,
            lines: vec![StaffDayLine {
                staff_name: "Ahmet".to_string(),
                leads_in: 10,
                sales_count: 4,
            }],
        };

        let text = format_whatsapp_report(&summary, date);
        assert!(text.contains("05.03"));
        assert!(text.contains("12,000"));
        assert!(text.contains("Ahmet: 10 leads / 4 sales"));
        assert_eq!(
            text,
            "*Daily Sales Report 05.03*\nCollected: 12,000 ₺\nSales: 4\n\nAhmet: 10 leads / 4 sales\n"
        );
    }

    #[test]
    fn no_activity_text_names_the_day() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();
        assert!(format_no_activity(date).contains("28.11"));
    }

    #[test]
    fn report_sections_render_for_empty_table() {
        let report = build_report(&SessionConfig::default(), &[], "2024-03");
        assert!(report.contains("- Remaining: 500,000 ₺"));
        assert!(report.contains("| Web | 0 | 0 | 0.0% |"));
        assert!(report.contains("No sales recorded for this period."));
    }

    #[test]
    fn report_marks_top_performer() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let records = vec![
            SalesRecord::new(date, "Ahmet")
                .with_channel(Channel::WalkIn, 4, 2)
                .with_collected(3_000.0),
            SalesRecord::new(date, "Mehmet").with_collected(1_000.0),
        ];

        let report = build_report(&SessionConfig::default(), &records, "2024-03");
        assert!(report.contains("- Ahmet: 3,000 ₺ across 2 sales (top performer)"));
        assert!(report.contains("- Mehmet: 1,000 ₺ across 0 sales\n"));
        assert!(report.contains("| Walk-in | 4 | 2 | 50.0% |"));
        assert!(report.contains("- 2024-03-05: 4,000 ₺"));
    }
}
