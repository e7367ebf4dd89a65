use chrono::{Datelike, NaiveDate};

use crate::models::{
    Channel, ChannelConversion, ClubKpis, DailyCollected, DailySummary, LeaderboardRow,
    SalesRecord, StaffBreakdown, StaffDayLine,
};

pub fn club_kpis(records: &[SalesRecord], target: f64) -> ClubKpis {
    let total_collected: f64 = records.iter().map(|record| record.collected).sum();

    ClubKpis {
        total_collected,
        target,
        remaining: target - total_collected,
        percent_to_target: if target > 0.0 {
            total_collected / target
        } else {
            0.0
        },
    }
}

pub fn channel_conversion(records: &[SalesRecord]) -> Vec<ChannelConversion> {
    Channel::ALL
        .iter()
        .map(|&channel| {
            let (leads_in, sales) = records.iter().fold((0u64, 0u64), |(leads, sales), record| {
                let counts = record.counts(channel);
                (leads + u64::from(counts.leads_in), sales + u64::from(counts.sales))
            });

            ChannelConversion {
                channel,
                leads_in,
                sales,
                conversion_pct: conversion_pct(leads_in, sales),
            }
        })
        .collect()
}

pub fn conversion_pct(leads_in: u64, sales: u64) -> f64 {
    if leads_in == 0 {
        0.0
    } else {
        sales as f64 / leads_in as f64 * 100.0
    }
}

/// Rows are ordered by staff name ascending.
pub fn staff_leaderboard(records: &[SalesRecord]) -> Vec<LeaderboardRow> {
    let mut totals: std::collections::HashMap<&str, (f64, u64)> =
        std::collections::HashMap::new();

    for record in records {
        let entry = totals.entry(record.staff_name.as_str()).or_insert((0.0, 0));
        entry.0 += record.collected;
        entry.1 += record.total_sales();
    }

    // Ties are compared in whole cents.
    let best = totals
        .values()
        .map(|(collected, _)| cents(*collected))
        .max()
        .unwrap_or(0);

    let mut rows: Vec<LeaderboardRow> = totals
        .into_iter()
        .map(|(staff_name, (total_collected, total_sales))| LeaderboardRow {
            staff_name: staff_name.to_string(),
            total_collected,
            total_sales,
            top_performer: best > 0 && cents(total_collected) == best,
        })
        .collect();

    rows.sort_by(|a, b| a.staff_name.cmp(&b.staff_name));
    rows
}

fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn staff_channel_breakdown(records: &[SalesRecord], staff_name: &str) -> StaffBreakdown {
    let own: Vec<SalesRecord> = records
        .iter()
        .filter(|record| record.staff_name == staff_name)
        .cloned()
        .collect();
    let channels = channel_conversion(&own);

    // Earliest channel wins a tie.
    let best_channel = channels
        .iter()
        .filter(|row| row.sales > 0)
        .fold(None::<&ChannelConversion>, |best, row| match best {
            Some(current) if current.sales >= row.sales => Some(current),
            _ => Some(row),
        })
        .map(|row| row.channel);

    StaffBreakdown {
        staff_name: staff_name.to_string(),
        channels,
        best_channel,
    }
}

/// Returns `None` when nobody recorded anything on `date`.
pub fn daily_summary(records: &[SalesRecord], date: NaiveDate) -> Option<DailySummary> {
    let mut lines: Vec<StaffDayLine> = Vec::new();
    let mut total_collected = 0.0;
    let mut total_sales_count = 0u64;
    let mut matched = false;

    for record in records.iter().filter(|record| record.date == date) {
        matched = true;
        total_collected += record.collected;
        total_sales_count += record.total_sales();

        match lines.iter_mut().find(|line| line.staff_name == record.staff_name) {
            Some(line) => {
                line.leads_in += record.leads_in();
                line.sales_count += record.total_sales();
            }
            None => lines.push(StaffDayLine {
                staff_name: record.staff_name.clone(),
                leads_in: record.leads_in(),
                sales_count: record.total_sales(),
            }),
        }
    }

    if !matched {
        return None;
    }

    lines.sort_by(|a, b| a.staff_name.cmp(&b.staff_name));
    Some(DailySummary {
        date,
        total_collected,
        total_sales_count,
        lines,
    })
}

pub fn daily_collected(records: &[SalesRecord]) -> Vec<DailyCollected> {
    let mut by_date: std::collections::BTreeMap<NaiveDate, f64> =
        std::collections::BTreeMap::new();

    for record in records {
        *by_date.entry(record.date).or_insert(0.0) += record.collected;
    }

    by_date
        .into_iter()
        .map(|(date, collected)| DailyCollected { date, collected })
        .collect()
}

pub fn for_month(records: &[SalesRecord], year: i32, month: u32) -> Vec<SalesRecord> {
    records
        .iter()
        .filter(|record| record.date.year() == year && record.date.month() == month)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample_record(staff: &str, d: u32, collected: f64) -> SalesRecord {
        SalesRecord::new(day(d), staff).with_collected(collected)
    }

    #[test]
    fn empty_input_yields_zero_views() {
        let kpis = club_kpis(&[], 500_000.0);
        assert_eq!(kpis.total_collected, 0.0);
        assert_eq!(kpis.remaining, 500_000.0);
        assert_eq!(kpis.percent_to_target, 0.0);

        let channels = channel_conversion(&[]);
        assert_eq!(channels.len(), 5);
        assert!(channels.iter().all(|row| row.leads_in == 0 && row.conversion_pct == 0.0));

        assert!(staff_leaderboard(&[]).is_empty());
        let breakdown = staff_channel_breakdown(&[], "Ahmet");
        assert_eq!(breakdown.channels.len(), 5);
        assert_eq!(breakdown.best_channel, None);
        assert_eq!(daily_summary(&[], day(5)), None);
        assert!(daily_collected(&[]).is_empty());
    }

    #[test]
    fn remaining_is_not_clamped_when_target_exceeded() {
        let records = vec![sample_record("Ahmet", 1, 700.0), sample_record("Ayşe", 2, 500.5)];
        let kpis = club_kpis(&records, 1000.0);
        assert_eq!(kpis.total_collected, 1200.5);
        assert_eq!(kpis.remaining, 1000.0 - 1200.5);
        assert!((kpis.percent_to_target - 1.2005).abs() < 1e-9);
        assert_eq!(kpis.progress(), 1.0);
    }

    #[test]
    fn zero_target_gives_zero_ratio() {
        let kpis = club_kpis(&[sample_record("Ahmet", 1, 300.0)], 0.0);
        assert_eq!(kpis.percent_to_target, 0.0);
        assert_eq!(kpis.remaining, -300.0);
    }

    #[test]
    fn conversion_rows_follow_channel_order() {
        let records = vec![
            sample_record("Ahmet", 1, 0.0)
                .with_channel(Channel::WalkIn, 4, 1)
                .with_channel(Channel::Web, 0, 2),
            sample_record("Mehmet", 1, 0.0).with_channel(Channel::WalkIn, 6, 4),
        ];

        let rows = channel_conversion(&records);
        let order: Vec<Channel> = rows.iter().map(|row| row.channel).collect();
        assert_eq!(order, Channel::ALL.to_vec());

        assert_eq!(rows[0].leads_in, 10);
        assert_eq!(rows[0].sales, 5);
        assert!((rows[0].conversion_pct - 50.0).abs() < 1e-9);
        // Sales without leads still report zero conversion.
        assert_eq!(rows[4].sales, 2);
        assert_eq!(rows[4].conversion_pct, 0.0);
    }

    #[test]
    fn leaderboard_matches_manual_sums() {
        let records = vec![
            sample_record("A", 1, 1000.0).with_channel(Channel::WalkIn, 5, 2),
            sample_record("A", 2, 500.0).with_channel(Channel::WalkIn, 3, 1),
        ];

        let rows = staff_leaderboard(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].staff_name, "A");
        assert_eq!(rows[0].total_collected, 1500.0);
        assert_eq!(rows[0].total_sales, 3);
        assert!(rows[0].top_performer);
    }

    #[test]
    fn leaderboard_counts_renewals_and_sorts_by_name() {
        let records = vec![
            sample_record("Mehmet", 1, 200.0).with_renewals(2, 1),
            sample_record("Ahmet", 1, 100.0).with_channel(Channel::Social, 3, 3),
        ];

        let rows = staff_leaderboard(&records);
        let names: Vec<&str> = rows.iter().map(|row| row.staff_name.as_str()).collect();
        assert_eq!(names, vec!["Ahmet", "Mehmet"]);
        assert_eq!(rows[0].total_sales, 3);
        assert_eq!(rows[1].total_sales, 3);
        assert!(!rows[0].top_performer);
        assert!(rows[1].top_performer);
    }

    #[test]
    fn top_performer_includes_ties() {
        let records = vec![
            sample_record("Ahmet", 1, 900.0),
            sample_record("Fatma", 1, 900.0),
            sample_record("Oğuz", 1, 100.0),
        ];

        let flagged: Vec<String> = staff_leaderboard(&records)
            .into_iter()
            .filter(|row| row.top_performer)
            .map(|row| row.staff_name)
            .collect();
        assert_eq!(flagged, vec!["Ahmet".to_string(), "Fatma".to_string()]);
    }

    #[test]
    fn top_performer_tie_ignores_float_noise() {
        let records = vec![
            sample_record("Ahmet", 1, 0.1),
            sample_record("Ahmet", 2, 0.2),
            sample_record("Fatma", 1, 0.3),
        ];

        let rows = staff_leaderboard(&records);
        assert!(rows.iter().all(|row| row.top_performer));
    }

    #[test]
    fn nobody_is_top_performer_without_collections() {
        let records = vec![
            sample_record("Ahmet", 1, 0.0).with_channel(Channel::WalkIn, 2, 1),
            sample_record("Fatma", 1, 0.0),
        ];
        assert!(staff_leaderboard(&records).iter().all(|row| !row.top_performer));
    }

    #[test]
    fn breakdown_filters_to_staff_and_picks_best_channel() {
        let records = vec![
            sample_record("Ahmet", 1, 0.0)
                .with_channel(Channel::Referral, 4, 2)
                .with_channel(Channel::Social, 5, 3),
            sample_record("Mehmet", 1, 0.0).with_channel(Channel::Web, 10, 9),
        ];

        let breakdown = staff_channel_breakdown(&records, "Ahmet");
        assert_eq!(breakdown.best_channel, Some(Channel::Social));
        assert_eq!(breakdown.channels[Channel::Web.index()].sales, 0);
        assert_eq!(breakdown.channels[Channel::Referral.index()].leads_in, 4);
    }

    #[test]
    fn breakdown_tie_goes_to_earlier_channel() {
        let records = vec![sample_record("Ahmet", 1, 0.0)
            .with_channel(Channel::ColdCall, 2, 2)
            .with_channel(Channel::Referral, 3, 2)];
        let breakdown = staff_channel_breakdown(&records, "Ahmet");
        assert_eq!(breakdown.best_channel, Some(Channel::Referral));
    }

    #[test]
    fn breakdown_without_sales_has_no_best_channel() {
        let records = vec![sample_record("Ahmet", 1, 50.0).with_channel(Channel::WalkIn, 8, 0)];
        assert_eq!(staff_channel_breakdown(&records, "Ahmet").best_channel, None);
    }

    #[test]
    fn daily_summary_filters_exact_date() {
        let records = vec![
            sample_record("Mehmet", 5, 300.0).with_channel(Channel::WalkIn, 4, 1),
            sample_record("Ahmet", 5, 200.0)
                .with_channel(Channel::WalkIn, 6, 2)
                .with_renewals(1, 0),
            sample_record("Ahmet", 5, 100.0).with_channel(Channel::Web, 2, 1),
            sample_record("Ahmet", 6, 999.0).with_channel(Channel::WalkIn, 9, 9),
        ];

        let summary = daily_summary(&records, day(5)).expect("records exist on the 5th");
        assert_eq!(summary.total_collected, 600.0);
        assert_eq!(summary.total_sales_count, 5);
        assert_eq!(
            summary.lines,
            vec![
                StaffDayLine {
                    staff_name: "Ahmet".to_string(),
                    leads_in: 8,
                    sales_count: 4,
                },
                StaffDayLine {
                    staff_name: "Mehmet".to_string(),
                    leads_in: 4,
                    sales_count: 1,
                },
            ]
        );
    }

    #[test]
    fn daily_summary_signals_no_records() {
        let records = vec![sample_record("Ahmet", 5, 0.0)];
        assert!(daily_summary(&records, day(5)).is_some());
        assert!(daily_summary(&records, day(7)).is_none());
    }

    #[test]
    fn daily_collected_is_sorted_by_date() {
        let records = vec![
            sample_record("Ahmet", 9, 10.0),
            sample_record("Ayşe", 2, 5.0),
            sample_record("Fatma", 9, 15.0),
        ];
        let trend = daily_collected(&records);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, day(2));
        assert_eq!(trend[1].collected, 25.0);
    }

    #[test]
    fn month_filter_keeps_only_that_month() {
        let mut records = vec![sample_record("Ahmet", 9, 10.0)];
        records.push(SalesRecord::new(
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            "Ahmet",
        ));
        assert_eq!(for_month(&records, 2024, 3).len(), 1);
        assert_eq!(for_month(&records, 2023, 3).len(), 0);
    }
}
