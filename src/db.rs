use chrono::{Duration, NaiveDate};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Channel, ChannelCounts, SalesRecord};
use crate::store::{LedgerStore, Snapshot};

const SELECT_RECORDS: &str = "SELECT id, sale_date, staff_name, \
     walk_in_leads, walk_in_sales, referral_leads, referral_sales, \
     cold_call_leads, cold_call_sales, social_leads, social_sales, \
     web_leads, web_sales, active_renewals, passive_renewals, collected \
     FROM sales_ledger.records ORDER BY position";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> LedgerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

fn count(row: &PgRow, column: &str) -> u32 {
    // Negative or NULL cells count as zero.
    row.try_get::<Option<i32>, _>(column)
        .ok()
        .flatten()
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0)
}

fn db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn record_from_row(row: &PgRow) -> SalesRecord {
    let mut channels = [ChannelCounts::default(); 5];
    channels[Channel::WalkIn.index()] =
        ChannelCounts::new(count(row, "walk_in_leads"), count(row, "walk_in_sales"));
    channels[Channel::Referral.index()] =
        ChannelCounts::new(count(row, "referral_leads"), count(row, "referral_sales"));
    channels[Channel::ColdCall.index()] =
        ChannelCounts::new(count(row, "cold_call_leads"), count(row, "cold_call_sales"));
    channels[Channel::Social.index()] =
        ChannelCounts::new(count(row, "social_leads"), count(row, "social_sales"));
    channels[Channel::Web.index()] =
        ChannelCounts::new(count(row, "web_leads"), count(row, "web_sales"));

    SalesRecord {
        id: row.get("id"),
        date: row.get("sale_date"),
        staff_name: row.get("staff_name"),
        channels,
        active_renewals: count(row, "active_renewals"),
        passive_renewals: count(row, "passive_renewals"),
        collected: row
            .try_get::<Option<f64>, _>("collected")
            .ok()
            .flatten()
            .unwrap_or(0.0),
    }
}

impl LedgerStore for PgStore {
    async fn init(&self) -> LedgerResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn read(&self) -> LedgerResult<Snapshot> {
        let mut tx = self.pool.begin().await?;

        let version: i64 = sqlx::query("SELECT version FROM sales_ledger.table_version WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?
            .get("version");
        let rows = sqlx::query(SELECT_RECORDS).fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let records: Vec<SalesRecord> = rows.iter().map(record_from_row).collect();
        log::debug!("read {} records at version {version}", records.len());

        Ok(Snapshot {
            records,
            version: version as u64,
        })
    }

    async fn write(&self, records: &[SalesRecord], expected_version: u64) -> LedgerResult<u64> {
        let mut tx = self.pool.begin().await?;

        // The row lock on table_version serialises concurrent writers.
        let bumped = sqlx::query(
            r#"
            UPDATE sales_ledger.table_version
            SET version = version + 1
            WHERE id = 1 AND version = $1
            RETURNING version
            "#,
        )
        .bind(expected_version as i64)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(bumped) = bumped else {
            let actual: i64 =
                sqlx::query("SELECT version FROM sales_ledger.table_version WHERE id = 1")
                    .fetch_one(&mut *tx)
                    .await?
                    .get("version");
            tx.rollback().await?;
            return Err(LedgerError::Conflict {
                expected: expected_version,
                actual: actual as u64,
            });
        };
        let new_version: i64 = bumped.get("version");

        sqlx::query("DELETE FROM sales_ledger.records")
            .execute(&mut *tx)
            .await?;

        for (position, record) in records.iter().enumerate() {
            let walk_in = record.counts(Channel::WalkIn);
            let referral = record.counts(Channel::Referral);
            let cold_call = record.counts(Channel::ColdCall);
            let social = record.counts(Channel::Social);
            let web = record.counts(Channel::Web);

            sqlx::query(
                r#"
                INSERT INTO sales_ledger.records
                (id, position, sale_date, staff_name,
                 walk_in_leads, walk_in_sales, referral_leads, referral_sales,
                 cold_call_leads, cold_call_sales, social_leads, social_sales,
                 web_leads, web_sales, active_renewals, passive_renewals, collected)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                "#,
            )
            .bind(record.id)
            .bind(position as i64)
            .bind(record.date)
            .bind(&record.staff_name)
            .bind(db_count(walk_in.leads_in))
            .bind(db_count(walk_in.sales))
            .bind(db_count(referral.leads_in))
            .bind(db_count(referral.sales))
            .bind(db_count(cold_call.leads_in))
            .bind(db_count(cold_call.sales))
            .bind(db_count(social.leads_in))
            .bind(db_count(social.sales))
            .bind(db_count(web.leads_in))
            .bind(db_count(web.sales))
            .bind(db_count(record.active_renewals))
            .bind(db_count(record.passive_renewals))
            .bind(record.collected)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        log::info!("wrote {} records, table now at version {new_version}", records.len());
        Ok(new_version as u64)
    }
}

/// A realistic week of activity for a fresh ledger, ending on `today`.
pub fn seed_records(today: NaiveDate) -> Vec<SalesRecord> {
    let plan: [(i64, &str, [(u32, u32); 5], (u32, u32), f64); 6] = [
        (6, "Ahmet", [(6, 2), (2, 1), (10, 1), (3, 0), (4, 1)], (1, 0), 18_500.0),
        (6, "Ayşe", [(4, 1), (3, 2), (0, 0), (5, 1), (2, 0)], (0, 1), 14_200.0),
        (4, "Mehmet", [(5, 1), (1, 0), (12, 2), (2, 0), (1, 0)], (2, 0), 21_000.0),
        (3, "Fatma", [(3, 2), (4, 2), (0, 0), (6, 2), (3, 1)], (1, 1), 26_750.0),
        (1, "Oğuz", [(7, 3), (0, 0), (8, 0), (1, 0), (2, 1)], (0, 0), 12_300.0),
        (0, "Ahmet", [(5, 2), (1, 1), (6, 1), (2, 1), (3, 0)], (0, 2), 16_900.0),
    ];

    plan.iter()
        .map(|(days_ago, staff, channels, (active, passive), collected)| {
            let mut record = SalesRecord::new(today - Duration::days(*days_ago), *staff)
                .with_renewals(*active, *passive)
                .with_collected(*collected);
            for (channel, (leads_in, sales)) in Channel::ALL.iter().zip(channels.iter()) {
                record = record.with_channel(*channel, *leads_in, *sales);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    #[test]
    fn seed_week_ends_today_and_uses_roster_names() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let records = seed_records(today);
        let roster = SessionConfig::default().staff_roster;

        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|record| roster.contains(&record.staff_name)));
        assert!(records.iter().all(|record| record.validate().is_ok()));
        assert_eq!(records.last().map(|record| record.date), Some(today));
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn db_counts_saturate() {
        assert_eq!(db_count(7), 7);
        assert_eq!(db_count(u32::MAX), i32::MAX);
    }
}
