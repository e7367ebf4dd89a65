use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Channel, ChannelCounts, SalesRecord};
use crate::store::{LedgerStore, Snapshot};

pub const SHEET_HEADERS: [&str; 16] = [
    "id",
    "date",
    "staff",
    "walk_in_leads",
    "walk_in_sales",
    "referral_leads",
    "referral_sales",
    "cold_call_leads",
    "cold_call_sales",
    "social_leads",
    "social_sales",
    "web_leads",
    "web_sales",
    "active_renewals",
    "passive_renewals",
    "collected",
];

/// How to identify rows that have no `id` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingIds {
    /// Derived from content and row position, so repeated reads of the
    /// ledger's own sheet agree until the next write stores the id.
    Positional,
    /// A new random id per row. Used for sheets merged into the ledger.
    Fresh,
}

// Old Turkish workbook headers are accepted as aliases.
#[derive(Debug, Serialize, Deserialize)]
struct SheetRow {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(alias = "Tarih", deserialize_with = "sheet_date")]
    date: NaiveDate,
    #[serde(alias = "Personel")]
    staff: String,
    #[serde(default, alias = "Walkin_Gelen", deserialize_with = "sheet_count")]
    walk_in_leads: u32,
    #[serde(default, alias = "Walkin_Satis", deserialize_with = "sheet_count")]
    walk_in_sales: u32,
    #[serde(default, alias = "Referans_Gelen", deserialize_with = "sheet_count")]
    referral_leads: u32,
    #[serde(default, alias = "Referans_Satis", deserialize_with = "sheet_count")]
    referral_sales: u32,
    #[serde(default, alias = "Dis_Arama_Gelen", deserialize_with = "sheet_count")]
    cold_call_leads: u32,
    #[serde(default, alias = "Dis_Arama_Satis", deserialize_with = "sheet_count")]
    cold_call_sales: u32,
    #[serde(default, alias = "Sosyal_Gelen", deserialize_with = "sheet_count")]
    social_leads: u32,
    #[serde(default, alias = "Sosyal_Satis", deserialize_with = "sheet_count")]
    social_sales: u32,
    #[serde(default, alias = "Web_Gelen", deserialize_with = "sheet_count")]
    web_leads: u32,
    #[serde(default, alias = "Web_Satis", deserialize_with = "sheet_count")]
    web_sales: u32,
    #[serde(default, alias = "Aktif_Yenileme", deserialize_with = "sheet_count")]
    active_renewals: u32,
    #[serde(default, alias = "Pasif_Yenileme", deserialize_with = "sheet_count")]
    passive_renewals: u32,
    #[serde(default, alias = "Tahsilat", deserialize_with = "sheet_amount")]
    collected: f64,
}

impl SheetRow {
    fn record_id(&self, position: usize, missing_ids: MissingIds) -> Uuid {
        match (self.id, missing_ids) {
            (Some(id), _) => id,
            (None, MissingIds::Fresh) => Uuid::new_v4(),
            (None, MissingIds::Positional) => {
                let key = format!(
                    "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
                    position,
                    self.date,
                    self.staff,
                    self.walk_in_leads,
                    self.walk_in_sales,
                    self.referral_leads,
                    self.referral_sales,
                    self.cold_call_leads,
                    self.cold_call_sales,
                    self.social_leads,
                    self.social_sales,
                    self.web_leads,
                    self.web_sales,
                    self.active_renewals,
                    self.passive_renewals,
                    self.collected
                );
                Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
            }
        }
    }

    fn into_record(self, id: Uuid) -> SalesRecord {
        let mut channels = [ChannelCounts::default(); 5];
        channels[Channel::WalkIn.index()] = ChannelCounts::new(self.walk_in_leads, self.walk_in_sales);
        channels[Channel::Referral.index()] =
            ChannelCounts::new(self.referral_leads, self.referral_sales);
        channels[Channel::ColdCall.index()] =
            ChannelCounts::new(self.cold_call_leads, self.cold_call_sales);
        channels[Channel::Social.index()] = ChannelCounts::new(self.social_leads, self.social_sales);
        channels[Channel::Web.index()] = ChannelCounts::new(self.web_leads, self.web_sales);

        SalesRecord {
            id,
            date: self.date,
            staff_name: self.staff,
            channels,
            active_renewals: self.active_renewals,
            passive_renewals: self.passive_renewals,
            collected: self.collected,
        }
    }

    fn from_record(record: &SalesRecord) -> Self {
        let walk_in = record.counts(Channel::WalkIn);
        let referral = record.counts(Channel::Referral);
        let cold_call = record.counts(Channel::ColdCall);
        let social = record.counts(Channel::Social);
        let web = record.counts(Channel::Web);

        Self {
            id: Some(record.id),
            date: record.date,
            staff: record.staff_name.clone(),
            walk_in_leads: walk_in.leads_in,
            walk_in_sales: walk_in.sales,
            referral_leads: referral.leads_in,
            referral_sales: referral.sales,
            cold_call_leads: cold_call.leads_in,
            cold_call_sales: cold_call.sales,
            social_leads: social.leads_in,
            social_sales: social.sales,
            web_leads: web.leads_in,
            web_sales: web.sales,
            active_renewals: record.active_renewals,
            passive_renewals: record.passive_renewals,
            collected: record.collected,
        }
    }
}

fn sheet_cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("'{text}' is not a number"))),
    }
}

/// Blank cells count as zero; spreadsheets may hand back `5.0` for `5`.
fn sheet_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = sheet_cell(deserializer)?.unwrap_or(0.0);
    if !value.is_finite() || value <= 0.0 {
        return Ok(0);
    }
    Ok(value.round().min(f64::from(u32::MAX)) as u32)
}

fn sheet_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(sheet_cell(deserializer)?
        .filter(|value| value.is_finite())
        .unwrap_or(0.0))
}

/// Accepts `2024-03-05` as well as timestamps such as `2024-03-05 00:00:00`.
fn sheet_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| D::Error::custom(format!("'{trimmed}' is not a date")))
}

fn fingerprint(contents: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    contents.hash(&mut hasher);
    // Zero is reserved for "no file yet".
    hasher.finish().max(1)
}

pub fn parse_sheet(contents: &[u8], missing_ids: MissingIds) -> LedgerResult<Vec<SalesRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents);

    let mut records = Vec::new();
    for (position, result) in reader.deserialize::<SheetRow>().enumerate() {
        let row = result?;
        let id = row.record_id(position, missing_ids);
        records.push(row.into_record(id));
    }
    Ok(records)
}

pub fn render_sheet(records: &[SalesRecord]) -> LedgerResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(SHEET_HEADERS)?;
    for record in records {
        writer.serialize(SheetRow::from_record(record))?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|err| LedgerError::Io(err.into_error()))
}

#[derive(Debug, Clone)]
pub struct SheetStore {
    path: PathBuf,
}

impl SheetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records of a sheet that is about to be merged into the ledger.
    /// Id-less rows get fresh ids so they never collide with ledger rows.
    pub async fn read_for_import(&self) -> LedgerResult<Vec<SalesRecord>> {
        let contents = tokio::fs::read(&self.path).await?;
        parse_sheet(&contents, MissingIds::Fresh)
    }

    async fn current_contents(&self) -> LedgerResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl LedgerStore for SheetStore {
    async fn init(&self) -> LedgerResult<()> {
        if self.current_contents().await?.is_none() {
            self.write(&[], 0).await?;
            log::info!("created empty sheet at {}", self.path.display());
        }
        Ok(())
    }

    async fn read(&self) -> LedgerResult<Snapshot> {
        let Some(contents) = self.current_contents().await? else {
            log::debug!("sheet {} does not exist yet", self.path.display());
            return Ok(Snapshot::empty());
        };

        let records = parse_sheet(&contents, MissingIds::Positional)?;
        log::debug!("read {} records from {}", records.len(), self.path.display());
        Ok(Snapshot {
            records,
            version: fingerprint(&contents),
        })
    }

    async fn write(&self, records: &[SalesRecord], expected_version: u64) -> LedgerResult<u64> {
        let actual = self
            .current_contents()
            .await?
            .map(|contents| fingerprint(&contents))
            .unwrap_or(0);
        if actual != expected_version {
            return Err(LedgerError::Conflict {
                expected: expected_version,
                actual,
            });
        }

        let contents = render_sheet(records)?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        tokio::fs::write(&staging, &contents).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        log::info!("wrote {} records to {}", records.len(), self.path.display());
        Ok(fingerprint(&contents))
    }
}
