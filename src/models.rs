use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

/// The five fixed lead sources, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    WalkIn,
    Referral,
    ColdCall,
    Social,
    Web,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::WalkIn,
        Channel::Referral,
        Channel::ColdCall,
        Channel::Social,
        Channel::Web,
    ];

    pub fn index(self) -> usize {
        match self {
            Channel::WalkIn => 0,
            Channel::Referral => 1,
            Channel::ColdCall => 2,
            Channel::Social => 3,
            Channel::Web => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Channel::WalkIn => "Walk-in",
            Channel::Referral => "Referral",
            Channel::ColdCall => "Cold Call",
            Channel::Social => "Social",
            Channel::Web => "Web",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCounts {
    pub leads_in: u32,
    pub sales: u32,
}

impl ChannelCounts {
    pub fn new(leads_in: u32, sales: u32) -> Self {
        Self { leads_in, sales }
    }
}

/// One staff member's activity on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub staff_name: String,
    pub channels: [ChannelCounts; 5],
    pub active_renewals: u32,
    pub passive_renewals: u32,
    pub collected: f64,
}

impl SalesRecord {
    pub fn new(date: NaiveDate, staff_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            staff_name: staff_name.into(),
            channels: [ChannelCounts::default(); 5],
            active_renewals: 0,
            passive_renewals: 0,
            collected: 0.0,
        }
    }

    pub fn with_channel(mut self, channel: Channel, leads_in: u32, sales: u32) -> Self {
        self.channels[channel.index()] = ChannelCounts::new(leads_in, sales);
        self
    }

    pub fn with_renewals(mut self, active: u32, passive: u32) -> Self {
        self.active_renewals = active;
        self.passive_renewals = passive;
        self
    }

    pub fn with_collected(mut self, collected: f64) -> Self {
        self.collected = collected;
        self
    }

    pub fn counts(&self, channel: Channel) -> ChannelCounts {
        self.channels[channel.index()]
    }

    pub fn leads_in(&self) -> u64 {
        self.channels.iter().map(|c| u64::from(c.leads_in)).sum()
    }

    pub fn channel_sales(&self) -> u64 {
        self.channels.iter().map(|c| u64::from(c.sales)).sum()
    }

    /// Channel sales plus both kinds of renewal.
    pub fn total_sales(&self) -> u64 {
        self.channel_sales() + u64::from(self.active_renewals) + u64::from(self.passive_renewals)
    }

    /// Checks applied at entry time. Aggregation never calls this.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.staff_name.trim().is_empty() {
            return Err(LedgerError::InvalidRecord {
                reason: "staff name is empty".to_string(),
            });
        }
        if !self.collected.is_finite() || self.collected < 0.0 {
            return Err(LedgerError::InvalidRecord {
                reason: format!("collected amount {} is not a non-negative number", self.collected),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClubKpis {
    pub total_collected: f64,
    pub target: f64,
    pub remaining: f64,
    pub percent_to_target: f64,
}

impl ClubKpis {
    /// Ratio clamped to `[0, 1]` for progress bars.
    pub fn progress(&self) -> f64 {
        self.percent_to_target.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelConversion {
    pub channel: Channel,
    pub leads_in: u64,
    pub sales: u64,
    pub conversion_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub staff_name: String,
    pub total_collected: f64,
    pub total_sales: u64,
    pub top_performer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffBreakdown {
    pub staff_name: String,
    pub channels: Vec<ChannelConversion>,
    /// `None` when the staff member has no channel sales at all.
    pub best_channel: Option<Channel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffDayLine {
    pub staff_name: String,
    pub leads_in: u64,
    pub sales_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_collected: f64,
    pub total_sales_count: u64,
    pub lines: Vec<StaffDayLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCollected {
    pub date: NaiveDate,
    pub collected: f64,
}
