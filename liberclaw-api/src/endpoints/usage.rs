use crate::macros::json_response;
use crate::request::{NoData, Request, RequestData};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub daily_messages_used: u32,
    pub daily_messages_limit: u32,
    pub agent_count: u32,
    pub agent_limit: u32,
    pub tier: String,
}

impl UsageSummary {
    pub fn messages_remaining(&self) -> u32 {
        self.daily_messages_limit
            .saturating_sub(self.daily_messages_used)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageDay {
    pub date: NaiveDate,
    pub message_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageHistory {
    pub days: Vec<UsageDay>,
}

impl UsageHistory {
    pub fn total_messages(&self) -> u32 {
        self.days.iter().map(|day| day.message_count).sum()
    }
}

json_response!(UsageSummary, UsageHistory);

// Requests

#[derive(Debug, Clone, Default)]
pub struct GetUsage;

impl Request for GetUsage {
    type Data = NoData;
    type Response = UsageSummary;

    fn endpoint(&self) -> Cow<'_, str> {
        "/usage/".into()
    }
}

/// Daily message counts for the last `days` days (1 to 90).
#[derive(Debug, Clone, Serialize)]
pub struct GetUsageHistory {
    days: u32,
}

impl GetUsageHistory {
    pub const MAX_DAYS: u32 = 90;

    pub fn new(days: u32) -> Self {
        Self {
            days: days.clamp(1, Self::MAX_DAYS),
        }
    }
}

impl Default for GetUsageHistory {
    fn default() -> Self {
        Self::new(30)
    }
}

impl Request for GetUsageHistory {
    type Data = Self;
    type Response = UsageHistory;

    fn endpoint(&self) -> Cow<'_, str> {
        "/usage/history".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Query(self)
    }
}
