use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{dates, ids};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    #[default]
    Active,
    Inactive,
}

/// Share of a budget earmarked for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAllocation {
    #[serde(deserialize_with = "ids::deserialize")]
    pub category_id: String,
    pub allocated_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub budget_type: BudgetType,
    pub total_amount: Decimal,
    #[serde(deserialize_with = "dates::deserialize")]
    pub start_date: NaiveDate,
    #[serde(default, deserialize_with = "dates::deserialize_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_threshold")]
    pub alert_threshold: u8,
    #[serde(default)]
    pub status: BudgetStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub budget_categories: Vec<BudgetAllocation>,
}

fn default_threshold() -> u8 {
    80
}
