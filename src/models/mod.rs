//! Request and response schemas for the finance tracker backend.
//!
//! Request bodies are typed per entity (`IncomeInput`, `ExpenseInput`,
//! ...). Responses wrap the same fields in [`Record`], which adds the
//! server-assigned id.

mod auth;
mod bank_account;
mod budget;
mod category;
mod income;
mod invoice;
mod party;

pub use auth::{AuthPayload, LoginRequest, Profile, RegisterRequest, Tokens, User};
pub use bank_account::{AccountType, BankAccountInput};
pub use budget::{BudgetAllocation, BudgetInput, BudgetStatus, BudgetType};
pub use category::{CategoryInput, CategoryType};
pub use income::{ExpenseInput, IncomeInput};
pub use invoice::{ClientSummary, Invoice, InvoicePayload, InvoiceStatus, StoredItem};
pub use party::{ClientInput, ContactDetails, PartyType, VendorInput};

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A persisted entity: the server id plus the entity's own fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    #[serde(deserialize_with = "ids::deserialize")]
    pub id: String,
    #[serde(flatten)]
    pub fields: T,
}

/// Lifecycle of a payment on an income, expense or invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        };
        f.write_str(label)
    }
}

/// Ids come back as strings from some endpoints and integers from others.
pub(crate) mod ids {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        })
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<RawId>::deserialize(deserializer)? {
            Some(RawId::Text(s)) if s.is_empty() => None,
            Some(RawId::Text(s)) => Some(s),
            Some(RawId::Number(n)) => Some(n.to_string()),
            None => None,
        })
    }
}

/// Treat a JSON `null` string as empty.
pub(crate) fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Dates are sent as `YYYY-MM-DD` and may come back as full timestamps.
pub(crate) mod dates {
    use chrono::NaiveDate;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn parse(value: &str) -> Option<NaiveDate> {
        let day = value.get(..10).unwrap_or(value);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'")))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Dated {
        #[serde(deserialize_with = "dates::deserialize")]
        day: NaiveDate,
        #[serde(default, deserialize_with = "dates::deserialize_opt")]
        due: Option<NaiveDate>,
    }

    #[test]
    fn test_record_accepts_numeric_id() {
        let record: Record<ClientInput> = serde_json::from_value(json!({
            "id": 42,
            "clientType": "company",
            "companyName": "Acme",
            "email": "ap@acme.test"
        }))
        .unwrap();

        assert_eq!(record.id, "42");
        assert_eq!(record.fields.client_type, PartyType::Company);
        assert_eq!(record.fields.contact.company_name, "Acme");
    }

    #[test]
    fn test_dates_accept_timestamps() {
        let dated: Dated = serde_json::from_value(json!({
            "day": "2025-03-14T00:00:00.000Z",
            "due": ""
        }))
        .unwrap();

        assert_eq!(dated.day, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(dated.due, None);
    }
}
