use serde::{Deserialize, Serialize};

use crate::invoice::DEFAULT_PAYMENT_TERMS;

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    pub api: ApiSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub invoice: InvoiceSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiSettings {
    /// Backend root including the version prefix, e.g. `http://localhost:5000/api/v1`
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api/v1".to_string(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub currency_symbol: String,
    pub page_size: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            page_size: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct InvoiceSettings {
    pub payment_terms: String,
    /// Days after the invoice date; 0 leaves the due date empty
    pub due_days: u32,
    /// Default tax rate in percent
    pub tax_rate: String,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self {
            payment_terms: DEFAULT_PAYMENT_TERMS.to_string(),
            due_days: 30,
            tax_rate: "0".to_string(),
        }
    }
}
