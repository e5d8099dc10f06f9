pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod invoice;
pub mod models;

pub use api::{ApiClient, ListQuery, Page, Resource};
pub use config::{Config, Session};
pub use error::{Result, TrackerError};
pub use invoice::{generate_invoice_number, recalculate_totals, InvoiceForm, InvoiceTotals, LineItem};
