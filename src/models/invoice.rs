use chrono::NaiveDate;
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{dates, ids, nullable_string, PaymentStatus};
use crate::invoice::LineItem;

/// Workflow state of an invoice, separate from its payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Viewed,
    Paid,
    Cancelled,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        })
    }
}

/// Body of `POST /invoices` and `PUT /invoices/{id}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    pub invoice_number: String,
    pub client_id: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: InvoiceStatus,
    pub payment_status: PaymentStatus,
    pub payment_terms: String,
    pub notes: String,
    pub invoice_items: Vec<LineItem>,
}

/// The client as embedded in invoice responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    #[serde(default, deserialize_with = "nullable_string")]
    pub company_name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An invoice as returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(deserialize_with = "ids::deserialize")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub invoice_number: String,
    #[serde(default, deserialize_with = "ids::deserialize_opt")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client: Option<ClientSummary>,
    #[serde(default, deserialize_with = "dates::deserialize_opt")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "dates::deserialize_opt")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub invoice_items: Vec<StoredItem>,
}

impl Invoice {
    pub fn client_name(&self) -> &str {
        self.client
            .as_ref()
            .map(|c| {
                if c.company_name.is_empty() {
                    c.contact_person.as_deref().unwrap_or("")
                } else {
                    c.company_name.as_str()
                }
            })
            .unwrap_or("")
    }

    pub fn outstanding(&self) -> Decimal {
        self.total_amount.unwrap_or_default() - self.paid_amount.unwrap_or_default()
    }
}

/// A line item as stored by the server; numbers may be missing or null
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredItem {
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_invoice_from_server_json() {
        let invoice: Invoice = serde_json::from_value(json!({
            "id": "c0ffee",
            "invoiceNumber": "INV-202503-0042",
            "clientId": 7,
            "client": { "companyName": "Acme", "contactPerson": null },
            "invoiceDate": "2025-03-01T00:00:00.000Z",
            "dueDate": null,
            "subtotal": "250.00",
            "taxRate": "10.00",
            "taxAmount": "25.00",
            "discountAmount": "5.00",
            "totalAmount": "270.00",
            "paidAmount": 100,
            "status": "sent",
            "paymentStatus": "partial",
            "invoiceItems": [
                { "description": "Design", "quantity": "2", "unitPrice": "100.00", "amount": "200.00" }
            ]
        }))
        .unwrap();

        assert_eq!(invoice.client_id.as_deref(), Some("7"));
        assert_eq!(invoice.client_name(), "Acme");
        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert_eq!(invoice.payment_status, PaymentStatus::Partial);
        assert_eq!(invoice.outstanding(), dec!(170));
        assert_eq!(invoice.invoice_items[0].unit_price, Some(dec!(100)));
    }

    #[test]
    fn test_payload_wire_format() {
        let payload = InvoicePayload {
            invoice_number: "INV-202503-0001".to_string(),
            client_id: "7".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            due_date: None,
            subtotal: dec!(250.00),
            tax_rate: dec!(10),
            tax_amount: dec!(25.00),
            discount_amount: dec!(5),
            total_amount: dec!(270.00),
            paid_amount: Decimal::ZERO,
            status: InvoiceStatus::Draft,
            payment_status: PaymentStatus::Pending,
            payment_terms: "Net 30".to_string(),
            notes: String::new(),
            invoice_items: vec![LineItem::new("Design", dec!(2), dec!(100))],
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["invoiceDate"], "2025-03-01");
        assert_eq!(value["subtotal"], "250.00");
        assert_eq!(value["totalAmount"], "270.00");
        assert_eq!(value["status"], "draft");
        assert_eq!(value["invoiceItems"][0]["unitPrice"], "100");
        assert_eq!(value["invoiceItems"][0]["amount"], "200.00");
    }
}
