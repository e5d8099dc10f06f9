use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use super::calculator::{
    add_item, recalculate_totals, remove_item, round2, update_item, InvoiceTotals, ItemField,
    LineItem,
};
use crate::error::{Result, TrackerError};
use crate::models::{Invoice, InvoicePayload, InvoiceStatus, PaymentStatus};

pub const DEFAULT_PAYMENT_TERMS: &str = "Net 30";

/// In-memory state of an invoice being created or edited.
///
/// Totals are recomputed after every item, tax-rate or discount change
/// and are sent as-is on submission.
#[derive(Debug, Clone)]
pub struct InvoiceForm {
    pub invoice_number: String,
    pub client_id: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub paid_amount: Decimal,
    pub status: InvoiceStatus,
    pub payment_status: PaymentStatus,
    pub payment_terms: String,
    pub notes: String,
    tax_rate: String,
    discount: String,
    items: Vec<LineItem>,
    totals: InvoiceTotals,
    saving: bool,
}

impl InvoiceForm {
    /// A blank invoice with a single empty line item
    pub fn new(invoice_number: impl Into<String>, invoice_date: NaiveDate) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            client_id: String::new(),
            invoice_date,
            due_date: None,
            paid_amount: Decimal::ZERO,
            status: InvoiceStatus::Draft,
            payment_status: PaymentStatus::Pending,
            payment_terms: DEFAULT_PAYMENT_TERMS.to_string(),
            notes: String::new(),
            tax_rate: "0".to_string(),
            discount: "0".to_string(),
            items: vec![LineItem::default()],
            totals: InvoiceTotals::default(),
            saving: false,
        }
    }

    /// Load a persisted invoice for editing.
    ///
    /// Stored totals are kept until the first edit triggers a recompute.
    pub fn from_invoice(invoice: &Invoice, today: NaiveDate) -> Self {
        let mut form = Self::new(invoice.invoice_number.clone(), invoice.invoice_date.unwrap_or(today));
        form.client_id = invoice.client_id.clone().unwrap_or_default();
        form.due_date = invoice.due_date;
        form.paid_amount = invoice.paid_amount.unwrap_or_default();
        form.status = invoice.status;
        form.payment_status = invoice.payment_status;
        if let Some(terms) = &invoice.payment_terms {
            form.payment_terms = terms.clone();
        }
        form.notes = invoice.notes.clone().unwrap_or_default();
        form.tax_rate = invoice.tax_rate.unwrap_or_default().to_string();
        form.discount = invoice.discount_amount.unwrap_or_default().to_string();

        if !invoice.invoice_items.is_empty() {
            form.items = invoice
                .invoice_items
                .iter()
                .map(|stored| {
                    let quantity = stored.quantity.unwrap_or(Decimal::ONE);
                    let unit_price = stored.unit_price.unwrap_or_default();
                    let mut item = LineItem::new(stored.description.clone(), quantity, unit_price);
                    if let Some(amount) = stored.amount {
                        item.amount = round2(amount);
                    }
                    item
                })
                .collect();
        }

        form.totals = InvoiceTotals {
            subtotal: invoice.subtotal.unwrap_or_default(),
            tax_rate: invoice.tax_rate.unwrap_or_default(),
            tax_amount: invoice.tax_amount.unwrap_or_default(),
            discount_amount: invoice.discount_amount.unwrap_or_default(),
            total_amount: invoice.total_amount.unwrap_or_default(),
        };
        form
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn update_item(&mut self, index: usize, field: ItemField, value: &str) -> Result<()> {
        self.items = update_item(&self.items, index, field, value)?;
        self.recalculate();
        Ok(())
    }

    /// Append a blank item and return its index
    pub fn add_item(&mut self) -> usize {
        self.items = add_item(&self.items);
        self.recalculate();
        self.items.len() - 1
    }

    pub fn remove_item(&mut self, index: usize) -> Result<()> {
        self.items = remove_item(&self.items, index)?;
        self.recalculate();
        Ok(())
    }

    /// Add a fully specified item, reusing the initial blank row if it is
    /// still untouched.
    pub fn push_item(&mut self, description: &str, quantity: &str, unit_price: &str) -> Result<usize> {
        let index = match self.items.as_slice() {
            [only] if *only == LineItem::default() => 0,
            _ => self.add_item(),
        };
        self.update_item(index, ItemField::Description, description)?;
        self.update_item(index, ItemField::Quantity, quantity)?;
        self.update_item(index, ItemField::UnitPrice, unit_price)?;
        Ok(index)
    }

    pub fn set_tax_rate(&mut self, value: &str) {
        self.tax_rate = value.to_string();
        self.recalculate();
    }

    pub fn set_discount(&mut self, value: &str) {
        self.discount = value.to_string();
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.totals = recalculate_totals(&self.items, &self.tax_rate, &self.discount);
        debug!(
            subtotal = %self.totals.subtotal,
            tax = %self.totals.tax_amount,
            total = %self.totals.total_amount,
            "recalculated invoice totals"
        );
    }

    /// Validate and build the request body, marking the form as saving.
    ///
    /// Items without a description are dropped from the payload. Call
    /// [`InvoiceForm::finish_submit`] once the request settles.
    pub fn begin_submit(&mut self) -> Result<InvoicePayload> {
        if self.saving {
            return Err(TrackerError::SubmitInFlight);
        }
        if !self.items.iter().any(LineItem::has_description) {
            return Err(TrackerError::NoDescribedItems);
        }

        let payload = self.payload();
        self.saving = true;
        Ok(payload)
    }

    pub fn finish_submit(&mut self) {
        self.saving = false;
    }

    /// The request body for the current state, without validation
    pub fn payload(&self) -> InvoicePayload {
        InvoicePayload {
            invoice_number: self.invoice_number.clone(),
            client_id: self.client_id.clone(),
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            subtotal: self.totals.subtotal,
            tax_rate: self.totals.tax_rate,
            tax_amount: self.totals.tax_amount,
            discount_amount: self.totals.discount_amount,
            total_amount: self.totals.total_amount,
            paid_amount: self.paid_amount,
            status: self.status,
            payment_status: self.payment_status,
            payment_terms: self.payment_terms.clone(),
            notes: self.notes.clone(),
            invoice_items: self
                .items
                .iter()
                .filter(|item| item.has_description())
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredItem;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_new_form_has_one_blank_item() {
        let form = InvoiceForm::new("INV-202503-0001", day());

        assert_eq!(form.items().len(), 1);
        assert_eq!(form.items()[0], LineItem::default());
        assert_eq!(form.totals().total_amount.to_string(), "0.00");
        assert_eq!(form.payment_terms, "Net 30");
    }

    #[test]
    fn test_totals_follow_every_edit() {
        let mut form = InvoiceForm::new("INV-202503-0001", day());
        form.push_item("Design", "2", "100").unwrap();
        form.push_item("Hosting", "1", "50").unwrap();
        assert_eq!(form.items().len(), 2);
        assert_eq!(form.totals().subtotal, dec!(250.00));

        form.set_tax_rate("10");
        assert_eq!(form.totals().total_amount, dec!(275.00));

        form.set_discount("5");
        assert_eq!(form.totals().total_amount, dec!(270.00));

        form.update_item(1, ItemField::Quantity, "3").unwrap();
        assert_eq!(form.totals().subtotal, dec!(350.00));
        assert_eq!(form.totals().tax_amount, dec!(35.00));
        assert_eq!(form.totals().total_amount, dec!(380.00));

        form.remove_item(0).unwrap();
        assert_eq!(form.totals().subtotal, dec!(150.00));
    }

    #[test]
    fn test_remove_sole_item_refused() {
        let mut form = InvoiceForm::new("INV-202503-0001", day());
        form.push_item("Design", "1", "10").unwrap();

        let err = form.remove_item(0).unwrap_err();
        assert!(matches!(err, TrackerError::LastItemRequired));
        assert_eq!(form.items().len(), 1);
        assert_eq!(form.totals().subtotal, dec!(10.00));
    }

    #[test]
    fn test_submit_requires_a_described_item() {
        let mut form = InvoiceForm::new("INV-202503-0001", day());
        form.update_item(0, ItemField::UnitPrice, "40").unwrap();

        let err = form.begin_submit().unwrap_err();
        assert!(matches!(err, TrackerError::NoDescribedItems));
        assert!(!form.is_saving());
    }

    #[test]
    fn test_submit_filters_blank_items_and_blocks_resubmit() {
        let mut form = InvoiceForm::new("INV-202503-0001", day());
        form.client_id = "7".to_string();
        form.push_item("Design", "2", "100").unwrap();
        form.add_item();

        let payload = form.begin_submit().unwrap();
        assert_eq!(payload.invoice_items.len(), 1);
        assert_eq!(payload.subtotal, dec!(200.00));
        assert!(form.is_saving());

        assert!(matches!(
            form.begin_submit().unwrap_err(),
            TrackerError::SubmitInFlight
        ));

        form.finish_submit();
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn test_from_invoice_keeps_stored_values() {
        let invoice = Invoice {
            id: "1".to_string(),
            invoice_number: "INV-202501-0099".to_string(),
            client_id: Some("3".to_string()),
            client: None,
            invoice_date: Some(day()),
            due_date: None,
            subtotal: Some(dec!(90)),
            tax_rate: Some(dec!(10)),
            tax_amount: Some(dec!(9)),
            discount_amount: Some(dec!(0)),
            total_amount: Some(dec!(99)),
            paid_amount: Some(dec!(120)),
            status: InvoiceStatus::Sent,
            payment_status: PaymentStatus::Paid,
            payment_terms: None,
            notes: None,
            invoice_items: vec![StoredItem {
                description: "Audit".to_string(),
                quantity: Some(dec!(3)),
                unit_price: Some(dec!(30)),
                amount: Some(dec!(90)),
            }],
        };

        let mut form = InvoiceForm::from_invoice(&invoice, day());
        assert_eq!(form.client_id, "3");
        assert_eq!(form.totals().total_amount, dec!(99));
        assert_eq!(form.paid_amount, dec!(120));
        assert_eq!(form.payment_terms, DEFAULT_PAYMENT_TERMS);

        form.set_discount("100");
        assert_eq!(form.totals().total_amount, dec!(-1.00));
    }

    #[test]
    fn test_stored_amounts_are_rounded_on_load() {
        let stored = StoredItem {
            description: "Thirds".to_string(),
            quantity: Some(dec!(1)),
            unit_price: Some(dec!(0.333)),
            amount: Some(dec!(0.333)),
        };
        let invoice = Invoice {
            id: "2".to_string(),
            invoice_number: "INV-202501-0100".to_string(),
            client_id: None,
            client: None,
            invoice_date: Some(day()),
            due_date: None,
            subtotal: None,
            tax_rate: None,
            tax_amount: None,
            discount_amount: None,
            total_amount: None,
            paid_amount: None,
            status: InvoiceStatus::Draft,
            payment_status: PaymentStatus::Pending,
            payment_terms: None,
            notes: None,
            invoice_items: vec![stored.clone(), stored.clone(), stored],
        };

        let mut form = InvoiceForm::from_invoice(&invoice, day());
        assert!(form.items().iter().all(|i| i.amount == dec!(0.33)));

        form.set_tax_rate("0");
        let sum: Decimal = form.items().iter().map(|i| i.amount).sum();
        assert_eq!(form.totals().subtotal, sum);
        assert_eq!(form.totals().subtotal, dec!(0.99));
    }
}
