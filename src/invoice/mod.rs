mod calculator;
mod form;
mod number;

pub use calculator::{
    add_item, coerce_decimal, coerce_non_negative, line_amount, recalculate_totals, remove_item,
    round2, update_item, InvoiceTotals, ItemField, LineItem, MAX_INPUT,
};
pub use form::{InvoiceForm, DEFAULT_PAYMENT_TERMS};
pub use number::{generate_invoice_number, invoice_number_for};
