//! Terminal rendering: money, entity tables and the invoice breakdown.

use rust_decimal::Decimal;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::api::Pagination;
use crate::invoice::{InvoiceTotals, LineItem};
use crate::models::{
    BankAccountInput, BudgetInput, CategoryInput, ClientInput, ExpenseInput, IncomeInput, Invoice,
    Record, VendorInput,
};

/// `$1,234.50`, `-$15.00`
pub fn format_money(value: Decimal, currency_symbol: &str) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    format!(
        "{}{}{}.{}",
        if negative { "-" } else { "" },
        currency_symbol,
        group_thousands(whole),
        frac
    )
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

/// The wire name of a serde enum, e.g. `credit_card`
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "no" };
    text.to_string()
}

fn or_dash(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// A row in an entity list table
pub trait Listing {
    const HEADERS: &'static [&'static str];

    fn cells(&self, currency_symbol: &str) -> Vec<String>;
}

impl Listing for Record<IncomeInput> {
    const HEADERS: &'static [&'static str] = &["ID", "DATE", "TITLE", "AMOUNT", "STATUS"];

    fn cells(&self, currency_symbol: &str) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.clone(),
            f.income_date.to_string(),
            f.title.clone(),
            format_money(f.amount, currency_symbol),
            f.payment_status.to_string(),
        ]
    }
}

impl Listing for Record<ExpenseInput> {
    const HEADERS: &'static [&'static str] =
        &["ID", "DATE", "TITLE", "AMOUNT", "STATUS", "NEEDS APPROVAL"];

    fn cells(&self, currency_symbol: &str) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.clone(),
            f.expense_date.to_string(),
            f.title.clone(),
            format_money(f.amount, currency_symbol),
            f.payment_status.to_string(),
            yes_no(f.approval_required),
        ]
    }
}

impl Listing for Record<CategoryInput> {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "TYPE", "BUDGET", "ACTIVE"];

    fn cells(&self, currency_symbol: &str) -> Vec<String> {
        let f = &self.fields;
        let name = match &f.icon {
            Some(icon) => format!("{icon} {}", f.name),
            None => f.name.clone(),
        };
        vec![
            self.id.clone(),
            name,
            f.kind.to_string(),
            or_dash(f.budget_amount.map(|a| format_money(a, currency_symbol))),
            yes_no(f.is_active),
        ]
    }
}

impl Listing for Record<BudgetInput> {
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "TYPE", "AMOUNT", "START", "END", "ALERT", "STATUS"];

    fn cells(&self, currency_symbol: &str) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.clone(),
            f.name.clone(),
            label(&f.budget_type),
            format_money(f.total_amount, currency_symbol),
            f.start_date.to_string(),
            or_dash(f.end_date),
            format!("{}%", f.alert_threshold),
            label(&f.status),
        ]
    }
}

impl Listing for Record<BankAccountInput> {
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "TYPE", "BANK", "BALANCE", "CURRENCY", "DEFAULT"];

    fn cells(&self, currency_symbol: &str) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.clone(),
            f.account_name.clone(),
            label(&f.account_type),
            or_dash(f.bank_name.as_ref()),
            format_money(
                f.current_balance.unwrap_or(f.initial_balance),
                currency_symbol,
            ),
            f.currency.clone(),
            yes_no(f.is_default),
        ]
    }
}

impl Listing for Record<ClientInput> {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "TYPE", "EMAIL", "PHONE", "ACTIVE"];

    fn cells(&self, _currency_symbol: &str) -> Vec<String> {
        let c = &self.fields.contact;
        vec![
            self.id.clone(),
            c.display_name().to_string(),
            label(&self.fields.client_type),
            or_dash(c.email.as_ref()),
            or_dash(c.phone.as_ref()),
            yes_no(c.is_active),
        ]
    }
}

impl Listing for Record<VendorInput> {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "TYPE", "EMAIL", "PHONE", "ACTIVE"];

    fn cells(&self, _currency_symbol: &str) -> Vec<String> {
        let c = &self.fields.contact;
        vec![
            self.id.clone(),
            c.display_name().to_string(),
            label(&self.fields.vendor_type),
            or_dash(c.email.as_ref()),
            or_dash(c.phone.as_ref()),
            yes_no(c.is_active),
        ]
    }
}

impl Listing for Invoice {
    const HEADERS: &'static [&'static str] = &[
        "ID", "NUMBER", "CLIENT", "DATE", "DUE", "TOTAL", "PAID", "STATUS", "PAYMENT",
    ];

    fn cells(&self, currency_symbol: &str) -> Vec<String> {
        vec![
            self.id.clone(),
            self.invoice_number.clone(),
            self.client_name().to_string(),
            or_dash(self.invoice_date),
            or_dash(self.due_date),
            format_money(self.total_amount.unwrap_or_default(), currency_symbol),
            format_money(self.paid_amount.unwrap_or_default(), currency_symbol),
            self.status.to_string(),
            self.payment_status.to_string(),
        ]
    }
}

pub fn render_listing<L: Listing>(rows: &[L], currency_symbol: &str) -> String {
    let mut builder = Builder::default();
    builder.push_record(L::HEADERS.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row.cells(currency_symbol));
    }
    builder.build().with(Style::rounded()).to_string()
}

/// "Page 2 of 5 (48 items)" plus navigation hints
pub fn pagination_footer(pagination: &Pagination) -> String {
    let mut footer = format!(
        "Page {} of {} ({} items)",
        pagination.current_page,
        pagination.total_pages.max(1),
        pagination.total_items
    );
    if pagination.has_prev_page {
        footer.push_str(&format!(
            "  previous: --page {}",
            pagination.current_page.saturating_sub(1)
        ));
    }
    if pagination.has_next_page {
        footer.push_str(&format!("  next: --page {}", pagination.current_page + 1));
    }
    footer
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "QTY")]
    quantity: String,
    #[tabled(rename = "UNIT PRICE")]
    unit_price: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

/// Line items followed by the subtotal/tax/discount/total block
pub fn render_invoice_breakdown(
    items: &[LineItem],
    totals: &InvoiceTotals,
    currency_symbol: &str,
) -> String {
    let rows: Vec<LineRow> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| LineRow {
            index: idx + 1,
            description: if item.has_description() {
                item.description.clone()
            } else {
                "(blank)".to_string()
            },
            quantity: item.quantity.normalize().to_string(),
            unit_price: format_money(item.unit_price, currency_symbol),
            amount: format_money(item.amount, currency_symbol),
        })
        .collect();

    let mut items_table = Table::new(rows);
    items_table
        .with(Style::rounded())
        .modify(Columns::new(2..), Alignment::right());

    let mut summary = Builder::default();
    summary.push_record(["Subtotal".to_string(), format_money(totals.subtotal, currency_symbol)]);
    summary.push_record([
        format!("Tax ({}%)", totals.tax_rate.normalize()),
        format_money(totals.tax_amount, currency_symbol),
    ]);
    summary.push_record([
        "Discount".to_string(),
        format_money(-totals.discount_amount, currency_symbol),
    ]);
    summary.push_record(["Total".to_string(), format_money(totals.total_amount, currency_symbol)]);

    let mut summary_table = summary.build();
    summary_table
        .with(Style::rounded())
        .modify(Columns::last(), Alignment::right());

    format!("{items_table}\n{summary_table}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::recalculate_totals;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(0), "$"), "$0.00");
        assert_eq!(format_money(dec!(1234.5), "$"), "$1,234.50");
        assert_eq!(format_money(dec!(1234567.891), "€"), "€1,234,567.89");
        assert_eq!(format_money(dec!(-15), "$"), "-$15.00");
        assert_eq!(format_money(dec!(-0.001), "$"), "$0.00");
    }

    #[test]
    fn test_pagination_footer() {
        let footer = pagination_footer(&Pagination {
            current_page: 2,
            total_pages: 5,
            total_items: 48,
            has_next_page: true,
            has_prev_page: true,
        });

        assert_eq!(
            footer,
            "Page 2 of 5 (48 items)  previous: --page 1  next: --page 3"
        );
    }

    #[test]
    fn test_breakdown_contains_totals() {
        let items = vec![
            LineItem::new("Design", dec!(2), dec!(100)),
            LineItem::new("Hosting", dec!(1), dec!(50)),
        ];
        let totals = recalculate_totals(&items, "10", "5");
        let out = render_invoice_breakdown(&items, &totals, "$");

        assert!(out.contains("Design"));
        assert!(out.contains("$250.00"));
        assert!(out.contains("Tax (10%)"));
        assert!(out.contains("-$5.00"));
        assert!(out.contains("$270.00"));
    }

    #[test]
    fn test_listing_uses_wire_labels() {
        let record: Record<BankAccountInput> = serde_json::from_value(serde_json::json!({
            "id": 3,
            "accountName": "Card",
            "accountType": "credit_card",
            "initialBalance": "100",
            "currency": "USD"
        }))
        .unwrap();

        let cells = record.cells("$");
        assert_eq!(cells[2], "credit_card");
        assert_eq!(cells[4], "$100.00");
    }
}
