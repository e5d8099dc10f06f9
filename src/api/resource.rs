use clap::ValueEnum;

use crate::error::{Result, TrackerError};

/// Entities that share the create/list/get/update/delete contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resource {
    #[value(alias = "income")]
    Incomes,
    #[value(alias = "expense")]
    Expenses,
    #[value(alias = "category")]
    Categories,
    #[value(alias = "budget")]
    Budgets,
    #[value(aliases = ["bank-account", "accounts"])]
    BankAccounts,
    #[value(alias = "invoice")]
    Invoices,
    #[value(alias = "client")]
    Clients,
    #[value(alias = "vendor")]
    Vendors,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Incomes => "/incomes",
            Resource::Expenses => "/expenses",
            Resource::Categories => "/categories",
            Resource::Budgets => "/budgets",
            Resource::BankAccounts => "/bank-accounts",
            Resource::Invoices => "/invoices",
            Resource::Clients => "/clients",
            Resource::Vendors => "/vendors",
        }
    }

    /// Singular name for messages
    pub fn label(self) -> &'static str {
        match self {
            Resource::Incomes => "income",
            Resource::Expenses => "expense",
            Resource::Categories => "category",
            Resource::Budgets => "budget",
            Resource::BankAccounts => "bank account",
            Resource::Invoices => "invoice",
            Resource::Clients => "client",
            Resource::Vendors => "vendor",
        }
    }

    pub fn has_stats(self) -> bool {
        !matches!(
            self,
            Resource::BankAccounts | Resource::Clients | Resource::Vendors
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DashboardSection {
    Overview,
    CategoryBreakdown,
    RecentTransactions,
    CashFlow,
}

impl DashboardSection {
    pub fn path(self) -> &'static str {
        match self {
            DashboardSection::Overview => "/dashboard/overview",
            DashboardSection::CategoryBreakdown => "/dashboard/category-breakdown",
            DashboardSection::RecentTransactions => "/dashboard/recent-transactions",
            DashboardSection::CashFlow => "/dashboard/cash-flow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    ProfitLoss,
    CashFlow,
    #[value(alias = "tax")]
    TaxReport,
}

impl ReportKind {
    pub fn path(self) -> &'static str {
        match self {
            ReportKind::ProfitLoss => "/reports/profit-loss",
            ReportKind::CashFlow => "/reports/cash-flow",
            ReportKind::TaxReport => "/reports/tax-report",
        }
    }
}

/// Paging, search and free-form filters for a list request
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    /// Parse a `key=value` filter argument
    pub fn parse_filter(input: &str) -> Result<(String, String)> {
        match input.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(TrackerError::InvalidFilter(input.to_string())),
        }
    }

    pub(crate) fn to_pairs(&self, profile_id: &str) -> Vec<(String, String)> {
        let mut pairs = vec![("profileId".to_string(), profile_id.to_string())];
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.clone()));
        }
        pairs.extend(self.filters.iter().cloned());
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            ListQuery::parse_filter("status=paid").unwrap(),
            ("status".to_string(), "paid".to_string())
        );
        assert_eq!(
            ListQuery::parse_filter("search= a=b ").unwrap(),
            ("search".to_string(), "a=b".to_string())
        );
        assert!(ListQuery::parse_filter("status").is_err());
        assert!(ListQuery::parse_filter("=paid").is_err());
    }

    #[test]
    fn test_query_pairs() {
        let query = ListQuery {
            page: Some(2),
            limit: None,
            search: Some(String::new()),
            filters: vec![("isActive".to_string(), "true".to_string())],
        };

        assert_eq!(
            query.to_pairs("p1"),
            vec![
                ("profileId".to_string(), "p1".to_string()),
                ("page".to_string(), "2".to_string()),
                ("isActive".to_string(), "true".to_string()),
            ]
        );
    }
}
