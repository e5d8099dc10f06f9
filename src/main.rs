use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fintrack::api::{DashboardSection, ReportKind};
use fintrack::config::{config_dir, init_config_dir, load_config};
use fintrack::display::{
    format_money, pagination_footer, render_invoice_breakdown, render_listing, Listing,
};
use fintrack::invoice::{coerce_non_negative, generate_invoice_number, InvoiceForm};
use fintrack::models::{
    BankAccountInput, BudgetInput, CategoryInput, ClientInput, ExpenseInput, IncomeInput, Invoice,
    InvoiceStatus, LoginRequest, PaymentStatus, Record, RegisterRequest, VendorInput,
};
use fintrack::{ApiClient, Config, ListQuery, Page, Resource, Result, Session, TrackerError};

#[derive(Parser)]
#[command(name = "fintrack")]
#[command(version, about = "Command-line client for a personal and business finance tracker", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.fintrack or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Backend URL including the version prefix (overrides config.toml)
    #[arg(long, global = true, env = "FINTRACK_API_URL")]
    api_url: Option<String>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prefer the environment variable over the flag)
        #[arg(short, long, env = "FINTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "FINTRACK_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Sign out and remove the stored session
    Logout,

    /// Show the signed-in user and active profile
    Whoami,

    /// List the profiles available to the signed-in user
    Profiles,

    /// Make another profile the active one
    SwitchProfile {
        /// Profile id from 'profiles'
        profile_id: String,
    },

    /// List records of one kind
    List {
        #[arg(value_enum)]
        resource: Resource,

        /// Page number (1-based)
        #[arg(long)]
        page: Option<u32>,

        /// Records per page (default: display.page_size)
        #[arg(short, long)]
        limit: Option<u32>,

        #[arg(short, long)]
        search: Option<String>,

        /// Extra query filter in format "key=value" (can be repeated)
        #[arg(short, long, value_name = "KEY=VALUE")]
        filter: Vec<String>,
    },

    /// Show a single record
    Show {
        #[arg(value_enum)]
        resource: Resource,
        id: String,
    },

    /// Show summary statistics for a record kind
    Stats {
        #[arg(value_enum)]
        resource: Resource,
    },

    /// Create a record from JSON
    Create {
        #[arg(value_enum)]
        resource: Resource,

        /// JSON object, or @path to read it from a file
        #[arg(short, long, value_name = "JSON|@FILE")]
        data: String,
    },

    /// Replace a record with JSON
    Update {
        #[arg(value_enum)]
        resource: Resource,
        id: String,

        /// JSON object, or @path to read it from a file
        #[arg(short, long, value_name = "JSON|@FILE")]
        data: String,
    },

    /// Delete a record
    Delete {
        #[arg(value_enum)]
        resource: Resource,
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Quote, create and edit invoices
    #[command(subcommand)]
    Invoice(InvoiceCommand),

    /// Approve or reject expenses
    #[command(subcommand)]
    Expense(ExpenseCommand),

    /// Budget reports
    #[command(subcommand)]
    Budget(BudgetCommand),

    /// Bank account reports
    #[command(subcommand)]
    Account(AccountCommand),

    /// Category hierarchy
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Show a dashboard section
    Dashboard {
        #[arg(value_enum, default_value_t = DashboardSection::Overview)]
        section: DashboardSection,

        /// e.g. this_week, this_month, this_year
        #[arg(long, default_value = "this_month")]
        period: String,
    },

    /// Run a financial report
    Report {
        #[arg(value_enum)]
        kind: ReportKind,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
enum InvoiceCommand {
    /// Compute line amounts and totals without contacting the server
    Quote {
        /// Line item in format "description:quantity:unit_price" (can be repeated)
        #[arg(short, long, value_name = "DESC:QTY:PRICE")]
        item: Vec<String>,

        /// Tax rate in percent
        #[arg(short, long, allow_hyphen_values = true)]
        tax_rate: Option<String>,

        /// Flat discount amount
        #[arg(short, long, allow_hyphen_values = true)]
        discount: Option<String>,
    },

    /// Create an invoice
    New {
        /// Client id
        #[arg(short, long)]
        client: String,

        /// Line item in format "description:quantity:unit_price" (can be repeated)
        #[arg(short, long, value_name = "DESC:QTY:PRICE")]
        item: Vec<String>,

        /// Tax rate in percent (default: invoice.tax_rate)
        #[arg(short, long, allow_hyphen_values = true)]
        tax_rate: Option<String>,

        /// Flat discount amount
        #[arg(short, long, allow_hyphen_values = true)]
        discount: Option<String>,

        /// Invoice number (default: INV-YYYYMM-NNNN)
        #[arg(long)]
        number: Option<String>,

        /// Invoice date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Due date (YYYY-MM-DD, default: date + invoice.due_days)
        #[arg(long)]
        due_date: Option<String>,

        /// Payment terms (default: invoice.payment_terms)
        #[arg(long)]
        terms: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long, value_enum)]
        status: Option<InvoiceStatus>,

        #[arg(long, value_enum)]
        payment_status: Option<PaymentStatus>,

        /// Amount already paid
        #[arg(long)]
        paid: Option<String>,

        /// Print the request body instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Change an existing invoice
    Edit {
        /// Invoice id
        id: String,

        /// Line item to append, "description:quantity:unit_price" (can be repeated)
        #[arg(short, long, value_name = "DESC:QTY:PRICE")]
        add_item: Vec<String>,

        /// 1-based position of a stored line item to remove (can be repeated).
        /// Applied after --add-item, so an item can be replaced in one edit
        #[arg(short, long, value_name = "N")]
        remove_item: Vec<usize>,

        #[arg(short, long, allow_hyphen_values = true)]
        tax_rate: Option<String>,

        #[arg(short, long, allow_hyphen_values = true)]
        discount: Option<String>,

        #[arg(long, value_enum)]
        status: Option<InvoiceStatus>,

        #[arg(long, value_enum)]
        payment_status: Option<PaymentStatus>,

        #[arg(long)]
        paid: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Print the request body instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum ExpenseCommand {
    /// Approve an expense awaiting approval
    Approve { id: String },

    /// Reject an expense awaiting approval
    Reject {
        id: String,

        #[arg(short, long)]
        reason: String,
    },
}

#[derive(Subcommand)]
enum BudgetCommand {
    /// Spending against the budget's allocations
    Performance { id: String },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Current balance of a bank account
    Balance { id: String },
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// Categories with their subcategories
    Tree {
        /// Only categories of this type (income, expense)
        #[arg(long = "type")]
        kind: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr; FINTRACK_LOG takes precedence over -v
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "warn,fintrack=info",
        _ => "warn,fintrack=debug",
    };
    let filter = EnvFilter::try_from_env("FINTRACK_LOG").unwrap_or_else(|_| fallback.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

/// Resolved locations shared by every command
struct Context {
    cfg_dir: PathBuf,
    api_url: Option<String>,
}

impl Context {
    fn config(&self) -> Result<Config> {
        if !self.cfg_dir.exists() {
            return Err(TrackerError::ConfigNotFound(self.cfg_dir.clone()));
        }
        let mut config = load_config(&self.cfg_dir)?;
        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        Ok(config)
    }

    fn client(&self, config: &Config) -> Result<ApiClient> {
        let session = Session::hydrate(&self.cfg_dir)?;
        Ok(ApiClient::from_settings(&config.api, session))
    }
}

/// The active profile's currency symbol, else the configured one
fn currency_symbol(api: &ApiClient, config: &Config) -> String {
    api.session()
        .profile()
        .and_then(|p| p.currency_symbol.clone())
        .unwrap_or_else(|| config.display.currency_symbol.clone())
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let ctx = Context {
        cfg_dir,
        api_url: cli.api_url,
    };

    match cli.command {
        Commands::Init => cmd_init(&ctx.cfg_dir),
        Commands::Login { email, password } => cmd_login(&ctx, email, password),
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => cmd_register(
            &ctx,
            RegisterRequest {
                email,
                password,
                first_name,
                last_name,
                phone,
            },
        ),
        Commands::Logout => cmd_logout(&ctx),
        Commands::Whoami => cmd_whoami(&ctx),
        Commands::Profiles => cmd_profiles(&ctx),
        Commands::SwitchProfile { profile_id } => cmd_switch_profile(&ctx, &profile_id),
        Commands::List {
            resource,
            page,
            limit,
            search,
            filter,
        } => cmd_list(&ctx, resource, page, limit, search, &filter),
        Commands::Show { resource, id } => cmd_show(&ctx, resource, &id),
        Commands::Stats { resource } => cmd_stats(&ctx, resource),
        Commands::Create { resource, data } => cmd_save(&ctx, resource, None, &data),
        Commands::Update { resource, id, data } => cmd_save(&ctx, resource, Some(&id), &data),
        Commands::Delete { resource, id, yes } => cmd_delete(&ctx, resource, &id, yes),
        Commands::Invoice(command) => match command {
            InvoiceCommand::Quote {
                item,
                tax_rate,
                discount,
            } => cmd_invoice_quote(&ctx, &item, tax_rate.as_deref(), discount.as_deref()),
            InvoiceCommand::New {
                client,
                item,
                tax_rate,
                discount,
                number,
                date,
                due_date,
                terms,
                notes,
                status,
                payment_status,
                paid,
                dry_run,
            } => cmd_invoice_new(
                &ctx,
                NewInvoice {
                    client,
                    items: item,
                    tax_rate,
                    discount,
                    number,
                    date,
                    due_date,
                    terms,
                    notes,
                    status,
                    payment_status,
                    paid,
                },
                dry_run,
            ),
            InvoiceCommand::Edit {
                id,
                add_item,
                remove_item,
                tax_rate,
                discount,
                status,
                payment_status,
                paid,
                due_date,
                notes,
                dry_run,
            } => cmd_invoice_edit(
                &ctx,
                &id,
                InvoiceChanges {
                    add_items: add_item,
                    remove_items: remove_item,
                    tax_rate,
                    discount,
                    status,
                    payment_status,
                    paid,
                    due_date,
                    notes,
                },
                dry_run,
            ),
        },
        Commands::Expense(ExpenseCommand::Approve { id }) => {
            cmd_action(&ctx, |api| api.approve_expense(&id))
        }
        Commands::Expense(ExpenseCommand::Reject { id, reason }) => {
            cmd_action(&ctx, |api| api.reject_expense(&id, &reason))
        }
        Commands::Budget(BudgetCommand::Performance { id }) => {
            cmd_action(&ctx, |api| api.budget_performance(&id))
        }
        Commands::Account(AccountCommand::Balance { id }) => {
            cmd_action(&ctx, |api| api.account_balance(&id))
        }
        Commands::Category(CategoryCommand::Tree { kind }) => {
            cmd_action(&ctx, |api| api.category_tree(kind.as_deref()))
        }
        Commands::Dashboard { section, period } => {
            cmd_action(&ctx, |api| api.dashboard(section, &period))
        }
        Commands::Report { kind, from, to } => {
            if let Some(from) = &from {
                parse_date(from)?;
            }
            if let Some(to) = &to {
                parse_date(to)?;
            }
            cmd_action(&ctx, |api| api.report(kind, from.as_deref(), to.as_deref()))
        }
    }
}

/// Initialize config directory with a template config.toml
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    init_config_dir(cfg_dir)?;

    println!("Initialized fintrack config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your backend:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Sign in:                   fintrack login --email <email>");
    println!();
    println!("Then try a quote:");
    println!("  fintrack invoice quote --item \"Design:2:100\" --tax-rate 10");

    Ok(())
}

fn cmd_login(ctx: &Context, email: String, password: String) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    let user = api.login(&LoginRequest { email, password })?;
    println!("Logged in as {} <{}>", user.display_name(), user.email);
    print_active_profile(api.session());
    Ok(())
}

fn cmd_register(ctx: &Context, request: RegisterRequest) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    let user = api.register(&request)?;
    println!("Registered and logged in as {} <{}>", user.display_name(), user.email);
    print_active_profile(api.session());
    Ok(())
}

fn print_active_profile(session: &Session) {
    match session.profile() {
        Some(profile) => println!("Active profile: {} ({})", profile.profile_name, profile.id),
        None => println!("No active profile. Run 'fintrack profiles' to pick one."),
    }
}

fn cmd_logout(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    if !api.session().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    api.logout()?;
    println!("Logged out.");
    Ok(())
}

fn cmd_whoami(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    let user = api.current_user()?;
    println!("{} <{}>", user.display_name(), user.email);
    println!("Server: {}", config.api.base_url);
    print_active_profile(api.session());
    Ok(())
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    active: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CURRENCY")]
    currency: String,
}

fn cmd_profiles(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    let profiles = api.profiles()?;
    if profiles.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    let active_id = api.session().profile().map(|p| p.id.clone());
    let rows: Vec<ProfileRow> = profiles
        .into_iter()
        .map(|p| ProfileRow {
            active: if active_id.as_deref() == Some(p.id.as_str()) {
                "*".to_string()
            } else {
                String::new()
            },
            currency: p.currency.unwrap_or_default(),
            id: p.id,
            name: p.profile_name,
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn cmd_switch_profile(ctx: &Context, profile_id: &str) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    let profile = api.switch_profile(profile_id)?;
    println!("Switched to profile: {} ({})", profile.profile_name, profile.id);
    Ok(())
}

fn cmd_list(
    ctx: &Context,
    resource: Resource,
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
    filters: &[String],
) -> Result<()> {
    let config = ctx.config()?;
    let query = ListQuery {
        page,
        limit: Some(limit.unwrap_or(config.display.page_size)),
        search,
        filters: filters
            .iter()
            .map(|f| ListQuery::parse_filter(f))
            .collect::<Result<_>>()?,
    };
    let mut api = ctx.client(&config)?;
    let currency = currency_symbol(&api, &config);

    match resource {
        Resource::Incomes => print_page::<Record<IncomeInput>>(&mut api, resource, &query, &currency),
        Resource::Expenses => print_page::<Record<ExpenseInput>>(&mut api, resource, &query, &currency),
        Resource::Categories => print_page::<Record<CategoryInput>>(&mut api, resource, &query, &currency),
        Resource::Budgets => print_page::<Record<BudgetInput>>(&mut api, resource, &query, &currency),
        Resource::BankAccounts => {
            print_page::<Record<BankAccountInput>>(&mut api, resource, &query, &currency)
        }
        Resource::Invoices => print_page::<Invoice>(&mut api, resource, &query, &currency),
        Resource::Clients => print_page::<Record<ClientInput>>(&mut api, resource, &query, &currency),
        Resource::Vendors => print_page::<Record<VendorInput>>(&mut api, resource, &query, &currency),
    }
}

fn print_page<L: Listing + DeserializeOwned>(
    api: &mut ApiClient,
    resource: Resource,
    query: &ListQuery,
    currency: &str,
) -> Result<()> {
    let page: Page<L> = api.list(resource, query)?;
    if page.items.is_empty() {
        println!("No {} records found.", resource.label());
        return Ok(());
    }

    println!("{}", render_listing(&page.items, currency));
    println!("{}", pagination_footer(&page.pagination));
    Ok(())
}

fn cmd_show(ctx: &Context, resource: Resource, id: &str) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    if resource != Resource::Invoices {
        let record: Value = api.get(resource, id)?;
        return print_json(&record);
    }

    let invoice: Invoice = api.get(resource, id)?;
    let currency = currency_symbol(&api, &config);
    let form = InvoiceForm::from_invoice(&invoice, Local::now().date_naive());

    println!("Invoice:  {}", invoice.invoice_number);
    println!("Client:   {}", or_id(invoice.client_name(), invoice.client_id.as_deref()));
    println!("Date:     {}", form.invoice_date);
    if let Some(due) = form.due_date {
        println!("Due:      {due}");
    }
    println!("Terms:    {}", form.payment_terms);
    println!("Status:   {} / {}", invoice.status, invoice.payment_status);
    println!();
    println!("{}", render_invoice_breakdown(form.items(), form.totals(), &currency));
    println!("Paid:        {}", format_money(form.paid_amount, &currency));
    println!("Outstanding: {}", format_money(invoice.outstanding(), &currency));
    if !form.notes.is_empty() {
        println!();
        println!("{}", form.notes);
    }
    Ok(())
}

fn or_id<'a>(name: &'a str, id: Option<&'a str>) -> &'a str {
    if name.is_empty() {
        id.unwrap_or("-")
    } else {
        name
    }
}

fn cmd_stats(ctx: &Context, resource: Resource) -> Result<()> {
    cmd_action(ctx, |api| api.stats(resource))
}

/// Run a request whose answer has no fixed shape and print it as JSON
fn cmd_action<F>(ctx: &Context, request: F) -> Result<()>
where
    F: FnOnce(&mut ApiClient) -> Result<Value>,
{
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;
    let value = request(&mut api)?;
    print_json(&value)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(TrackerError::Decode)?;
    println!("{text}");
    Ok(())
}

/// `--data` is either inline JSON or `@path`
fn read_data(data: &str) -> Result<String> {
    match data.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(data.to_string()),
    }
}

fn cmd_save(ctx: &Context, resource: Resource, id: Option<&str>, data: &str) -> Result<()> {
    let raw = read_data(data)?;
    let config = ctx.config()?;

    match resource {
        Resource::Incomes => save_typed::<IncomeInput>(ctx, &config, resource, id, &raw),
        Resource::Expenses => save_typed::<ExpenseInput>(ctx, &config, resource, id, &raw),
        Resource::Categories => save_typed::<CategoryInput>(ctx, &config, resource, id, &raw),
        Resource::Budgets => save_typed::<BudgetInput>(ctx, &config, resource, id, &raw),
        Resource::BankAccounts => save_typed::<BankAccountInput>(ctx, &config, resource, id, &raw),
        Resource::Clients => save_typed::<ClientInput>(ctx, &config, resource, id, &raw),
        Resource::Vendors => save_typed::<VendorInput>(ctx, &config, resource, id, &raw),
        Resource::Invoices => {
            eprintln!("Use 'fintrack invoice new' or 'fintrack invoice edit' for invoices.");
            Err(TrackerError::Unsupported(resource.label().to_string()))
        }
    }
}

/// Validate the JSON against the entity's schema before anything is sent
fn save_typed<B: Serialize + DeserializeOwned>(
    ctx: &Context,
    config: &Config,
    resource: Resource,
    id: Option<&str>,
    raw: &str,
) -> Result<()> {
    let body: B = serde_json::from_str(raw).map_err(|e| TrackerError::InvalidPayload {
        entity: resource.label().to_string(),
        source: e,
    })?;

    let mut api = ctx.client(config)?;
    let saved: Value = match id {
        Some(id) => api.update(resource, id, &body)?,
        None => api.create(resource, &body)?,
    };

    let saved_id = match &saved["id"] {
        Value::String(s) => s.clone(),
        Value::Null => id.unwrap_or("?").to_string(),
        other => other.to_string(),
    };
    let verb = if id.is_some() { "Updated" } else { "Created" };
    println!("{verb} {} {saved_id}", resource.label());
    Ok(())
}

fn cmd_delete(ctx: &Context, resource: Resource, id: &str, yes: bool) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    if !yes && !confirm(&format!("Delete {} {id}?", resource.label()))? {
        println!("Cancelled.");
        return Ok(());
    }

    api.delete(resource, id)?;
    println!("Deleted {} {id}", resource.label());
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| TrackerError::InvalidDate(input.to_string()))
}

/// Split "description:quantity:unit_price"; quantity defaults to 1 and
/// price to 0, and the description may itself contain colons.
fn parse_item_arg(arg: &str) -> (String, String, String) {
    let parts: Vec<&str> = arg.rsplitn(3, ':').collect();
    match parts.as_slice() {
        [price, qty, desc] => (desc.to_string(), qty.to_string(), price.to_string()),
        [qty, desc] => (desc.to_string(), qty.to_string(), "0".to_string()),
        _ => (arg.to_string(), "1".to_string(), "0".to_string()),
    }
}

fn add_item_args(form: &mut InvoiceForm, args: &[String]) -> Result<()> {
    for arg in args {
        let (description, quantity, unit_price) = parse_item_arg(arg);
        form.push_item(description.trim(), &quantity, &unit_price)?;
    }
    Ok(())
}

/// Append `add`, then drop the 1-based `remove` positions of the items
/// that were there before the edit
fn apply_item_changes(form: &mut InvoiceForm, add: &[String], remove: &[usize]) -> Result<()> {
    let stored = form.items().len();
    let mut positions = remove.to_vec();
    // Highest position first so earlier removals don't shift later ones
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();
    if let Some(&position) = positions.iter().find(|&&p| p == 0 || p > stored) {
        return Err(TrackerError::ItemIndexOutOfRange {
            index: position,
            len: stored,
        });
    }

    add_item_args(form, add)?;
    for position in positions {
        form.remove_item(position - 1)?;
    }
    Ok(())
}

/// Flag totals that the server will accept but are probably mistakes
fn warn_unusual_totals(form: &InvoiceForm, currency: &str) {
    let totals = form.totals();
    if totals.total_amount.is_sign_negative() && !totals.total_amount.is_zero() {
        eprintln!(
            "Warning: total is {} because the discount exceeds subtotal plus tax",
            format_money(totals.total_amount, currency)
        );
    }
    if form.paid_amount > totals.total_amount {
        eprintln!(
            "Warning: paid amount {} exceeds the total {}",
            format_money(form.paid_amount, currency),
            format_money(totals.total_amount, currency)
        );
    }
}

/// Works without a config directory; uses its currency symbol when present
fn cmd_invoice_quote(
    ctx: &Context,
    items: &[String],
    tax_rate: Option<&str>,
    discount: Option<&str>,
) -> Result<()> {
    let currency = ctx
        .config()
        .map(|c| c.display.currency_symbol)
        .unwrap_or_else(|_| "$".to_string());
    let today = Local::now().date_naive();
    let mut form = InvoiceForm::new(String::new(), today);
    add_item_args(&mut form, items)?;
    if let Some(rate) = tax_rate {
        form.set_tax_rate(rate);
    }
    if let Some(discount) = discount {
        form.set_discount(discount);
    }

    println!("{}", render_invoice_breakdown(form.items(), form.totals(), &currency));
    warn_unusual_totals(&form, &currency);
    Ok(())
}

struct NewInvoice {
    client: String,
    items: Vec<String>,
    tax_rate: Option<String>,
    discount: Option<String>,
    number: Option<String>,
    date: Option<String>,
    due_date: Option<String>,
    terms: Option<String>,
    notes: Option<String>,
    status: Option<InvoiceStatus>,
    payment_status: Option<PaymentStatus>,
    paid: Option<String>,
}

fn cmd_invoice_new(ctx: &Context, args: NewInvoice, dry_run: bool) -> Result<()> {
    let config = ctx.config()?;

    let invoice_date = match &args.date {
        Some(date) => parse_date(date)?,
        None => Local::now().date_naive(),
    };
    let number = args.number.unwrap_or_else(generate_invoice_number);

    let mut form = InvoiceForm::new(number, invoice_date);
    form.client_id = args.client;
    form.payment_terms = args
        .terms
        .unwrap_or_else(|| config.invoice.payment_terms.clone());
    form.due_date = match &args.due_date {
        Some(due) => Some(parse_date(due)?),
        None if config.invoice.due_days > 0 => {
            invoice_date.checked_add_days(Days::new(u64::from(config.invoice.due_days)))
        }
        None => None,
    };
    if let Some(notes) = args.notes {
        form.notes = notes;
    }
    if let Some(status) = args.status {
        form.status = status;
    }
    if let Some(payment_status) = args.payment_status {
        form.payment_status = payment_status;
    }
    if let Some(paid) = &args.paid {
        form.paid_amount = coerce_non_negative(paid);
    }

    add_item_args(&mut form, &args.items)?;
    form.set_tax_rate(args.tax_rate.as_deref().unwrap_or(&config.invoice.tax_rate));
    if let Some(discount) = &args.discount {
        form.set_discount(discount);
    }

    let mut api = ctx.client(&config)?;
    submit_invoice(&mut api, &config, &mut form, None, dry_run)
}

struct InvoiceChanges {
    add_items: Vec<String>,
    remove_items: Vec<usize>,
    tax_rate: Option<String>,
    discount: Option<String>,
    status: Option<InvoiceStatus>,
    payment_status: Option<PaymentStatus>,
    paid: Option<String>,
    due_date: Option<String>,
    notes: Option<String>,
}

fn cmd_invoice_edit(ctx: &Context, id: &str, changes: InvoiceChanges, dry_run: bool) -> Result<()> {
    let config = ctx.config()?;
    let mut api = ctx.client(&config)?;

    let invoice: Invoice = api.get(Resource::Invoices, id)?;
    let mut form = InvoiceForm::from_invoice(&invoice, Local::now().date_naive());

    apply_item_changes(&mut form, &changes.add_items, &changes.remove_items)?;
    if let Some(rate) = &changes.tax_rate {
        form.set_tax_rate(rate);
    }
    if let Some(discount) = &changes.discount {
        form.set_discount(discount);
    }
    if let Some(status) = changes.status {
        form.status = status;
    }
    if let Some(payment_status) = changes.payment_status {
        form.payment_status = payment_status;
    }
    if let Some(paid) = &changes.paid {
        form.paid_amount = coerce_non_negative(paid);
    }
    if let Some(due) = &changes.due_date {
        form.due_date = Some(parse_date(due)?);
    }
    if let Some(notes) = changes.notes {
        form.notes = notes;
    }

    submit_invoice(&mut api, &config, &mut form, Some(id), dry_run)
}

/// Print the breakdown, then send the invoice (or print the body on a dry run)
fn submit_invoice(
    api: &mut ApiClient,
    config: &Config,
    form: &mut InvoiceForm,
    id: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let currency = currency_symbol(api, config);

    println!("{}", render_invoice_breakdown(form.items(), form.totals(), &currency));
    warn_unusual_totals(form, &currency);

    let payload = form.begin_submit()?;
    if dry_run {
        form.finish_submit();
        return print_json(&payload);
    }

    let result: Result<Invoice> = match id {
        Some(id) => api.update(Resource::Invoices, id, &payload),
        None => api.create(Resource::Invoices, &payload),
    };
    form.finish_submit();
    let saved = result?;

    let verb = if id.is_some() { "Updated" } else { "Created" };
    let number = if saved.invoice_number.is_empty() {
        &payload.invoice_number
    } else {
        &saved.invoice_number
    };
    println!(
        "{verb} invoice {number} ({}), total {}",
        saved.id,
        format_money(payload.total_amount, &currency)
    );
    Ok(())
}
