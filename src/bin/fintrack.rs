//! CLI front end: list, summarize and edit transactions with an offline
//! cache.

use std::io::{self, Write as _};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use fintrack::aggregate::{self, MonthKey, Suggestion, Summary};
use fintrack::cache::FileCache;
use fintrack::client::RestBlockingClient;
use fintrack::models::{
    Currency, Transaction, TransactionDraft, TransactionId, TransactionPatch, TransactionType,
    UserId,
};
use fintrack::sync::{CacheSyncBlocking, Loaded};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Base URL of the hosted store.
const URL_ENV: &str = "FINTRACK_URL";
/// Project API key.
const API_KEY_ENV: &str = "FINTRACK_API_KEY";
/// Optional user session token.
const ACCESS_TOKEN_ENV: &str = "FINTRACK_ACCESS_TOKEN";
/// Id of the signed-in user.
const USER_ID_ENV: &str = "FINTRACK_USER_ID";

/// Service type the CLI drives.
type Service = CacheSyncBlocking<RestBlockingClient, FileCache>;

/// Personal finance tracker: browse, summarize and edit transactions.
#[derive(Debug, Parser)]
#[command(name = "fintrack", version, about)]
struct Cli {
    /// Override the cache directory (default: platform cache dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Act as this user instead of `FINTRACK_USER_ID`.
    #[arg(long, global = true, value_name = "ID")]
    user: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// List transactions, newest first.
    List,
    /// Show totals, the monthly expense series and category breakdown.
    Summary {
        /// Number of months in the expense series, ending with the current
        /// one.
        #[arg(long, default_value = "6", value_parser = parse_months)]
        months: NonZeroU32,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Record a new transaction.
    Add(AddArgs),
    /// Change fields of an existing transaction.
    Edit {
        /// Id of the transaction to change.
        id: i64,
        /// Fields to change.
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Delete a transaction.
    Remove {
        /// Id of the transaction to delete.
        id: i64,
    },
}

/// Arguments for the `add` subcommand.
#[derive(Debug, Args)]
struct AddArgs {
    /// Short label.
    title: String,
    /// Non-negative amount.
    amount: f64,
    /// `income` or `expense`.
    #[arg(long = "type", value_name = "TYPE")]
    kind: TransactionType,
    /// Category name.
    #[arg(long)]
    category: Option<String>,
    /// Currency code (default INR).
    #[arg(long)]
    currency: Option<Currency>,
    /// Date of the transaction (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<Utc>>,
    /// Free-text note.
    #[arg(long)]
    description: Option<String>,
}

/// Arguments for the `edit` subcommand.
#[derive(Debug, Args)]
struct EditArgs {
    /// New title.
    #[arg(long)]
    title: Option<String>,
    /// New amount.
    #[arg(long)]
    amount: Option<f64>,
    /// New direction.
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<TransactionType>,
    /// New category.
    #[arg(long)]
    category: Option<String>,
    /// New currency code.
    #[arg(long)]
    currency: Option<Currency>,
    /// New date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<Utc>>,
    /// New note.
    #[arg(long)]
    description: Option<String>,
}

impl AddArgs {
    /// Converts the arguments into a draft.
    fn into_draft(self) -> TransactionDraft {
        let mut draft = TransactionDraft::new(self.title, self.amount, self.kind);
        if let Some(category) = self.category {
            draft = draft.category(category);
        }
        if let Some(currency) = self.currency {
            draft = draft.currency(currency);
        }
        if let Some(date) = self.date {
            draft = draft.date(date);
        }
        if let Some(description) = self.description {
            draft = draft.description(description);
        }
        draft
    }
}

impl EditArgs {
    /// Converts the arguments into a patch holding only the given fields.
    fn into_patch(self) -> TransactionPatch {
        let mut patch = TransactionPatch::new();
        if let Some(title) = self.title {
            patch = patch.title(title);
        }
        if let Some(amount) = self.amount {
            patch = patch.amount(amount);
        }
        if let Some(kind) = self.kind {
            patch = patch.kind(kind);
        }
        if let Some(category) = self.category {
            patch = patch.category(category);
        }
        if let Some(currency) = self.currency {
            patch = patch.currency(currency);
        }
        if let Some(date) = self.date {
            patch = patch.date(date);
        }
        if let Some(description) = self.description {
            patch = patch.description(description);
        }
        patch
    }
}

/// Parses a `YYYY-MM-DD` date as midnight UTC for clap.
fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))?;
    day.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("invalid date: {s}"))
}

/// Parses `--months`, accepting 1 up to the aggregation window cap.
fn parse_months(s: &str) -> Result<NonZeroU32, String> {
    let months: u32 = s.parse().map_err(|err| format!("{err}"))?;
    if months > aggregate::MAX_LOOKBACK_MONTHS {
        return Err(format!(
            "at most {} months are supported",
            aggregate::MAX_LOOKBACK_MONTHS
        ));
    }
    NonZeroU32::new(months).ok_or_else(|| "months must be at least 1".to_owned())
}

/// Connection settings gathered from the environment.
#[derive(Debug)]
struct Settings {
    /// Store base URL.
    url: String,
    /// Project API key.
    api_key: String,
    /// Optional session token.
    access_token: Option<String>,
    /// Acting user.
    user: UserId,
}

impl Settings {
    /// Resolves settings through `lookup`, letting `user_override` win over
    /// the environment. Returns the name of the first missing variable on
    /// failure.
    fn resolve<F>(lookup: F, user_override: Option<String>) -> Result<Self, &'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
        let url = present(URL_ENV).ok_or(URL_ENV)?;
        let api_key = present(API_KEY_ENV).ok_or(API_KEY_ENV)?;
        let user = user_override
            .filter(|value| !value.trim().is_empty())
            .or_else(|| present(USER_ID_ENV))
            .ok_or(USER_ID_ENV)?;
        Ok(Self {
            url,
            api_key,
            access_token: present(ACCESS_TOKEN_ENV),
            user: UserId::new(user),
        })
    }
}

/// Prints an `error:` line to stderr.
fn report(message: core::fmt::Arguments<'_>) -> io::Result<()> {
    writeln!(io::stderr().lock(), "{} {message}", "error:".red().bold())
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let settings = match Settings::resolve(|name| std::env::var(name).ok(), cli.user) {
        Ok(settings) => settings,
        Err(missing) => {
            report(format_args!("{} environment variable is not set", missing.bold()))?;
            writeln!(
                io::stderr().lock(),
                "  {} create a .env file with {}=<value>",
                "hint:".cyan(),
                missing
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let cache = match create_cache(cli.data_dir) {
        Ok(cache) => cache,
        Err(err) => {
            report(format_args!("failed to initialize cache: {err}"))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut builder = RestBlockingClient::builder()
        .base_url(settings.url)
        .api_key(settings.api_key);
    if let Some(token) = settings.access_token {
        builder = builder.access_token(token);
    }
    let service = match builder
        .build()
        .and_then(|client| Service::builder().remote(client).cache(cache).build())
    {
        Ok(service) => service,
        Err(err) => {
            report(format_args!("failed to build client: {err}"))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    dispatch(&service, &settings.user, cli.command)
}

/// Creates the cache backend, using `data_dir` if provided or the default
/// platform cache directory otherwise.
fn create_cache(data_dir: Option<PathBuf>) -> fintrack::error::Result<FileCache> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileCache::default_dir()?,
    };
    FileCache::new(dir)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch(service: &Service, user: &UserId, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::List => cmd_list(service, user),
        Command::Summary { months, json } => cmd_summary(service, user, months, json),
        Command::Add(args) => cmd_add(service, user, args),
        Command::Edit { id, fields } => cmd_edit(service, user, TransactionId::new(id), fields),
        Command::Remove { id } => cmd_remove(service, user, TransactionId::new(id)),
    }
}

/// Loads the user's transactions behind a spinner, warning when the list
/// came from the cache.
fn load(service: &Service, user: &UserId) -> io::Result<Loaded> {
    let spinner = make_spinner("Fetching transactions...");
    let loaded = service.load(user);
    spinner.finish_and_clear();
    if !loaded.is_fresh() {
        writeln!(
            io::stderr().lock(),
            "{} store unreachable, showing cached transactions",
            "warning:".yellow().bold()
        )?;
    }
    Ok(loaded)
}

/// Executes the `list` subcommand.
fn cmd_list(service: &Service, user: &UserId) -> io::Result<ExitCode> {
    let loaded = load(service, user)?;
    print_transactions_table(&loaded.transactions)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `summary` subcommand.
fn cmd_summary(
    service: &Service,
    user: &UserId,
    months: NonZeroU32,
    json: bool,
) -> io::Result<ExitCode> {
    let loaded = load(service, user)?;
    let summary = aggregate::summarize(&loaded.transactions, months);
    if json {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &summary).map_err(io::Error::other)?;
        writeln!(out)?;
    } else {
        print_summary(&summary)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `add` subcommand.
fn cmd_add(service: &Service, user: &UserId, args: AddArgs) -> io::Result<ExitCode> {
    let draft = args.into_draft();
    let spinner = make_spinner("Saving transaction...");
    let result = service.create(user, &draft);
    spinner.finish_and_clear();
    match result {
        Ok(created) => {
            writeln!(
                io::stdout().lock(),
                "{} transaction {} recorded",
                "Added".green().bold(),
                created.id
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report(format_args!("failed to add transaction: {err}"))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `edit` subcommand.
fn cmd_edit(
    service: &Service,
    user: &UserId,
    id: TransactionId,
    fields: EditArgs,
) -> io::Result<ExitCode> {
    let patch = fields.into_patch();
    let spinner = make_spinner("Updating transaction...");
    let result = service.update(user, id, &patch);
    spinner.finish_and_clear();
    match result {
        Ok(updated) => {
            writeln!(
                io::stdout().lock(),
                "{} transaction {}",
                "Updated".green().bold(),
                updated.id
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report(format_args!("failed to update transaction {id}: {err}"))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `remove` subcommand.
fn cmd_remove(service: &Service, user: &UserId, id: TransactionId) -> io::Result<ExitCode> {
    let spinner = make_spinner("Deleting transaction...");
    let result = service.remove(user, id);
    spinner.finish_and_clear();
    match result {
        Ok(()) => {
            writeln!(
                io::stdout().lock(),
                "{} transaction {id}",
                "Removed".green().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report(format_args!("failed to remove transaction {id}: {err}"))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Renders a month as e.g. `Mar 2024`.
fn month_label(month: MonthKey) -> String {
    month.first_day().map_or_else(
        || month.to_string(),
        |day| day.format("%b %Y").to_string(),
    )
}

/// Human-readable text for a suggestion, if there is anything to say.
const fn suggestion_message(suggestion: Suggestion) -> Option<&'static str> {
    match suggestion {
        Suggestion::Overspent => Some("You are spending more than you earn. Review your biggest categories."),
        Suggestion::Underspent => Some("You are spending less than half of your income. Consider saving or investing the rest."),
        Suggestion::Balanced => Some("Your spending is within your income."),
        Suggestion::None => None,
    }
}

/// Prints transactions in a table.
fn print_transactions_table(txs: &[Transaction]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if txs.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);

    for tx in txs {
        let date = tx
            .date
            .or(tx.created_at)
            .map_or_else(|| "\u{2014}".to_owned(), |at| at.format("%Y-%m-%d").to_string());
        let amount = format!("{}{:.2}", tx.currency.symbol(), tx.magnitude());
        let amount_cell = if tx.is_expense() {
            Cell::new(amount).fg(Color::Red)
        } else {
            Cell::new(amount).fg(Color::Green)
        };
        _ = table.add_row(vec![
            Cell::new(tx.id),
            Cell::new(date),
            Cell::new(&tx.title),
            Cell::new(tx.normalized_category()),
            amount_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Transactions".green().bold(),
        format_args!("({})", txs.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints a summary: totals, monthly series, categories and suggestion.
fn print_summary(summary: &Summary) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let totals = summary.totals;
    writeln!(out, "{}", "Summary".green().bold())?;
    writeln!(out)?;
    writeln!(out, "  {} {:.2}", "Income: ".bold(), totals.income)?;
    writeln!(out, "  {} {:.2}", "Expense:".bold(), totals.expense)?;
    writeln!(out, "  {} {:.2}", "Balance:".bold(), totals.balance)?;
    writeln!(out)?;

    let mut monthly = Table::new();
    _ = monthly.load_preset(UTF8_FULL);
    _ = monthly.set_header(vec![
        Cell::new("Month").fg(Color::Cyan),
        Cell::new("Spending").fg(Color::Cyan),
    ]);
    for point in &summary.monthly {
        _ = monthly.add_row(vec![
            Cell::new(month_label(point.month)),
            Cell::new(format!("{:.2}", point.total)),
        ]);
    }
    writeln!(out, "{}", "Spending by month".bold())?;
    writeln!(out, "{monthly}")?;
    writeln!(out)?;

    if summary.categories.is_empty() {
        writeln!(out, "{}", "No expenses by category.".dimmed())?;
    } else {
        let mut categories = Table::new();
        _ = categories.load_preset(UTF8_FULL);
        _ = categories.set_header(vec![
            Cell::new("Category").fg(Color::Cyan),
            Cell::new("Spending").fg(Color::Cyan),
        ]);
        for entry in &summary.categories {
            _ = categories.add_row(vec![
                Cell::new(&entry.category),
                Cell::new(format!("{:.2}", entry.total)),
            ]);
        }
        writeln!(out, "{}", "Spending by category".bold())?;
        writeln!(out, "{categories}")?;
    }

    if let Some(message) = suggestion_message(summary.suggestion) {
        writeln!(out)?;
        writeln!(out, "{} {message}", "tip:".cyan().bold())?;
    }
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _io = writeln!(io::stderr().lock(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
