//! Issue subcommands
//!
//! Every command goes through the [`IssueApi`] so the CLI sees exactly the
//! bodies and error envelopes any other client would. `--format json` prints
//! those bodies unchanged; the table format decodes them for display.

use crate::cli::{
    ClearableField, Commands, CreateArgs, IssueFieldArgs, ListArgs, OutputFormat, UpdateArgs,
};
use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::EXIT_INVALID_INPUT;
use anyhow::Context;
use colored::*;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Color, Style},
    Table, Tabled,
};
use triage::api::{ApiResponse, IssueListResponse, IssueResponse};
use triage::issues::{IssueStore, ListIssuesQuery};
use triage::IssueApi;

const TITLE_WIDTH: usize = 48;

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&IssueResponse> for IssueRow {
    fn from(issue: &IssueResponse) -> Self {
        Self {
            id: issue.id.clone(),
            title: truncate(&issue.title, TITLE_WIDTH),
            status: issue.status.to_string(),
            priority: issue.priority.to_string(),
            assignee: issue.assignee.clone().unwrap_or_else(|| "-".to_string()),
            due: issue
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
            updated: issue.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Run one issue subcommand against `api`
pub async fn run_command<S: IssueStore + ?Sized>(
    api: &IssueApi<S>,
    command: Commands,
    color: bool,
) -> CliResult<()> {
    match command {
        Commands::List(args) => list_issues(api, args, color).await,
        Commands::Show { id, format } => show_issue(api, &id, format).await,
        Commands::Create(args) => create_issue(api, args).await,
        Commands::Update(args) => update_issue(api, args).await,
        Commands::Delete { id } => delete_issue(api, &id).await,
        Commands::Import { file, format } => import_issues(api, &file, format, color).await,
    }
}

async fn list_issues<S: IssueStore + ?Sized>(
    api: &IssueApi<S>,
    args: ListArgs,
    color: bool,
) -> CliResult<()> {
    let format = args.format;
    let response = api.list(&list_query(args)).await;
    let body = expect_success(response)?;

    match format {
        OutputFormat::Json => print_json(&body),
        OutputFormat::Table => {
            let page: IssueListResponse = decode(body)?;
            println!("{}", render_page(&page, color));
            Ok(())
        }
    }
}

async fn show_issue<S: IssueStore + ?Sized>(
    api: &IssueApi<S>,
    id: &str,
    format: OutputFormat,
) -> CliResult<()> {
    let body = expect_success(api.get(id).await)?;
    match format {
        OutputFormat::Json => print_json(&body),
        OutputFormat::Table => {
            let issue: IssueResponse = decode(body)?;
            println!("{}", render_details(&issue));
            Ok(())
        }
    }
}

async fn create_issue<S: IssueStore + ?Sized>(api: &IssueApi<S>, args: CreateArgs) -> CliResult<()> {
    let format = args.format;
    let body = expect_success(api.create(create_body(&args)).await)?;
    match format {
        OutputFormat::Json => print_json(&body),
        OutputFormat::Table => {
            let issue: IssueResponse = decode(body)?;
            println!(
                "{} Created issue {} - {}",
                "✅".green(),
                issue.id,
                issue.title.bold()
            );
            Ok(())
        }
    }
}

async fn update_issue<S: IssueStore + ?Sized>(api: &IssueApi<S>, args: UpdateArgs) -> CliResult<()> {
    let format = args.format;
    let request = update_body(&args)?;
    let body = expect_success(api.update(&args.id, request).await)?;
    match format {
        OutputFormat::Json => print_json(&body),
        OutputFormat::Table => {
            let issue: IssueResponse = decode(body)?;
            println!(
                "{} Updated issue {} - {}",
                "✅".green(),
                issue.id,
                issue.title.bold()
            );
            Ok(())
        }
    }
}

async fn delete_issue<S: IssueStore + ?Sized>(api: &IssueApi<S>, id: &str) -> CliResult<()> {
    expect_success(api.delete(id).await)?;
    println!("{} Deleted issue {}", "🗑️".red(), id);
    Ok(())
}

async fn import_issues<S: IssueStore + ?Sized>(
    api: &IssueApi<S>,
    file: &Path,
    format: OutputFormat,
    color: bool,
) -> CliResult<()> {
    let content = read_input(file)?;
    let request: Value = serde_json::from_str(&content).cli_error(EXIT_INVALID_INPUT)?;

    let body = expect_success(api.bulk_create(request).await)?;
    match format {
        OutputFormat::Json => print_json(&body),
        OutputFormat::Table => {
            let issues: Vec<IssueResponse> = decode(body)?;
            println!("{} Imported {} issues", "✅".green(), issues.len());
            if !issues.is_empty() {
                println!("{}", render_table(&issues, color));
            }
            Ok(())
        }
    }
}

fn read_input(file: &Path) -> CliResult<String> {
    if file.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read issues from stdin")?;
        return Ok(content);
    }
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read '{}'", file.display()))?;
    Ok(content)
}

/// Translate `list` flags into a list request
pub fn list_query(args: ListArgs) -> ListIssuesQuery {
    ListIssuesQuery {
        search: args.search,
        status: args.status,
        priority: args.priority,
        assignee: args.assignee,
        sort_by: args.sort_by,
        sort_order: args.sort_order,
        page: args.page,
        page_size: args.page_size,
    }
}

fn field_body(fields: &IssueFieldArgs) -> Map<String, Value> {
    let mut body = Map::new();
    let mut put = |key: &str, value: Option<&String>| {
        if let Some(value) = value {
            body.insert(key.to_string(), Value::String(value.clone()));
        }
    };
    put("description", fields.description.as_ref());
    put("status", fields.status.as_ref());
    put("priority", fields.priority.as_ref());
    put("assignee", fields.assignee.as_ref());
    put("reporter", fields.reporter.as_ref());
    put("dueDate", fields.due_date.as_ref());

    if !fields.labels.is_empty() {
        body.insert("labels".to_string(), Value::from(fields.labels.clone()));
    }
    if let Some(hours) = fields.estimated_hours {
        body.insert("estimatedHours".to_string(), Value::from(hours));
    }
    body
}

/// Request body for `create`
pub fn create_body(args: &CreateArgs) -> Value {
    let mut body = field_body(&args.fields);
    body.insert("title".to_string(), Value::String(args.title.clone()));
    Value::Object(body)
}

/// Request body for `update`; `--clear` fields are sent as `null`
pub fn update_body(args: &UpdateArgs) -> CliResult<Value> {
    let mut body = field_body(&args.fields);
    if let Some(title) = &args.title {
        body.insert("title".to_string(), Value::String(title.clone()));
    }

    for field in &args.clear {
        let key = field.body_key();
        if body.contains_key(key) {
            return Err(CliError::invalid_input(format!(
                "Cannot both set and clear '{}'",
                clear_flag_name(*field)
            )));
        }
        body.insert(key.to_string(), Value::Null);
    }

    if body.is_empty() {
        return Err(CliError::invalid_input(
            "Nothing to update: pass at least one field or --clear",
        ));
    }
    Ok(Value::Object(body))
}

fn clear_flag_name(field: ClearableField) -> &'static str {
    match field {
        ClearableField::Description => "description",
        ClearableField::Assignee => "assignee",
        ClearableField::Reporter => "reporter",
        ClearableField::Labels => "labels",
        ClearableField::DueDate => "due-date",
        ClearableField::EstimatedHours => "estimated-hours",
    }
}

fn expect_success(response: ApiResponse) -> CliResult<Value> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(CliError::from_response(&response))
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> CliResult<T> {
    serde_json::from_value(body).cli_general_error()
}

fn print_json(body: &Value) -> CliResult<()> {
    let json = serde_json::to_string_pretty(body).cli_general_error()?;
    println!("{}", json);
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Render issues as a table
pub fn render_table(issues: &[IssueResponse], color: bool) -> String {
    let rows: Vec<IssueRow> = issues.iter().map(IssueRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.modify(Rows::new(1..), Alignment::left());

    if color {
        table.modify(Rows::first(), Color::FG_BRIGHT_CYAN);
        for (i, issue) in issues.iter().enumerate() {
            let row = i + 1;
            match issue.priority.as_str() {
                "critical" => {
                    table.modify(Rows::new(row..row + 1), Color::FG_RED);
                }
                "high" => {
                    table.modify(Rows::new(row..row + 1), Color::FG_YELLOW);
                }
                _ => {}
            }
        }
    }

    table.to_string()
}

/// Render a list page: table, position and the available filter values
pub fn render_page(page: &IssueListResponse, color: bool) -> String {
    if page.issues.is_empty() {
        return if page.pagination.total_items == 0 {
            "No issues found.".to_string()
        } else {
            format!(
                "No issues on page {} of {}.",
                page.pagination.current_page, page.pagination.total_pages
            )
        };
    }

    let join = |values: Vec<String>| {
        if values.is_empty() {
            "-".to_string()
        } else {
            values.join(", ")
        }
    };

    let mut out = render_table(&page.issues, color);
    out.push('\n');
    out.push_str(&format!(
        "Page {} of {} ({} issues)",
        page.pagination.current_page, page.pagination.total_pages, page.pagination.total_items
    ));
    out.push('\n');
    out.push_str(
        &format!(
            "Statuses: {}  Priorities: {}  Assignees: {}",
            join(
                page.filters
                    .available_statuses
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            ),
            join(
                page.filters
                    .available_priorities
                    .iter()
                    .map(|p| p.to_string())
                    .collect()
            ),
            join(page.filters.available_assignees.clone()),
        )
        .dimmed()
        .to_string(),
    );
    out
}

/// Render one issue with every field
pub fn render_details(issue: &IssueResponse) -> String {
    let none = || "-".to_string();
    let lines = [
        ("Status", issue.status.to_string()),
        ("Priority", issue.priority.to_string()),
        ("Assignee", issue.assignee.clone().unwrap_or_else(none)),
        ("Reporter", issue.reporter.clone().unwrap_or_else(none)),
        (
            "Labels",
            if issue.labels.is_empty() {
                none()
            } else {
                issue.labels.join(", ")
            },
        ),
        (
            "Due",
            issue
                .due_date
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(none),
        ),
        (
            "Estimate",
            issue
                .estimated_hours
                .map(|h| format!("{h}h"))
                .unwrap_or_else(none),
        ),
        ("Created", issue.created_at.to_rfc3339()),
        ("Updated", issue.updated_at.to_rfc3339()),
    ];

    let mut out = format!("{} {}\n", issue.id.bold(), issue.title.bold());
    for (label, value) in lines {
        out.push_str(&format!("  {:<9} {}\n", format!("{label}:").cyan(), value));
    }
    if let Some(description) = &issue.description {
        out.push('\n');
        out.push_str(description);
        out.push('\n');
    }
    out
}
