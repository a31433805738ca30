use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use flowdesk_agent::{AssistantConfig, AssistantMessage, ChatSession, THINKING_SECTION};
use flowdesk_api::{AppContext, FlowdeskClient};
use flowdesk_engine::ticket::{assign_step, completion_rate, current_step, step_form, step_order, submit_step};
use flowdesk_engine::value::to_json_map;
use flowdesk_engine::{FieldValue, ResourceBuilder, ResourceEntryForm, TemplateBuilder, TicketFilter, WorkflowGraph, parse_template_file, ticket_from_template};
use flowdesk_types::{Priority, ResourceType, TicketTemplate};
use flowdesk_util::{JsonLocalStore, LocalStore, format_timestamp, fuzzy_score, truncate_to_width};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "flowdesk", version, about = "Flowdesk ticketing and workflow client")]
struct Cli {
    /// Print machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session.
    Login {
        #[arg(long)]
        username: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user and their permissions.
    Whoami,
    #[command(subcommand)]
    Templates(TemplatesCommand),
    #[command(subcommand)]
    Tickets(TicketsCommand),
    #[command(subcommand)]
    Resources(ResourcesCommand),
    /// Print the dependency graph of a template file.
    Graph { file: PathBuf },
    /// Ask the assistant for a suggestion.
    Chat {
        message: String,
        /// Use the resource type assistant instead of the template assistant.
        #[arg(long)]
        resource: bool,
    },
}

#[derive(Debug, Subcommand)]
enum TemplatesCommand {
    List {
        /// Keep templates whose name matches, best match first.
        #[arg(long)]
        search: Option<String>,
    },
    Show { id: i64 },
    /// Check a template file without saving it.
    Validate { file: PathBuf },
    /// Validate a template file and create it on the server.
    Create { file: PathBuf },
}

#[derive(Debug, Subcommand)]
enum TicketsCommand {
    List {
        #[arg(long, value_enum, default_value_t = FilterArg::Open)]
        filter: FilterArg,
    },
    Create {
        template_id: i64,
        /// Defaults to the template's title format.
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Take a step; defaults to the signed-in user.
    Assign {
        ticket_id: i64,
        step_id: String,
        #[arg(long)]
        user: Option<i64>,
    },
    Submit(SubmitArgs),
}

#[derive(Debug, Args)]
struct SubmitArgs {
    ticket_id: i64,
    step_id: String,
    /// Field values as `field=value`; values that parse as JSON are used as JSON.
    #[arg(long = "set", value_parser = parse_assignment)]
    values: Vec<(String, String)>,
    /// Keep the step in progress.
    #[arg(long)]
    draft: bool,
}

#[derive(Debug, Subcommand)]
enum ResourcesCommand {
    Types,
    Entries { resource_type_id: i64 },
    /// Check a resource type file without saving it.
    ValidateType { file: PathBuf },
    /// Validate and create an entry of a resource type.
    AddEntry {
        resource_type_id: i64,
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    Open,
    Closed,
    All,
}

impl From<FilterArg> for TicketFilter {
    fn from(filter: FilterArg) -> Self {
        match filter {
            FilterArg::Open => TicketFilter::Open,
            FilterArg::Closed => TicketFilter::Closed,
            FilterArg::All => TicketFilter::All,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw.split_once('=').ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// JSON when the text parses as JSON, otherwise the text itself.
fn assignment_value(raw: &str) -> FieldValue {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => FieldValue::Json(value),
        Err(_) => FieldValue::text(raw),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store: Arc<dyn LocalStore> = Arc::new(JsonLocalStore::with_defaults().context("failed to open the local state file")?);
    let client = FlowdeskClient::new_from_env().context("invalid API configuration")?;
    let ctx = Arc::new(AppContext::new(client, Arc::clone(&store)));

    // No subcommand => TUI
    let Some(command) = cli.command else {
        let log_path = flowdesk_tui::logging::init_file_logging()?;
        info!(path = %log_path.display(), "starting terminal client");
        return flowdesk_tui::run(ctx, store).await;
    };

    init_tracing();
    debug!(?command, "running command");
    match command {
        Command::Login { username, password } => login(&ctx, &username, password).await,
        Command::Logout => {
            ctx.logout();
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => whoami(&ctx, cli.json),
        Command::Templates(command) => run_templates(&ctx, command, cli.json).await,
        Command::Tickets(command) => run_tickets(&ctx, command, cli.json).await,
        Command::Resources(command) => run_resources(&ctx, command, cli.json).await,
        Command::Graph { file } => graph(&file),
        Command::Chat { message, resource } => chat(&ctx, store, &message, resource).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn login(ctx: &AppContext, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).context("failed to read password")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    match ctx.login(username, &password).await {
        Ok(user) => {
            println!("Signed in as {}", user.display_name());
            Ok(())
        }
        Err(error) => bail!(error.user_message()),
    }
}

fn whoami(ctx: &AppContext, json: bool) -> Result<()> {
    let Some(user) = ctx.current_user() else {
        bail!("Not signed in. Run `flowdesk login --username <name>` first.");
    };
    if json {
        return print_json(&serde_json::json!({ "user": user, "permissions": ctx.permissions() }));
    }
    println!("{} <{}> (id {})", user.display_name(), user.email, user.id);
    for permission in ctx.permissions() {
        println!("  {permission}");
    }
    Ok(())
}

async fn run_templates(ctx: &AppContext, command: TemplatesCommand, json: bool) -> Result<()> {
    let client = ctx.client();
    match command {
        TemplatesCommand::List { search } => {
            let mut templates = client.list_templates().await.context("failed to list templates")?;
            if let Some(query) = search.as_deref() {
                let mut scored: Vec<(i64, TicketTemplate)> = templates
                    .into_iter()
                    .filter_map(|template| fuzzy_score(&template.name, query).map(|score| (score, template)))
                    .collect();
                scored.sort_by(|left, right| right.0.cmp(&left.0));
                templates = scored.into_iter().map(|(_, template)| template).collect();
            }
            if json {
                return print_json(&templates);
            }
            for template in templates {
                println!("{:>5}  {:<32}  {} step(s)", template.id.unwrap_or_default(), template.name, template.workflow.len());
            }
            Ok(())
        }
        TemplatesCommand::Show { id } => {
            let template = client.get_template(id).await.with_context(|| format!("failed to load template {id}"))?;
            if json {
                return print_json(&template);
            }
            print_template(&template);
            Ok(())
        }
        TemplatesCommand::Validate { file } => {
            for template in load_templates(&file)? {
                validated(&template)?;
                println!("{}: ok", template.name);
            }
            Ok(())
        }
        TemplatesCommand::Create { file } => {
            for template in load_templates(&file)? {
                let payload = validated(&template)?;
                let created = client.create_template(&payload).await.with_context(|| format!("failed to create '{}'", payload.name))?;
                println!("Created template {} ({})", created.name, created.id.unwrap_or_default());
            }
            Ok(())
        }
    }
}

fn load_templates(file: &Path) -> Result<Vec<TicketTemplate>> {
    let templates = parse_template_file(file)?;
    if templates.is_empty() {
        bail!("{} contains no templates", file.display());
    }
    Ok(templates)
}

/// Run the builder's save checks and return the normalised payload.
fn validated(template: &TicketTemplate) -> Result<TicketTemplate> {
    let mut builder = TemplateBuilder::from_template(template);
    builder.save().map_err(|errors| {
        let details: Vec<String> = errors.iter().map(|(key, message)| format!("  {key}: {message}")).collect();
        anyhow::anyhow!("template '{}' is invalid:\n{}", template.name, details.join("\n"))
    })
}

fn print_template(template: &TicketTemplate) {
    println!("{} (priority {})", template.name, template.default_priority);
    if !template.description.trim().is_empty() {
        println!("{}", textwrap::fill(&template.description, 80));
    }
    println!("Title format: {}", template.title_format);
    for (index, step) in template.workflow.iter().enumerate() {
        println!();
        println!("{}. {} [{}]", index + 1, step.name, step.id);
        if !step.description.trim().is_empty() {
            println!("{}", textwrap::indent(&textwrap::fill(&step.description, 76), "   "));
        }
        if !step.dependencies.is_empty() {
            println!("   after: {}", step.dependencies.join(", "));
        }
        for field in &step.form {
            println!("   - {} ({})", field.decorated_label(), field.kind);
        }
    }
    if let Some(warning) = WorkflowGraph::from_steps(&template.workflow).cycle_warning() {
        println!();
        println!("warning: {warning}");
    }
}

fn graph(file: &Path) -> Result<()> {
    for template in load_templates(file)? {
        let graph = WorkflowGraph::from_steps(&template.workflow);
        println!("{}", template.name);
        for node in &graph.nodes {
            println!("  [{}] {} at ({}, {})", node.id, node.label, node.x, node.y);
        }
        for edge in graph.resolved_edges() {
            println!("  {} -> {}", edge.source, edge.target);
        }
        match graph.dependency_order() {
            Ok(order) => println!("  order: {}", order.join(" -> ")),
            Err(warning) => println!("  warning: {warning}"),
        }
    }
    Ok(())
}

async fn run_tickets(ctx: &AppContext, command: TicketsCommand, json: bool) -> Result<()> {
    let client = ctx.client();
    match command {
        TicketsCommand::List { filter } => {
            let tickets = TicketFilter::from(filter).apply(client.list_tickets().await.context("failed to list tickets")?);
            if json {
                return print_json(&tickets);
            }
            // Preferences only affect how dates read.
            let display = match client.get_preferences().await {
                Ok(preferences) => preferences.display_settings,
                Err(error) => {
                    debug!(%error, "using default display settings");
                    Default::default()
                }
            };
            for ticket in tickets {
                let progress = ticket.workflow_data.as_ref().map(|data| {
                    let order = step_order(data);
                    let current = current_step(data, &order).unwrap_or("-").to_string();
                    format!("{}  at {current}", completion_rate(data, &order))
                });
                let created = ticket.created_at.as_deref().map(|raw| format_timestamp(raw, &display)).unwrap_or_default();
                println!(
                    "{:>5}  {:<10}  {:<40}  {:<19}  {}",
                    ticket.id,
                    ticket.status,
                    truncate_to_width(&ticket.title, 40),
                    created,
                    progress.unwrap_or_default()
                );
            }
            Ok(())
        }
        TicketsCommand::Create { template_id, title, priority } => {
            let template = client.get_template(template_id).await.with_context(|| format!("failed to load template {template_id}"))?;
            let payload = ticket_from_template(&template, &title, priority, Utc::now())?;
            let ticket = client.create_ticket(&payload).await.context("failed to create ticket")?;
            println!("Created ticket {} '{}'", ticket.id, ticket.title);
            Ok(())
        }
        TicketsCommand::Assign { ticket_id, step_id, user } => {
            let user_id = match user.or_else(|| ctx.current_user().map(|user| user.id)) {
                Some(user_id) => user_id,
                None => bail!("Pass --user or sign in first"),
            };
            let ticket = client.get_ticket(ticket_id).await.with_context(|| format!("failed to load ticket {ticket_id}"))?;
            let update = assign_step(&ticket, &step_id, user_id, Utc::now())?;
            client.update_ticket(ticket_id, &update).await.context("failed to update ticket")?;
            println!("Assigned step {step_id} to user {user_id}");
            Ok(())
        }
        TicketsCommand::Submit(args) => submit(ctx, args).await,
    }
}

async fn submit(ctx: &AppContext, args: SubmitArgs) -> Result<()> {
    let client = ctx.client();
    let ticket = client.get_ticket(args.ticket_id).await.with_context(|| format!("failed to load ticket {}", args.ticket_id))?;
    let mut form = step_form(&ticket, &args.step_id)?;
    for (field_id, raw) in &args.values {
        if form.fields().iter().all(|field| &field.id != field_id) {
            bail!("step '{}' has no field '{field_id}'", args.step_id);
        }
        form.set_value(field_id, assignment_value(raw));
    }

    let values = if args.draft {
        form.draft_values()
    } else {
        match form.submit() {
            Ok(values) => values,
            Err(errors) => {
                let details: Vec<String> = errors.iter().map(|(field, message)| format!("  {field}: {message}")).collect();
                bail!("the step form is invalid:\n{}", details.join("\n"));
            }
        }
    };
    let data = to_json_map(&values)?;
    let user_id = ctx.current_user().map(|user| user.id);
    let update = submit_step(&ticket, &args.step_id, data, args.draft, user_id, Utc::now())?;
    let updated = client.update_ticket(args.ticket_id, &update).await.context("failed to update ticket")?;
    println!("Ticket {} is {}", updated.id, updated.status);
    Ok(())
}

async fn run_resources(ctx: &AppContext, command: ResourcesCommand, json: bool) -> Result<()> {
    let client = ctx.client();
    match command {
        ResourcesCommand::Types => {
            let types = client.list_resource_types().await.context("failed to list resource types")?;
            if json {
                return print_json(&types);
            }
            for resource_type in types {
                println!(
                    "{:>5}  {:<32}  v{}  {} field(s)",
                    resource_type.id.unwrap_or_default(),
                    resource_type.name,
                    resource_type.version,
                    resource_type.fields.len()
                );
            }
            Ok(())
        }
        ResourcesCommand::Entries { resource_type_id } => {
            let entries = client.resource_entries(resource_type_id).await.context("failed to list resource entries")?;
            if json {
                return print_json(&entries);
            }
            for entry in entries {
                println!("{:>5}  {}", entry.id.unwrap_or_default(), Value::Object(entry.data));
            }
            Ok(())
        }
        ResourcesCommand::ValidateType { file } => {
            let content = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let resource_type: ResourceType =
                serde_yaml::from_str(&content).with_context(|| format!("{} is not a resource type document", file.display()))?;
            let mut builder = ResourceBuilder::from_resource_type(&resource_type);
            match builder.save() {
                Ok(saved) => {
                    println!("{}: ok ({} field(s))", saved.name, saved.fields.len());
                    Ok(())
                }
                Err(errors) => {
                    let details: Vec<String> = errors.iter().map(|(key, message)| format!("  {key}: {message}")).collect();
                    bail!("resource type '{}' is invalid:\n{}", resource_type.name, details.join("\n"))
                }
            }
        }
        ResourcesCommand::AddEntry { resource_type_id, values } => {
            let resource_type = client
                .get_resource_type(resource_type_id)
                .await
                .with_context(|| format!("failed to load resource type {resource_type_id}"))?;
            let mut form = ResourceEntryForm::new(&resource_type);
            for (field_id, raw) in &values {
                form.state_mut().set_value(field_id, assignment_value(raw));
            }
            let payload = form.submit()?;
            let entry = client.create_resource_entry(&payload).await.context("failed to create resource entry")?;
            println!("Created entry {}", entry.id.unwrap_or_default());
            Ok(())
        }
    }
}

async fn chat(ctx: &AppContext, store: Arc<dyn LocalStore>, message: &str, resource: bool) -> Result<()> {
    let config = if resource { AssistantConfig::resource() } else { AssistantConfig::template() };
    let mut session = ChatSession::new(config, store);
    let mut printed = 0usize;
    let on_update = |reply: &AssistantMessage| {
        if let Some(fresh) = reply.content.get(printed..).filter(|fresh| !fresh.is_empty()) {
            print!("{fresh}");
            let _ = io::stdout().flush();
            printed = reply.content.len();
        }
    };
    let suggestion = session.send(message, ctx.client(), on_update).await.context("assistant request failed")?;
    println!();

    if let Some(reply) = session.messages().last()
        && let Some(thinking) = reply.section(THINKING_SECTION)
    {
        eprintln!("\nthinking:\n{}", textwrap::indent(thinking, "  "));
    }
    match suggestion {
        Some(suggestion) => {
            println!("\nSuggested {}:", suggestion.section);
            print_json(&suggestion.payload)
        }
        None => Ok(()),
    }
}
