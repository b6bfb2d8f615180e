use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use grid_core::{CategoryWorkflow, CommitOutcome, GridClient, GridSnapshot};
use grid_schema::{parse_options, Schema};
use grid_store::{
    ClientConfig, HttpRemoteStore, InMemoryRemoteStore, KeywordSuggester, RemoteStore,
};
use grid_types::{ColumnType, FieldMap, OptionValue, Task};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grid", about = "Schema-driven task grid client")]
struct Cli {
    /// YAML file with `base_url` and `request_timeout_ms`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend URL; overrides the config file and GRID_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List column definitions.
    Columns,
    /// Print every task as a table.
    Tasks,
    AddColumn {
        name: String,
        #[arg(long = "type", default_value = "text")]
        column_type: ColumnType,
        /// Comma separated option names.
        #[arg(long, default_value = "")]
        options: String,
    },
    UpdateColumn {
        name: String,
        #[arg(long = "type")]
        column_type: Option<ColumnType>,
        #[arg(long)]
        options: Option<String>,
    },
    DeleteColumn {
        name: String,
        /// Confirm: the column is removed from every task.
        #[arg(long)]
        yes: bool,
    },
    /// Create a task from `column=value` pairs.
    AddTask { fields: Vec<String> },
    /// Create a task by name and let the backend pick its category.
    QuickAdd { name: String },
    UpdateTask {
        id: String,
        field: String,
        value: String,
        /// Column holding `id`; defaults to the identifier column.
        #[arg(long)]
        id_field: Option<String>,
    },
    DeleteTask {
        id: String,
        #[arg(long)]
        id_field: Option<String>,
        #[arg(long)]
        yes: bool,
    },
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Run a short session against a throwaway in-memory backend.
    Demo,
}

#[derive(Subcommand)]
enum CategoryCommand {
    List,
    Add {
        name: String,
        #[arg(long, default_value = "")]
        context: String,
    },
    Edit {
        old: String,
        new: String,
        #[arg(long, default_value = "")]
        context: String,
    },
    Remove {
        name: String,
        #[arg(long)]
        yes: bool,
    },
}

fn load_config(config: Option<&Path>, api_url: Option<String>) -> anyhow::Result<ClientConfig> {
    let mut cfg = match config {
        Some(path) => ClientConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::from_env()?,
    };
    if let Some(url) = api_url {
        cfg.base_url = url;
        cfg.validate()?;
    }
    Ok(cfg)
}

/// Turn command-line text into the JSON shape the column expects.
fn cli_value(schema: &Schema, field: &str, raw: &str) -> Value {
    match schema.column(field).map(|c| c.column_type) {
        Some(t) if t.is_multi() => Value::Array(
            parse_options(raw)
                .into_iter()
                .map(|o| Value::String(o.name().to_string()))
                .collect(),
        ),
        _ => Value::String(raw.to_string()),
    }
}

fn parse_pairs(schema: &Schema, pairs: &[String]) -> anyhow::Result<FieldMap> {
    let mut fields = FieldMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected column=value, got {pair:?}");
        };
        let key = key.trim();
        fields.insert(key.to_string(), cli_value(schema, key, value.trim()));
    }
    Ok(fields)
}

fn identifier_field(snapshot: &GridSnapshot, explicit: Option<String>) -> anyhow::Result<String> {
    match explicit {
        Some(field) => Ok(field),
        None => snapshot
            .schema
            .identifier_column()
            .map(|c| c.name.clone())
            .context("schema has no columns"),
    }
}

fn print_columns(schema: &Schema) {
    for col in schema.columns() {
        let options: Vec<&str> = col.option_names().collect();
        if options.is_empty() {
            println!("{:>3}  {:<20} {}", col.order, col.name, col.column_type);
        } else {
            println!(
                "{:>3}  {:<20} {:<12} {}",
                col.order,
                col.name,
                col.column_type,
                options.join(", ")
            );
        }
    }
}

fn print_tasks(snapshot: &GridSnapshot) {
    let schema = &snapshot.schema;
    let rows: Vec<Vec<String>> = snapshot
        .tasks
        .iter()
        .map(|t| schema.render(t).into_iter().map(|(_, r)| r.to_string()).collect())
        .collect();
    let mut widths: Vec<usize> = schema.columns().iter().map(|c| c.name.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let header: Vec<String> = schema
        .columns()
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c.name, w = *w))
        .collect();
    println!("{}", header.join("  ").trim_end());
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
    println!("({} tasks)", snapshot.tasks.len());
}

fn print_category(snapshot: &GridSnapshot) -> anyhow::Result<()> {
    let col = snapshot
        .schema
        .category_column()
        .context("no category column defined")?;
    for opt in &col.options {
        if opt.context().is_empty() {
            println!("{}", opt.name());
        } else {
            println!("{:<16} {}", opt.name(), opt.context());
        }
    }
    Ok(())
}

fn print_created(task: Option<&Task>) {
    match task {
        Some(task) => println!(
            "created {}",
            serde_json::to_string(&task.fields).unwrap_or_default()
        ),
        None => println!("created"),
    }
}

async fn quick_add(client: &GridClient, name: &str) -> anyhow::Result<()> {
    let mut workflow = CategoryWorkflow::new();
    workflow.type_name(name);
    match workflow.commit(client).await? {
        CommitOutcome::Discarded => println!("nothing to add"),
        CommitOutcome::Created(task) => print_created(task.as_ref()),
    }
    Ok(())
}

async fn demo() -> anyhow::Result<()> {
    let backend = InMemoryRemoteStore::with_suggester(Arc::new(KeywordSuggester));
    let client = GridClient::new(Arc::new(backend));
    client.reload().await?;

    for name in ["Write report", "Read chapter 4", "Pay phone bill"] {
        quick_add(&client, name).await?;
    }
    client
        .update_task("Write report", "name", "status", &Value::String("in progress".into()))
        .await?;
    print_tasks(&*client.snapshot().await);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        config,
        api_url,
        command,
    } = cli;
    if let Command::Demo = command {
        return demo().await;
    }

    let cfg = load_config(config.as_deref(), api_url)?;
    tracing::debug!(base_url = cfg.base_url(), "connecting");
    let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::from_config(&cfg)?);
    let client = GridClient::new(remote);
    let snapshot = client.reload().await?;

    match command {
        // Runs before connecting.
        Command::Demo => {}
        Command::Columns => print_columns(&snapshot.schema),
        Command::Tasks => print_tasks(&snapshot),
        Command::AddColumn {
            name,
            column_type,
            options,
        } => {
            client
                .add_column(&name, column_type, parse_options(&options))
                .await?;
            print_columns(&client.snapshot().await.schema);
        }
        Command::UpdateColumn {
            name,
            column_type,
            options,
        } => {
            let options = options.as_deref().map(parse_options);
            client.update_column(&name, column_type, options).await?;
            print_columns(&client.snapshot().await.schema);
        }
        Command::DeleteColumn { name, yes } => {
            if !yes {
                bail!("deleting {name:?} removes it from every task; pass --yes to confirm");
            }
            client.delete_column(&name).await?;
            println!("deleted column {name}");
        }
        Command::AddTask { fields } => {
            let fields = parse_pairs(&snapshot.schema, &fields)?;
            client.create_task(&fields).await?;
            print_tasks(&*client.snapshot().await);
        }
        Command::QuickAdd { name } => quick_add(&client, &name).await?,
        Command::UpdateTask {
            id,
            field,
            value,
            id_field,
        } => {
            let id_field = identifier_field(&snapshot, id_field)?;
            let value = cli_value(&snapshot.schema, &field, &value);
            client.update_task(&id, &id_field, &field, &value).await?;
            print_tasks(&*client.snapshot().await);
        }
        Command::DeleteTask { id, id_field, yes } => {
            if !yes {
                bail!("pass --yes to delete {id:?}");
            }
            let id_field = identifier_field(&snapshot, id_field)?;
            client.delete_task(&id, &id_field).await?;
            println!("deleted {id}");
        }
        Command::Category { action } => {
            match action {
                CategoryCommand::List => return print_category(&snapshot),
                CategoryCommand::Add { name, context } => {
                    client
                        .add_category_option(OptionValue::contextual(name, context))
                        .await?
                }
                CategoryCommand::Edit { old, new, context } => {
                    client
                        .edit_category_option(&old, OptionValue::contextual(new, context))
                        .await?
                }
                CategoryCommand::Remove { name, yes } => {
                    if !yes {
                        bail!("tasks tagged {name:?} will lose the tag; pass --yes to confirm");
                    }
                    client.remove_category_option(&name).await?
                }
            }
            print_category(&*client.snapshot().await)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
