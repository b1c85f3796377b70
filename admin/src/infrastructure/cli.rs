use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use luminair_common::content_types::{AttributeType, ContentType};
use luminair_common::draft::FieldValue;
use luminair_common::identity::RemoteId;
use luminair_common::{ContentTypeId, ContentTypes};
use serde_json::Value;

use crate::domain::autosave::SaveState;
use crate::domain::editor::EditorSession;
use crate::domain::listing::{AlwaysConfirm, CollectionPage, ConfirmationPrompt};
use crate::domain::navigation::{MenuItem, Navigation, Sidebar, is_active};
use crate::domain::widgets::TagInput;
use crate::domain::{ContentApi, unwrap_record};

/// Command line front-end of the content admin
#[derive(Parser)]
#[command(
    name = "admin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Headless admin for the content API: list, inspect, edit and delete records"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the records of a collection as a table
    List {
        /// Collection id, e.g. blogs or case-studies
        collection: String,
    },

    /// Print one record as the editor sees it
    Show { collection: String, id: String },

    /// Delete one record after confirmation
    Delete {
        collection: String,
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Create a record, or edit an existing one, and save it
    Edit {
        collection: String,

        /// Id of the record to edit, a new record is created when absent
        #[arg(long)]
        id: Option<String>,

        /// JSON record whose fields are copied into the draft
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Field assignment, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,

        /// Append a blank row to a list field, repeatable
        #[arg(long = "add-row", value_name = "LIST")]
        added_rows: Vec<String>,

        /// Set one cell of a list row, repeatable
        #[arg(long = "row", value_name = "LIST:INDEX:CELL=VALUE")]
        row_assignments: Vec<String>,

        /// Remove a list row, repeatable
        #[arg(long = "remove-row", value_name = "LIST:INDEX")]
        removed_rows: Vec<String>,

        /// Generate a slug field from its source fields, repeatable
        #[arg(long = "slug", value_name = "FIELD")]
        slugs: Vec<String>,

        /// Let auto-save persist the changes and follow its progress
        #[arg(short, long)]
        watch: bool,
    },

    /// Print the sidebar menu
    Menu {
        /// Current location, its menu entries are marked active
        #[arg(long, default_value = "/dashboard")]
        path: String,

        /// Group list and create entries under their section
        #[arg(long)]
        nested: bool,

        /// Viewport width in pixels
        #[arg(long, default_value_t = 1280)]
        width: u32,
    },
}

/// Asks on the terminal, anything but `y`/`yes` is a no.
pub struct TerminalPrompt;

impl ConfirmationPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

pub fn content_type(
    registry: &'static dyn ContentTypes,
    collection: &str,
) -> anyhow::Result<&'static ContentType> {
    let id = ContentTypeId::try_new(collection)
        .with_context(|| format!("invalid collection name '{}'", collection))?;
    registry.get(&id).ok_or_else(|| {
        let known = registry.iterate().map(|content_type| content_type.id.to_string()).join(", ");
        anyhow!("unknown collection '{}', expected one of: {}", collection, known)
    })
}

pub async fn list(api: impl ContentApi, content_type: &'static ContentType) -> anyhow::Result<()> {
    let mut page = CollectionPage::new(api, content_type);
    page.load().await?;

    let table = page.table();
    let header = table.columns().iter().map(|column| column.title.as_str());
    println!("{}", std::iter::once("Key").chain(header).join(" | "));
    for (row, cells) in table.rows().iter().zip(table.render()) {
        let key = table.row_key(row).unwrap_or_default();
        println!("{}", std::iter::once(key).chain(cells).join(" | "));
    }
    println!("{} {}", table.rows().len(), content_type.id);
    Ok(())
}

pub async fn show(
    api: impl ContentApi,
    content_type: &'static ContentType,
    id: &str,
    delay: Duration,
) -> anyhow::Result<()> {
    let session = EditorSession::open(api, content_type, &parse_id(id)?, delay).await?;
    println!("{}", serde_json::to_string_pretty(&session.payload())?);
    if let Some(stats) = session.draft().content_stats() {
        eprintln!(
            "{} words, {} images, {} min read",
            stats.words, stats.images, stats.read_minutes
        );
    }
    session.close().await;
    Ok(())
}

pub async fn delete(
    api: impl ContentApi,
    content_type: &'static ContentType,
    id: &str,
    yes: bool,
) -> anyhow::Result<()> {
    let mut page = CollectionPage::new(api, content_type);
    page.load().await?;
    if page.table().row(id).is_none() {
        bail!("no record '{}' in {}", id, content_type.id);
    }

    let deleted = if yes {
        page.delete(id, &AlwaysConfirm).await?
    } else {
        page.delete(id, &TerminalPrompt).await?
    };
    match page.message() {
        Some(message) if deleted => println!("{message}"),
        _ => println!("Nothing deleted."),
    }
    Ok(())
}

pub struct EditRequest<'a> {
    pub id: Option<&'a str>,
    pub from: Option<&'a PathBuf>,
    pub assignments: &'a [String],
    pub added_rows: &'a [String],
    pub row_assignments: &'a [String],
    pub removed_rows: &'a [String],
    pub slugs: &'a [String],
    pub watch: bool,
}

impl EditRequest<'_> {
    fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.assignments.is_empty()
            && self.added_rows.is_empty()
            && self.row_assignments.is_empty()
            && self.removed_rows.is_empty()
            && self.slugs.is_empty()
    }
}

pub async fn edit(
    api: impl ContentApi,
    content_type: &'static ContentType,
    request: EditRequest<'_>,
    delay: Duration,
) -> anyhow::Result<()> {
    if request.watch && request.is_empty() {
        bail!("nothing to save, use --set, --row or --from");
    }

    let mut session = match request.id {
        Some(id) => EditorSession::open(api, content_type, &parse_id(id)?, delay).await?,
        None => EditorSession::create(api, content_type, delay),
    };

    if let Some(from) = request.from {
        let content = fs::read_to_string(from)
            .with_context(|| format!("failed to read record file '{}'", from.display()))?;
        let record: Value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse record file '{}'", from.display()))?;
        session.import(&unwrap_record(record, content_type.singular_name()));
    }
    apply_edits(&mut session, content_type, &request)?;
    session.validate()?;

    if request.watch {
        let mut status = session.subscribe();
        loop {
            status.changed().await.context("auto-save stopped")?;
            let current = status.borrow_and_update().clone();
            eprintln!("auto-save: {:?}", current.state);
            match current.state {
                SaveState::Saved => {
                    let id = current.remote_id.map(|id| id.to_string()).unwrap_or_default();
                    println!("Saved {} {}", content_type.id, id);
                    break;
                }
                SaveState::Error(message) => bail!(message),
                _ => {}
            }
        }
    } else {
        let id = session.submit().await?;
        println!("Saved {} {}", content_type.id, id);
    }

    session.close().await;
    Ok(())
}

pub fn menu(path: &str, nested: bool, width: u32) {
    let navigation = Navigation::new(nested);
    let mut sidebar = Sidebar::new(width);
    sidebar.navigate(path);

    println!(
        "sidebar: {}{}",
        if sidebar.is_open() { "open" } else { "closed" },
        if sidebar.is_mobile() { " (mobile)" } else { "" }
    );
    print_items(navigation.items(), sidebar.current_path(), 0);
}

fn print_items(items: &[MenuItem], current_path: &str, depth: usize) {
    for item in items {
        let marker = if is_active(&item.path, current_path) { '*' } else { ' ' };
        println!("{}{} {:<18} {}", "  ".repeat(depth), marker, item.label, item.path);
        print_items(&item.children, current_path, depth + 1);
    }
}

/// Applies the command line edits in order: fields, new rows, row cells,
/// removed rows, then slugs so that they see the final titles.
fn apply_edits(
    session: &mut EditorSession,
    content_type: &ContentType,
    request: &EditRequest<'_>,
) -> anyhow::Result<()> {
    for assignment in request.assignments {
        let (field, value) = parse_assignment(content_type, assignment)?;
        session.set_field(field, value)?;
    }
    for list in request.added_rows {
        let index = session.add_list_row(list)?;
        tracing::debug!("added row {} to {}", index, list);
    }
    for assignment in request.row_assignments {
        let (list, index, cell, value) = parse_row_assignment(assignment)?;
        session.set_list_item(list, index, cell, value)?;
    }
    for removal in request.removed_rows {
        let (list, index) = parse_row_index(removal)?;
        session.remove_list_row(list, index)?;
    }
    for field in request.slugs {
        if !session.generate_slug(field)? {
            tracing::warn!("no source text to generate '{}' from", field);
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> anyhow::Result<RemoteId> {
    RemoteId::parse(raw).ok_or_else(|| anyhow!("record id must not be empty"))
}

/// `field=value`, the value is converted to the kind of the field.
fn parse_assignment<'a>(
    content_type: &ContentType,
    assignment: &'a str,
) -> anyhow::Result<(&'a str, FieldValue)> {
    let (field, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{}'", assignment))?;
    let attribute = content_type
        .attribute(field)
        .ok_or_else(|| anyhow!("{} has no field '{}'", content_type.id, field))?;

    let value = match attribute.attribute_type {
        AttributeType::Boolean => FieldValue::Boolean(
            raw.trim()
                .parse()
                .with_context(|| format!("'{}' expects true or false", field))?,
        ),
        AttributeType::Integer => FieldValue::Integer(
            raw.trim()
                .parse()
                .with_context(|| format!("'{}' expects a whole number", field))?,
        ),
        AttributeType::Tags => {
            let mut tags = TagInput::default();
            tags.paste(raw);
            FieldValue::Text(tags.to_delimited())
        }
        AttributeType::List => bail!("list field '{}' can only be set with --from", field),
        _ => FieldValue::Text(raw.to_owned()),
    };
    Ok((field, value))
}

/// `list:index`, e.g. `metrics:2`.
fn parse_row_index(raw: &str) -> anyhow::Result<(&str, usize)> {
    let (list, index) = raw
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("expected LIST:INDEX, got '{}'", raw))?;
    let index = index
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a row index", index))?;
    Ok((list, index))
}

/// `list:index:cell=value`, e.g. `metrics:0:label=Uptime`.
fn parse_row_assignment(raw: &str) -> anyhow::Result<(&str, usize, &str, String)> {
    let (target, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected LIST:INDEX:CELL=VALUE, got '{}'", raw))?;
    let (row, cell) = target
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("expected LIST:INDEX:CELL=VALUE, got '{}'", raw))?;
    let (list, index) = parse_row_index(row)?;
    Ok((list, index, cell, value.to_owned()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use luminair_common::test_utils::{blogs, case_studies};

    use super::*;
    use crate::test_utils::RecordingApi;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn edit_arguments() {
        let cli = Cli::try_parse_from([
            "admin", "edit", "blogs", "--set", "title=Hello", "--set", "likesEnabled=false", "--watch",
        ])
        .unwrap();
        let Commands::Edit { collection, id, assignments, watch, .. } = cli.command else {
            panic!("expected the edit command");
        };
        assert_eq!(collection, "blogs");
        assert_eq!(id, None);
        assert_eq!(assignments, ["title=Hello", "likesEnabled=false"]);
        assert!(watch);
    }

    #[test]
    fn assignments_follow_field_kinds() {
        assert_eq!(
            parse_assignment(blogs(), "title=a=b").unwrap(),
            ("title", FieldValue::Text("a=b".into()))
        );
        assert_eq!(
            parse_assignment(blogs(), "likesEnabled= false").unwrap(),
            ("likesEnabled", FieldValue::Boolean(false))
        );
        assert_eq!(
            parse_assignment(blogs(), "views=12").unwrap(),
            ("views", FieldValue::Integer(12))
        );
        assert_eq!(
            parse_assignment(blogs(), "tags=grid; Grid\nsolar").unwrap(),
            ("tags", FieldValue::Text("grid,solar".into()))
        );
        assert!(parse_assignment(blogs(), "views=many").is_err());
        assert!(parse_assignment(blogs(), "title").is_err());
        assert!(parse_assignment(blogs(), "nope=1").is_err());
        assert!(parse_assignment(case_studies(), "metrics=[]").is_err());
    }

    #[test]
    fn row_arguments() {
        let cli = Cli::try_parse_from([
            "admin", "edit", "case-studies", "--add-row", "metrics", "--row", "metrics:1:label=Uptime",
            "--remove-row", "metrics:0", "--slug", "slug",
        ])
        .unwrap();
        let Commands::Edit { added_rows, row_assignments, removed_rows, slugs, .. } = cli.command else {
            panic!("expected the edit command");
        };
        assert_eq!(added_rows, ["metrics"]);
        assert_eq!(row_assignments, ["metrics:1:label=Uptime"]);
        assert_eq!(removed_rows, ["metrics:0"]);
        assert_eq!(slugs, ["slug"]);
    }

    #[test]
    fn row_assignments_are_parsed() {
        assert_eq!(
            parse_row_assignment("metrics:1:label=99.9% = uptime").unwrap(),
            ("metrics", 1, "label", "99.9% = uptime".to_owned())
        );
        assert_eq!(parse_row_index("faqItems:3").unwrap(), ("faqItems", 3));
        assert!(parse_row_assignment("metrics:label=x").is_err());
        assert!(parse_row_assignment("metrics:1:label").is_err());
        assert!(parse_row_index("metrics").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn row_and_slug_edits_reach_the_draft() {
        let api = RecordingApi::default();
        let mut session = EditorSession::create(api, blogs(), Duration::from_millis(1200));
        let mut case_study = EditorSession::create(RecordingApi::default(), case_studies(), Duration::from_millis(1200));

        let assignments = ["title=Grid Upgrade".to_owned()];
        let slugs = ["slug".to_owned()];
        let request = EditRequest {
            id: None,
            from: None,
            assignments: &assignments,
            added_rows: &[],
            row_assignments: &[],
            removed_rows: &[],
            slugs: &slugs,
            watch: false,
        };
        apply_edits(&mut session, blogs(), &request).unwrap();
        assert_eq!(session.draft().text("slug"), Some("grid-upgrade"));

        let added = ["metrics".to_owned()];
        let rows = ["metrics:1:label=Uptime".to_owned(), "metrics:1:value=99.9%".to_owned()];
        let removed = ["metrics:0".to_owned()];
        let request = EditRequest {
            id: None,
            from: None,
            assignments: &[],
            added_rows: &added,
            row_assignments: &rows,
            removed_rows: &removed,
            slugs: &[],
            watch: false,
        };
        apply_edits(&mut case_study, case_studies(), &request).unwrap();

        let metrics = case_study.draft().rows("metrics").unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0]["label"], "Uptime");
        assert_eq!(metrics[0]["value"], "99.9%");

        let too_many = ["metrics:0".to_owned()];
        let request = EditRequest {
            removed_rows: &too_many,
            added_rows: &[],
            row_assignments: &[],
            ..request
        };
        assert!(apply_edits(&mut case_study, case_studies(), &request).is_err());
    }

    #[test]
    fn unknown_collections_are_rejected() {
        let registry = luminair_common::builtin_content_types().unwrap();
        assert_eq!(content_type(registry, "Blogs").unwrap().id.to_string(), "blogs");

        let error = content_type(registry, "pages").unwrap_err().to_string();
        assert_eq!(
            error,
            "unknown collection 'pages', expected one of: blogs, case-studies, services"
        );
    }
}
