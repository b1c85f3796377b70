use admin::infrastructure::cli::{self, Cli, Commands, EditRequest};
use admin::infrastructure::http::{HttpClientConfig, HttpContentApi};
use admin::infrastructure::settings::Settings;
use clap::Parser;
use luminair_common::load_content_types;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Menu { path, nested, width } = &cli.command {
        cli::menu(path, *nested || settings.navigation.nested, *width);
        return Ok(());
    }

    let content_types = load_content_types(settings.schema_config_path.as_deref())?;
    tracing::debug!("Content types loaded");

    let api = HttpContentApi::new(HttpClientConfig {
        base_url: &settings.api.base_url,
        timeout: settings.api.timeout(),
    })?;
    let delay = settings.autosave.delay();

    match &cli.command {
        Commands::List { collection } => {
            cli::list(api, cli::content_type(content_types, collection)?).await
        }
        Commands::Show { collection, id } => {
            cli::show(api, cli::content_type(content_types, collection)?, id, delay).await
        }
        Commands::Delete { collection, id, yes } => {
            cli::delete(api, cli::content_type(content_types, collection)?, id, *yes).await
        }
        Commands::Edit {
            collection,
            id,
            from,
            assignments,
            added_rows,
            row_assignments,
            removed_rows,
            slugs,
            watch,
        } => {
            let request = EditRequest {
                id: id.as_deref(),
                from: from.as_ref(),
                assignments,
                added_rows,
                row_assignments,
                removed_rows,
                slugs,
                watch: *watch,
            };
            cli::edit(api, cli::content_type(content_types, collection)?, request, delay).await
        }
        Commands::Menu { .. } => Ok(()),
    }
}
