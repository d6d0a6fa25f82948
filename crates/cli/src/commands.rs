use std::{fs, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use switchos_core::{
    catalog::{self, CatalogClient},
    models::{to_pretty_json, DraftKind},
    render::RenderTarget,
    transfer::{self, DEFAULT_EXPORT_FILE},
    AppConfig, FileStore, GameDraft, Profile, Renderer, StorageError, SwitchStorage,
};

use crate::{CatalogCommand, Commands, ContentArg};

type Storage = SwitchStorage<Arc<FileStore>>;

pub async fn run(command: Commands, storage: &Storage, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Profiles => list_profiles(storage),
        Commands::Games => list_games(&storage.selected_profile()),
        Commands::AddUser { name, icon } => {
            let bytes =
                fs::read(&icon).with_context(|| format!("failed to read {}", icon.display()))?;
            let profile = storage.add_user(name, bytes)?;
            println!("Added {} ({})", profile.name, profile.id);
            Ok(())
        }
        Commands::CreateGame {
            name,
            icon,
            kind,
            content,
            user_agent,
            install,
        } => {
            let draft = GameDraft {
                name,
                image_url: icon,
                kind: match kind {
                    ContentArg::Url => DraftKind::Url,
                    ContentArg::Html => DraftKind::Html,
                },
                content,
                user_agent,
            };
            let game = draft.build()?;
            println!("{}", to_pretty_json(&game)?);
            if install {
                install_into_selected(storage, game)?;
            }
            Ok(())
        }
        Commands::Import { path } => {
            let batch = transfer::read_import_path(&path)?;
            if batch.games.is_empty() && !batch.failed_files.is_empty() {
                bail!("no valid game files found in {}", path.display());
            }
            let report = storage.import_games(storage.selected_profile().id, batch.games)?;
            println!("{report}");
            for file in batch.failed_files {
                println!("Could not decode {}", file.display());
            }
            Ok(())
        }
        Commands::Export { out } => {
            let profile = storage.selected_profile();
            let bytes = transfer::export_games(&profile.games)?;
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            let path = transfer::write_export(dir, DEFAULT_EXPORT_FILE, &bytes)?;
            println!(
                "Exported {} game(s) from {} to {}",
                profile.games.len(),
                profile.name,
                path.display()
            );
            Ok(())
        }
        Commands::Remove { ids } => {
            let report = storage.remove_games(storage.selected_profile().id, &ids)?;
            println!("Removed {} game(s)", report.removed);
            if report.store_protected {
                println!("The Store app can't be removed");
            }
            for id in &report.missing {
                println!("No game with id {id}");
            }
            Ok(())
        }
        Commands::Launch { name } => {
            let profile = storage.selected_profile();
            let game = profile
                .games
                .iter()
                .find(|game| game.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| anyhow!("{} has no game named {name}", profile.name))?;
            let renderer = Renderer::new(&config.document_dir, config.default_user_agent.clone());
            match renderer.prepare(game)? {
                RenderTarget::Web { url, user_agent } => {
                    println!("web page {url}");
                    print_user_agent(user_agent.as_deref());
                }
                RenderTarget::Document {
                    path, user_agent, ..
                } => {
                    println!("local document {}", path.display());
                    print_user_agent(user_agent.as_deref());
                }
                RenderTarget::Internal(view) => println!("internal view {view}"),
            }
            Ok(())
        }
        Commands::Catalog(command) => run_catalog(command, storage, config).await,
        Commands::Reset => {
            storage.reset()?;
            println!("All games and profiles have been erased and reset to default");
            Ok(())
        }
    }
}

async fn run_catalog(command: CatalogCommand, storage: &Storage, config: &AppConfig) -> Result<()> {
    let client = CatalogClient::new(config.catalog.clone())?;
    let snapshot = client.fetch().await?;
    match command {
        CatalogCommand::List => {
            if snapshot.games.is_empty() {
                println!("No games yet");
            }
            for game in &snapshot.games {
                let kind = game
                    .content
                    .as_ref()
                    .map(catalog::describe_content)
                    .unwrap_or("None");
                println!("{}\t{}\t{}\t{}", game.name, kind, game.id, game.image_url);
            }
            if snapshot.skipped > 0 {
                println!("({} entries could not be decoded)", snapshot.skipped);
            }
            Ok(())
        }
        CatalogCommand::Install { name } => {
            let game = snapshot
                .games
                .into_iter()
                .find(|game| game.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| anyhow!("the store has no game named {name}"))?;
            install_into_selected(storage, game)
        }
    }
}

fn install_into_selected(storage: &Storage, game: switchos_core::Game) -> Result<()> {
    let profile = storage.selected_profile();
    let name = game.name.clone();
    match storage.install_game(profile.id, game) {
        Ok(()) => {
            println!("Installed {name} for {}", profile.name);
            Ok(())
        }
        Err(StorageError::Duplicate(err)) => {
            println!("Duplicate found: {err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn find_profile(storage: &Storage, selector: &str) -> Result<Profile> {
    storage
        .profiles()
        .into_iter()
        .find(|profile| {
            profile.name == selector || profile.id.to_string() == selector.to_lowercase()
        })
        .ok_or_else(|| anyhow!("no profile matches {selector}"))
}

fn list_profiles(storage: &Storage) -> Result<()> {
    let selected = storage.selected_profile();
    for profile in storage.profiles() {
        let marker = if profile.id == selected.id { "*" } else { " " };
        println!(
            "{marker} {}\t{} game(s)\t{}",
            profile.name,
            profile.games.len(),
            profile.id
        );
    }
    Ok(())
}

fn list_games(profile: &Profile) -> Result<()> {
    println!("Apps & Games for {} • {}", profile.name, profile.games.len());
    for game in &profile.games {
        let kind = game
            .content
            .as_ref()
            .map(catalog::describe_content)
            .unwrap_or("None");
        println!("{}\t{}\t{}", game.name, kind, game.id);
    }
    Ok(())
}

fn print_user_agent(user_agent: Option<&str>) {
    if let Some(user_agent) = user_agent {
        println!("user agent {user_agent}");
    }
}
