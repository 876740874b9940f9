//! `tickr plugin` 명령 처리

use anyhow::{bail, Context};
use clap::Subcommand;
use serde_json::{json, Value};
use std::sync::Arc;
use tickr_core::plugin::ENABLED_PLUGINS_KEY;
use tickr_core::{PluginInstaller, PluginManager, PluginUpdater, UpdateCandidate};
use tickr_foundation::{ConfigAccess, EventBus, PluginSettings};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PluginCommand {
    /// Install a plugin (user/repo, user/repo:subdir, URL or local path)
    Install {
        source: String,

        /// Subdirectory inside the source that holds the plugin
        #[arg(long)]
        subpath: Option<String>,
    },
    /// Remove an installed plugin
    Uninstall { name: String },
    /// List installed plugins
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the plugins available in a catalog
    Catalog {
        /// Catalog repository (defaults to the configured catalog)
        repo: Option<String>,
    },
    /// Check installed plugins against a catalog
    CheckUpdates {
        repo: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Update one plugin, or all of them with --all
    Update {
        name: Option<String>,

        #[arg(long, conflicts_with = "name")]
        all: bool,

        /// Catalog repository to check against
        #[arg(long)]
        repo: Option<String>,
    },
    /// List every loadable plugin name
    Discover,
    /// Enable a plugin on next start
    Enable { name: String },
    /// Disable a plugin on next start
    Disable { name: String },
}

/// 플러그인 명령 실행기
pub struct PluginCli {
    config: Arc<dyn ConfigAccess>,
    settings: PluginSettings,
    installer: Arc<PluginInstaller>,
    events: EventBus,
}

impl PluginCli {
    pub fn new(config: Arc<dyn ConfigAccess>) -> anyhow::Result<Self> {
        let settings = PluginSettings::from_config(config.as_ref());
        let events = EventBus::new();
        let installer = PluginInstaller::new(settings.clone())
            .with_context(|| format!("cannot prepare {}", settings.install_dir.display()))?
            .with_events(events.clone());

        Ok(Self {
            config,
            settings,
            installer: Arc::new(installer),
            events,
        })
    }

    pub fn installer(&self) -> &PluginInstaller {
        &self.installer
    }

    fn manager(&self) -> PluginManager {
        PluginManager::from_settings(&self.settings, Arc::clone(&self.config), self.events.clone())
    }

    pub async fn run(&self, command: PluginCommand) -> anyhow::Result<()> {
        match command {
            PluginCommand::Install { source, subpath } => {
                let outcome = self
                    .installer
                    .install_from_source(&source, subpath.as_deref())
                    .await?;
                println!("{}", outcome.message());
            }
            PluginCommand::Uninstall { name } => {
                self.installer.uninstall(&name).await?;
                self.set_enabled(&name, false)?;
                println!("Uninstalled plugin '{}'", name);
            }
            PluginCommand::List { json } => self.list(json),
            PluginCommand::Catalog { repo } => {
                let repo = repo.unwrap_or_else(|| self.settings.catalog_repository.clone());
                let entries = self.installer.fetch_catalog(&repo).await?;
                if entries.is_empty() {
                    println!("No plugins in {}", repo);
                }
                for entry in entries {
                    println!("{:<20} {:<10} {}", entry.name, entry.version, entry.description);
                    if !entry.repository.is_empty() {
                        println!("{:<31} tickr plugin install {}", "", entry.install_locator());
                    }
                }
            }
            PluginCommand::CheckUpdates { repo, json } => {
                let updates = self.installer.check_for_updates(repo.as_deref()).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&updates)?);
                } else {
                    print_updates(&updates);
                }
            }
            PluginCommand::Update { name, all, repo } => self.update(name, all, repo).await?,
            PluginCommand::Discover => {
                for name in self.manager().discover() {
                    println!("{}", name);
                }
            }
            PluginCommand::Enable { name } => {
                if !self.manager().discover().contains(&name) {
                    bail!("Plugin '{}' was not found in any plugin directory", name);
                }
                self.set_enabled(&name, true)?;
                println!("Enabled plugin '{}'", name);
            }
            PluginCommand::Disable { name } => {
                self.set_enabled(&name, false)?;
                println!("Disabled plugin '{}'", name);
            }
        }
        Ok(())
    }

    fn list(&self, as_json: bool) {
        let installed = self.installer.list_installed();
        let enabled = self.enabled_names();

        if as_json {
            let rows: Vec<Value> = installed
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name(),
                        "version": p.version(),
                        "author": p.manifest.author,
                        "description": p.manifest.description,
                        "path": p.path,
                        "enabled": enabled.iter().any(|n| n == p.name()),
                    })
                })
                .collect();
            println!("{}", Value::Array(rows));
            return;
        }

        if installed.is_empty() {
            println!("No plugins installed in {}", self.settings.install_dir.display());
            return;
        }
        for plugin in installed {
            let marker = if enabled.iter().any(|n| n == plugin.name()) { "*" } else { " " };
            println!(
                "{} {:<20} {:<10} {}",
                marker,
                plugin.name(),
                plugin.version(),
                plugin.manifest.description.as_deref().unwrap_or("")
            );
        }
    }

    async fn update(&self, name: Option<String>, all: bool, repo: Option<String>) -> anyhow::Result<()> {
        let updater = PluginUpdater::new(Arc::clone(&self.installer));
        let mut manager = self.manager();

        if let Some(name) = name {
            let outcome = updater
                .update_by_name(&mut manager, &name, repo.as_deref())
                .await?;
            println!("{}", outcome.message());
            return Ok(());
        }

        if !all {
            bail!("Specify a plugin name or --all");
        }

        let candidates = updater.check(repo.as_deref()).await?;
        if candidates.is_empty() {
            println!("All plugins are up to date");
            return Ok(());
        }

        let mut failed = 0;
        for (name, result) in updater.apply_all(&mut manager, &candidates).await {
            match result {
                Ok(outcome) => println!("{}", outcome.message()),
                Err(e) => {
                    failed += 1;
                    eprintln!("Failed to update '{}': {}", name, e);
                }
            }
        }
        if failed > 0 {
            bail!("{} of {} update(s) failed", failed, candidates.len());
        }
        Ok(())
    }

    fn enabled_names(&self) -> Vec<String> {
        self.config
            .get(ENABLED_PLUGINS_KEY)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> anyhow::Result<()> {
        let mut names = self.enabled_names();
        let present = names.iter().any(|n| n == name);
        match (enabled, present) {
            (true, false) => names.push(name.to_string()),
            (false, true) => names.retain(|n| n != name),
            _ => return Ok(()),
        }
        self.config.set(ENABLED_PLUGINS_KEY, json!(names));
        self.config.save()?;
        Ok(())
    }
}

fn print_updates(updates: &[UpdateCandidate]) {
    if updates.is_empty() {
        println!("All plugins are up to date");
        return;
    }
    for update in updates {
        println!(
            "{:<20} {} -> {}  {}",
            update.name, update.current_version, update.latest_version, update.description
        );
    }
}
