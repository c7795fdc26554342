//! `api migrate add <name>` and `api migrate rollback --steps=<n> [--yes]`.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPool;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const ADD_USAGE: &str = "Usage: api migrate add <name>";
const ROLLBACK_USAGE: &str = "Usage: api migrate rollback --steps=<n> [--yes]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCommand {
    Add { name: String },
    Rollback { steps: u32, yes: bool },
}

/// `Ok(None)` when the arguments are not a `migrate` subcommand.
pub fn parse_command(args: &[String]) -> Result<Option<MigrationCommand>> {
    if args.first().map(String::as_str) != Some("migrate") {
        return Ok(None);
    }

    match args.get(1).map(String::as_str) {
        Some("add") => {
            let name = args
                .get(2)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!(ADD_USAGE))?
                .to_owned();

            Ok(Some(MigrationCommand::Add { name }))
        }
        Some("rollback") => {
            let mut steps: u32 = 1;
            let mut yes = false;

            for arg in &args[2..] {
                if arg == "--yes" || arg == "-y" {
                    yes = true;
                } else if let Some(raw_steps) = arg.strip_prefix("--steps=") {
                    steps = raw_steps
                        .parse::<u32>()
                        .context("--steps must be a positive integer")?;
                } else {
                    return Err(anyhow!("Unknown argument: {arg}. {ROLLBACK_USAGE}"));
                }
            }

            if steps == 0 {
                return Err(anyhow!("--steps must be at least 1"));
            }

            Ok(Some(MigrationCommand::Rollback { steps, yes }))
        }
        _ => Err(anyhow!("Unknown migrate command. Supported: add, rollback")),
    }
}

pub fn migrations_dir() -> PathBuf {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../database/migrations");
    dir.canonicalize().unwrap_or(dir)
}

pub async fn execute(command: MigrationCommand, pool: &PgPool) -> Result<()> {
    match command {
        MigrationCommand::Add { name } => add_reversible_migration(&migrations_dir(), &name).map(|_| ()),
        MigrationCommand::Rollback { steps, yes } => rollback_migrations(pool, steps, yes).await,
    }
}

/// Writes `<version>_<slug>.up.sql` and `.down.sql`, returning the up path.
fn add_reversible_migration(dir: &Path, name: &str) -> Result<PathBuf> {
    let slug = slugify_name(name);
    if slug.is_empty() {
        return Err(anyhow!("Migration name must include letters or numbers"));
    }

    let version = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let up_path = dir.join(format!("{version}_{slug}.up.sql"));
    let down_path = dir.join(format!("{version}_{slug}.down.sql"));

    if up_path.exists() || down_path.exists() {
        return Err(anyhow!("Migration already exists: {}", up_path.display()));
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed creating {}", dir.display()))?;

    fs::write(
        &up_path,
        format!(
            "-- Migration: {slug}\n-- Created: {}\n\n",
            Utc::now().to_rfc3339()
        ),
    )
    .with_context(|| format!("Failed writing {}", up_path.display()))?;

    fs::write(&down_path, format!("-- Revert: {slug}\n\n"))
        .with_context(|| format!("Failed writing {}", down_path.display()))?;

    println!(
        "Created reversible migration {version}_{slug} in {}",
        dir.display()
    );

    Ok(up_path)
}

async fn rollback_migrations(pool: &PgPool, steps: u32, yes: bool) -> Result<()> {
    let applied = sqlx::query_as::<_, (i64, String)>(
        "SELECT version, description FROM _sqlx_migrations ORDER BY version DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to inspect applied migrations")?;

    let steps = steps as usize;
    if applied.is_empty() {
        println!("No applied migrations found. Nothing to rollback.");
        return Ok(());
    }

    let to_rollback = &applied[..steps.min(applied.len())];
    // `undo` reverts everything newer than the target.
    let target_version = applied.get(steps).map(|(version, _)| *version).unwrap_or(0);

    println!("The following migrations will be rolled back:");
    for (version, description) in to_rollback {
        println!("  - {version}: {description}");
    }

    if !yes && !confirm(to_rollback.len())? {
        println!("Rollback cancelled.");
        return Ok(());
    }

    let migrator = Migrator::new(migrations_dir())
        .await
        .context("Failed to load migrations from disk")?;

    migrator
        .undo(pool, target_version)
        .await
        .map_err(|error| anyhow!("Rollback failed: {error}"))?;

    let latest = sqlx::query_scalar::<_, i64>(
        "SELECT version FROM _sqlx_migrations ORDER BY version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .context("Failed verifying post-rollback migration state")?;

    let expected = (target_version > 0).then_some(target_version);
    if latest != expected {
        return Err(anyhow!(
            "Rollback verification failed. Expected latest version {:?}, got {:?}",
            expected,
            latest
        ));
    }

    tracing::info!(reverted = to_rollback.len(), latest = ?latest, "migrations rolled back");
    println!(
        "Rollback successful. Reverted {} migration(s); latest version is {:?}.",
        to_rollback.len(),
        latest
    );

    Ok(())
}

fn confirm(count: usize) -> Result<bool> {
    print!("Continue rollback of {count} migration(s)? [y/N]: ");
    io::stdout().flush().ok();

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read rollback confirmation")?;

    Ok(matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn slugify_name(name: &str) -> String {
    let mut slug = String::new();
    let mut previous_was_separator = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            previous_was_separator = false;
        } else if !previous_was_separator {
            slug.push('_');
            previous_was_separator = true;
        }
    }

    slug.trim_matches('_').to_string()
}
