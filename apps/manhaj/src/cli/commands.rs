//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command opens the catalog named by the effective [`Settings`].

use crate::api::{self, AppState};
use crate::config::{Backend, Settings, read_text_file};
use manhaj_core::{Catalog, ManhajError, NewUser, NodeId, Role, SeedManifest, SeedReport};
use serde::Serialize;
use std::path::Path;

/// Manifest applied by `init`, `server --seed` and `seed` without `--file`.
pub const DEFAULT_SEED: &str = include_str!("../../seed/default.toml");

// =============================================================================
// HELPERS
// =============================================================================

/// Open the catalog selected by `settings`.
pub fn open_catalog(settings: &Settings) -> Result<Catalog, ManhajError> {
    match settings.backend {
        Backend::Redb => Catalog::with_redb(&settings.database),
        Backend::Memory => Ok(Catalog::new()),
    }
}

/// Parse a TOML seed manifest from `file`, or the bundled one.
pub fn load_manifest(file: Option<&Path>) -> Result<SeedManifest, ManhajError> {
    let text = match file {
        Some(path) => read_text_file(path)?,
        None => DEFAULT_SEED.to_string(),
    };
    toml::from_str(&text).map_err(|e| ManhajError::Serialization(format!("seed manifest: {e}")))
}

fn print_json(value: &impl Serialize) -> Result<(), ManhajError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ManhajError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn print_seed_report(report: &SeedReport) {
    if report.is_noop() {
        println!("Seed already applied, nothing changed.");
        return;
    }
    println!("Users: {} inserted, {} skipped", report.users_inserted, report.users_skipped);
    println!(
        "Nodes: {} inserted, {} updated, {} unchanged",
        report.nodes_inserted, report.nodes_updated, report.nodes_unchanged
    );
    println!("Links: {} inserted, {} skipped", report.links_inserted, report.links_skipped);
    println!("Tags:  {} inserted, {} skipped", report.tags_inserted, report.tags_skipped);
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(settings: Settings, seed: bool) -> Result<(), ManhajError> {
    let catalog = open_catalog(&settings)?;
    if seed {
        let report = catalog.seed(&load_manifest(None)?)?;
        tracing::info!(
            nodes_inserted = report.nodes_inserted,
            links_inserted = report.links_inserted,
            "Bundled seed applied"
        );
    }

    let addr = settings.bind_address();
    println!("Manhaj Content Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Backend:  {}", settings.backend);
    if settings.backend == Backend::Redb {
        println!("  Database: {}", settings.database.display());
    }
    println!("  Locale:   {:?}", settings.locale);
    println!();
    println!("Endpoints:");
    println!("  GET  /topics                 - Landing page topics");
    println!("  GET  /nodes/{{id}}/children    - Children of a node");
    println!("  GET  /nodes/{{id}}/ancestors   - Breadcrumb");
    println!("  PATCH /nodes/{{id}}/status     - Workflow transition");
    println!("  GET  /tags                   - Curriculum lookup");
    println!("  GET  /health                 - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&addr, AppState::with_settings(catalog, settings)).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show catalog counters.
pub fn cmd_status(settings: &Settings, json_mode: bool) -> Result<(), ManhajError> {
    let metrics = open_catalog(settings)?.metrics()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": settings.database.to_string_lossy(),
            "backend": settings.backend,
            "metrics": metrics,
        }));
    }

    println!("Manhaj Catalog Status");
    println!("=====================");
    println!("Database: {}", settings.database.display());
    println!("Backend:  {}", settings.backend);
    println!();
    println!("Nodes:     {}", metrics.nodes);
    println!("  draft:     {}", metrics.by_status.draft);
    println!("  pending:   {}", metrics.by_status.pending);
    println!("  published: {}", metrics.by_status.published);
    println!("Links:     {}", metrics.links);
    println!("Tags:      {}", metrics.tags);
    println!("Users:     {}", metrics.users);

    Ok(())
}

// =============================================================================
// INIT / SEED COMMANDS
// =============================================================================

/// Create the database file and apply the bundled seed.
pub fn cmd_init(settings: &Settings, force: bool, json_mode: bool) -> Result<(), ManhajError> {
    if settings.backend != Backend::Redb {
        return Err(ManhajError::Validation(
            "init needs the redb backend; the memory backend has nothing to create".to_string(),
        ));
    }

    let path = &settings.database;
    if path.exists() {
        if !force {
            return Err(ManhajError::Conflict(format!(
                "database '{}' already exists. Use --force to overwrite.",
                path.display()
            )));
        }
        std::fs::remove_file(path).map_err(|e| {
            ManhajError::Storage(format!("cannot remove '{}': {e}", path.display()))
        })?;
    }

    let catalog = Catalog::with_redb(path)?;
    let report = catalog.seed(&load_manifest(None)?)?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": path.to_string_lossy(),
            "seed": report,
        }));
    }
    println!("Initialized new redb database at {}", path.display());
    print_seed_report(&report);
    Ok(())
}

/// Apply a seed manifest. Safe to repeat.
pub fn cmd_seed(settings: &Settings, file: Option<&Path>, json_mode: bool) -> Result<(), ManhajError> {
    let manifest = load_manifest(file)?;
    let report = open_catalog(settings)?.seed(&manifest)?;

    if json_mode {
        return print_json(&report);
    }
    print_seed_report(&report);
    Ok(())
}

// =============================================================================
// TAXONOMY COMMANDS
// =============================================================================

#[derive(Serialize)]
struct TreeRow<'a> {
    depth: usize,
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    title: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    repeated: bool,
}

/// Print the taxonomy outline, one node per line.
pub fn cmd_tree(settings: &Settings, root: Option<&str>, json_mode: bool) -> Result<(), ManhajError> {
    let root = root.map(NodeId::new);
    let outline = open_catalog(settings)?.outline(root.as_ref())?;

    if json_mode {
        let rows: Vec<TreeRow<'_>> = outline
            .iter()
            .map(|entry| TreeRow {
                depth: entry.depth,
                id: entry.node.id.as_str(),
                kind: entry.node.kind.as_str(),
                title: &entry.node.title,
                status: entry.node.status.as_str(),
                repeated: entry.repeated,
            })
            .collect();
        return print_json(&rows);
    }

    if outline.is_empty() {
        println!("(empty taxonomy)");
    }
    for entry in &outline {
        println!(
            "{}{} [{}] ({}, {}){}",
            "  ".repeat(entry.depth),
            entry.node.title,
            entry.node.id,
            entry.node.kind,
            entry.node.status,
            if entry.repeated { " ..." } else { "" }
        );
    }
    Ok(())
}

/// Print the breadcrumb of a node, root first.
pub fn cmd_path(settings: &Settings, id: &str, json_mode: bool) -> Result<(), ManhajError> {
    let path = open_catalog(settings)?.ancestors(&NodeId::new(id))?;

    if json_mode {
        let ids: Vec<&str> = path.iter().map(|n| n.id.as_str()).collect();
        return print_json(&ids);
    }

    let crumbs: Vec<String> = path
        .iter()
        .map(|n| format!("{} [{}]", n.title, n.id))
        .collect();
    println!("{}", crumbs.join(" › "));
    Ok(())
}

// =============================================================================
// USER COMMANDS
// =============================================================================

/// Register a user. The operator acts outside the admin checks.
pub fn cmd_user_add(
    settings: &Settings,
    name: String,
    email: String,
    password: String,
    role: Role,
    json_mode: bool,
) -> Result<(), ManhajError> {
    let user = open_catalog(settings)?.register_user(NewUser {
        name,
        email,
        password,
        role,
    })?;

    if json_mode {
        return print_json(&serde_json::json!({
            "id": user.id,
            "email": user.email,
            "role": user.role,
        }));
    }
    println!("Created {} user {} <{}>", user.role, user.id, user.email);
    Ok(())
}

/// List users, newest first.
pub fn cmd_user_list(settings: &Settings, json_mode: bool) -> Result<(), ManhajError> {
    let users = open_catalog(settings)?.users().list()?;

    if json_mode {
        return print_json(&users);
    }
    if users.is_empty() {
        println!("(no users)");
    }
    for user in &users {
        println!(
            "{}  {:<12} {:<32} {} nodes  {}",
            user.id, user.role, user.email, user.node_count, user.name
        );
    }
    Ok(())
}

/// Verify a password. Unknown emails and wrong passwords fail the same way.
pub fn cmd_user_check(
    settings: &Settings,
    email: &str,
    password: &str,
    json_mode: bool,
) -> Result<(), ManhajError> {
    let user = open_catalog(settings)?
        .users()
        .verify(email, password)?
        .ok_or_else(|| ManhajError::Forbidden("invalid email or password".to_string()))?;

    if json_mode {
        return print_json(&serde_json::json!({
            "id": user.id,
            "email": user.email,
            "role": user.role,
        }));
    }
    println!("Password matches {} user {} <{}>", user.role, user.id, user.email);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use manhaj_core::ErrorKind;

    fn redb_settings(dir: &tempfile::TempDir) -> Settings {
        Settings {
            database: dir.path().join("manhaj.redb"),
            ..Settings::default()
        }
    }

    #[test]
    fn bundled_manifest_parses() {
        let manifest = load_manifest(None).expect("bundled seed");
        assert_eq!(manifest.users.len(), 1);
        assert_eq!(manifest.users[0].role, Role::Admin);
        assert!(manifest.nodes.iter().any(|n| n.id.as_str() == "topic-math"));
        assert!(!manifest.tags.is_empty());
    }

    #[test]
    fn bundled_seed_builds_breadcrumbs() {
        let catalog = Catalog::new();
        catalog.seed(&load_manifest(None).expect("seed")).expect("apply");

        let path: Vec<String> = catalog
            .ancestors(&NodeId::new("art-pythagoras"))
            .expect("path")
            .into_iter()
            .map(|n| n.id.0)
            .collect();
        assert_eq!(path, ["topic-math", "topic-geometry", "topic-triangles", "art-pythagoras"]);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = redb_settings(&dir);

        cmd_init(&settings, false, true).expect("first init");
        let err = cmd_init(&settings, false, true).expect_err("exists");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        cmd_init(&settings, true, true).expect("forced");

        let metrics = open_catalog(&settings).expect("open").metrics().expect("metrics");
        assert_eq!(metrics.users, 1);
        assert!(metrics.persistent);
    }

    #[test]
    fn init_rejects_memory_backend() {
        let settings = Settings {
            backend: Backend::Memory,
            ..Settings::default()
        };
        let err = cmd_init(&settings, false, true).expect_err("memory");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn user_check_reads_persisted_hash() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = redb_settings(&dir);

        cmd_user_add(
            &settings,
            "Huda".to_string(),
            "huda@example.com".to_string(),
            "secret123".to_string(),
            Role::Contributor,
            true,
        )
        .expect("add");

        cmd_user_check(&settings, "HUDA@example.com", "secret123", true).expect("matches");
        for (email, password) in [("huda@example.com", "secret124"), ("nobody@example.com", "secret123")] {
            let err = cmd_user_check(&settings, email, password, true).expect_err("rejected");
            assert_eq!(err.kind(), ErrorKind::Forbidden);
        }
    }

    #[test]
    fn bundled_admin_password_verifies() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = redb_settings(&dir);
        cmd_init(&settings, false, true).expect("init");
        cmd_user_check(&settings, "admin@manhaj.local", "admin123", true).expect("admin");
    }

    #[test]
    fn seed_file_is_applied() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("seed.toml");
        std::fs::write(
            &file,
            "[[nodes]]\nid = \"topic-x\"\ntype = \"topic\"\ntitle = \"X\"\n",
        )
        .expect("write");

        let settings = redb_settings(&dir);
        cmd_seed(&settings, Some(&file), true).expect("seed");
        cmd_seed(&settings, Some(&file), true).expect("reseed");

        let catalog = open_catalog(&settings).expect("open");
        assert_eq!(catalog.metrics().expect("metrics").nodes, 1);
    }
}
