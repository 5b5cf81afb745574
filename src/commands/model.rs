//! Model command - Manage embedding models in the local cache
//!
//! Models are downloaded to `~/.kbase/cache/models/`.
//! Provenance tracked in `~/.kbase/models.lock`.

use anyhow::Result;
use kbase::embeddings::{EngineKind, ModelRegistry};
use kbase::models::{self, ModelLock, ModelStatus};
use kbase::paths;

/// Model CLI subcommands
#[derive(Debug, Clone, clap::Subcommand)]
pub enum ModelCommands {
    /// List available models with download status
    List,

    /// Download a model to cache
    Add {
        /// Model name (from registry)
        name: String,
    },

    /// Show where a model is and where it came from
    Status {
        /// Model name (default: configured model)
        name: Option<String>,
    },
}

/// Execute model command from CLI
pub fn execute_cli(command: Option<ModelCommands>) -> Result<()> {
    match command {
        Some(cmd) => execute(cmd),
        None => execute(ModelCommands::List),
    }
}

/// Execute model command
pub fn execute(command: ModelCommands) -> Result<()> {
    match command {
        ModelCommands::List => list(),
        ModelCommands::Add { name } => add(&name),
        ModelCommands::Status { name } => status(name.as_deref()),
    }
}

/// List available models with download status
fn list() -> Result<()> {
    let registry = ModelRegistry::builtin()?;
    let default = registry.default_model().id.clone();

    println!("📦 Available Models\n");
    println!("{:<26} {:>6} {:>8}  STATUS", "NAME", "DIMS", "ENGINE");
    println!("{}", "─".repeat(60));

    for name in registry.names() {
        let status = models::model_status(name)?;
        let marker = if name == default { "*" } else { " " };
        println!(
            "{}{:<25} {:>6} {:>8}  {}",
            marker,
            name,
            status.dimensions,
            engine_label(status.engine),
            format_status(&status)
        );
    }

    println!("\n* default");
    println!("Cache: {}", paths::models::cache_dir().display());
    Ok(())
}

fn engine_label(engine: EngineKind) -> &'static str {
    match engine {
        EngineKind::Onnx => "onnx",
        EngineKind::Hashing => "hashing",
    }
}

fn format_status(status: &ModelStatus) -> String {
    if status.engine == EngineKind::Hashing {
        return "✓ built-in".to_string();
    }
    match (&status.location, &status.provenance) {
        (Some(_), Some(prov)) => {
            let date = prov
                .downloaded
                .split('T')
                .next()
                .unwrap_or(&prov.downloaded);
            format!("✓ cached ({})", date)
        }
        (Some(_), None) => "✓ local".to_string(),
        (None, _) => "not downloaded".to_string(),
    }
}

/// Download a model to cache
fn add(name: &str) -> Result<()> {
    let status = models::model_status(name)?;
    if status.engine == EngineKind::Hashing {
        println!("Model '{}' is built in; nothing to download.", name);
        return Ok(());
    }
    if status.available {
        println!("Model '{}' already available.", name);
        if let Some(location) = &status.location {
            println!("  Location: {}", location.display());
        }
        return Ok(());
    }

    let dir = models::add_model(name)?;
    println!("✓ Model '{}' ready at {}", name, dir.display());
    Ok(())
}

/// Show status for one model (the configured one by default)
fn status(name: Option<&str>) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => kbase::Settings::load()?.embeddings.model,
    };
    let status = models::model_status(&name)?;

    println!("📊 Model Status\n");
    println!("  Model:      {}", status.name);
    println!("  Engine:     {}", engine_label(status.engine));
    println!("  Dimensions: {}", status.dimensions);
    println!("  Status:     {}", format_status(&status));
    if let Some(location) = &status.location {
        println!("  Location:   {}", location.display());
    }
    if let Some(prov) = &status.provenance {
        println!("  Downloaded: {}", prov.downloaded);
        println!("  Size:       {} MB", prov.size_bytes / (1024 * 1024));
        println!("  SHA-256:    {}", prov.sha256_model);
    }

    if !status.available {
        println!("\n  Run: kbase model add {}", status.name);
    }

    let lock = ModelLock::load(&paths::models::lock_path())?;
    if !lock.is_empty() {
        println!("\nCached: {}", lock.names().join(", "));
    }
    Ok(())
}
