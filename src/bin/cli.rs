use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use gatekeeper::authz::{Authorizer, ElevatedLevel, Identity, Permission, Registry};

#[derive(Parser, Debug)]
#[command(author, version, about = "gatekeeper registry and decision tool", long_about = None)]
struct Cli {
    /// Registry file; falls back to REGISTRY_PATH, then config/registry.json
    #[arg(long, global = true)]
    registry: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the registry and report configuration warnings
    Validate,
    /// Explain whether an identity holds a permission
    Check {
        /// JSON file containing the identity
        #[arg(long)]
        identity: PathBuf,
        #[arg(long)]
        permission: String,
    },
    /// Check page access for a route
    Page {
        #[arg(long)]
        identity: PathBuf,
        #[arg(long)]
        route: String,
    },
    /// Show the data access level for a data type
    Level {
        #[arg(long)]
        identity: PathBuf,
        #[arg(long)]
        data_type: String,
    },
    /// List effective permissions and elevated levels
    Effective {
        #[arg(long)]
        identity: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let registry_path = cli
        .registry
        .or_else(|| std::env::var("REGISTRY_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config/registry.json"));

    let registry = Registry::load(&registry_path)
        .with_context(|| format!("failed to load registry from {}", registry_path.display()))?;
    let authz = Authorizer::new(Arc::new(registry));

    match cli.command {
        Commands::Validate => {
            let warnings = authz.registry().lint();
            println!(
                "{}: {} roles, {} routes, {} data types",
                registry_path.display(),
                authz.registry().roles().count(),
                authz.registry().routes().len(),
                authz.registry().data_types().len()
            );
            if warnings.is_empty() {
                println!("no warnings");
            }
            for warning in warnings {
                println!("warning: {}", warning);
            }
        }
        Commands::Check { identity, permission } => {
            let identity = read_identity(&identity)?;
            let permission = Permission::parse(&permission)?;
            let result = authz.check_permission_with_reason(Some(&identity), &permission);
            println!(
                "{:<8} {} ({})",
                if result.allowed { "allow" } else { "deny" },
                permission,
                result.reason
            );
        }
        Commands::Page { identity, route } => {
            let identity = read_identity(&identity)?;
            let allowed = authz.has_page_access(Some(&identity), &route);
            let guard = gatekeeper::authz::resolve_route(authz.registry(), &route)
                .map(|guard| guard.path.as_str())
                .unwrap_or("(no guard)");
            println!("{:<8} {} via {}", if allowed { "allow" } else { "deny" }, route, guard);
        }
        Commands::Level { identity, data_type } => {
            let identity = read_identity(&identity)?;
            let level = authz.get_data_access_level(Some(&identity), &data_type);
            println!("{} {}", data_type, level.as_str());
        }
        Commands::Effective { identity } => {
            let identity = read_identity(&identity)?;
            if let Some(effective) = authz.effective_permissions(Some(&identity)) {
                println!("{:<32} {:<8} {}", "Permission", "Source", "Role");
                for perm in effective.permissions {
                    let source = match perm.source {
                        gatekeeper::authz::GrantSource::Role => "role",
                        gatekeeper::authz::GrantSource::Direct => "direct",
                    };
                    let role = perm.role_name.map(|r| r.as_str()).unwrap_or("-");
                    println!("{:<32} {:<8} {}", perm.name, source, role);
                }
            }
            for level in [ElevatedLevel::Admin, ElevatedLevel::Manager, ElevatedLevel::TeamLead] {
                println!("{:<10} {}", level.as_str(), authz.has_elevated_access(Some(&identity), level));
            }
        }
    }

    Ok(())
}

fn read_identity(path: &Path) -> anyhow::Result<Identity> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read identity at {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid identity in {}", path.display()))
}
