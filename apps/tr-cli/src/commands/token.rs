// token.rs — Token subcommands: show, provision, regenerate, verify.

use clap::Subcommand;
use serde::Serialize;
use tr_workspace::{AuthorizationGate, SettingsStore, TokenAuthority, TokenView, WorkspaceId};

use super::print_json;
use crate::config::ReporterConfig;

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Show the workspace's settings id and API access token.
    Show {
        #[arg(long)]
        workspace: WorkspaceId,
    },
    /// Create the workspace's settings row and first token.
    Provision {
        #[arg(long)]
        workspace: WorkspaceId,
    },
    /// Replace the workspace's token. Requires the ADMIN role.
    Regenerate {
        #[arg(long)]
        workspace: WorkspaceId,
        /// Principal performing the rotation, looked up in `[[members]]`.
        #[arg(long = "as")]
        principal: String,
    },
    /// Check Basic credentials and print the workspace they unlock.
    Verify {
        /// Base64 `settings_id:token`, with or without the `Basic ` prefix.
        credentials: String,
    },
}

/// Token view plus the ready-made Basic credentials.
#[derive(Serialize)]
struct TokenOutput {
    #[serde(flatten)]
    view: TokenView,
    basic_credentials: String,
}

impl From<TokenView> for TokenOutput {
    fn from(view: TokenView) -> Self {
        Self {
            basic_credentials: view.basic_credentials(),
            view,
        }
    }
}

pub fn execute(cmd: &TokenCommands, config: &ReporterConfig, json: bool) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let authority = config.token_authority(&db);

    match cmd {
        TokenCommands::Show { workspace } => show_token(&authority, *workspace, json),
        TokenCommands::Provision { workspace } => provision_token(&authority, *workspace, json),
        TokenCommands::Regenerate {
            workspace,
            principal,
        } => regenerate_token(&authority, &config.role_gate(), *workspace, principal, json),
        TokenCommands::Verify { credentials } => verify_credentials(&authority, credentials, json),
    }
}

fn print_view(view: TokenView, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&TokenOutput::from(view));
    }
    println!("Workspace: {}", view.workspace_id);
    println!("Settings:  {}", view.settings_id);
    println!("Token:     {}", view.api_access_token);
    println!("Basic:     {}", view.basic_credentials());
    Ok(())
}

fn show_token<S: SettingsStore + ?Sized>(
    authority: &TokenAuthority<S>,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    let view = authority.get_token_view(workspace_id)?.ok_or_else(|| {
        anyhow::anyhow!(
            "workspace {workspace_id} has no settings (run `tr token provision --workspace {workspace_id}`)"
        )
    })?;
    print_view(view, json)
}

fn provision_token<S: SettingsStore + ?Sized>(
    authority: &TokenAuthority<S>,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    print_view(authority.provision(workspace_id)?, json)
}

fn regenerate_token<S: SettingsStore + ?Sized>(
    authority: &TokenAuthority<S>,
    gate: &dyn AuthorizationGate,
    workspace_id: WorkspaceId,
    principal: &str,
    json: bool,
) -> anyhow::Result<()> {
    let view = authority
        .regenerate_token_as(workspace_id, principal, gate)?
        .ok_or_else(|| anyhow::anyhow!("workspace {workspace_id} has no settings"))?;
    if !json {
        println!("Token rotated; the previous token no longer authenticates.");
    }
    print_view(view, json)
}

fn verify_credentials<S: SettingsStore + ?Sized>(
    authority: &TokenAuthority<S>,
    credentials: &str,
    json: bool,
) -> anyhow::Result<()> {
    let workspace = authority.authenticate_basic(credentials)?;
    if json {
        print_json(&serde_json::json!({ "workspace_id": workspace }))?;
    } else if let Some(id) = workspace {
        println!("Credentials valid for workspace {}.", id);
    }
    if workspace.is_none() {
        anyhow::bail!("credentials rejected");
    }
    Ok(())
}
