//! MCP tool definitions for vault reads and writes.
//!
//! Every call lists the vault and builds a fresh index snapshot, so tools
//! always see files written by other clients.

use std::path::PathBuf;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use tracing::debug;

use vaultlink_core::VaultlinkConfig;
use vaultlink_vault::templates::{self, ProjectTemplate};
use vaultlink_vault::{DocumentPipeline, FsVault};

/// vaultlink MCP server over one vault directory.
#[derive(Debug, Clone)]
pub struct VaultlinkMcpService {
    /// Path to the vault directory.
    pub vault_path: PathBuf,
    config: VaultlinkConfig,
    tool_router: ToolRouter<Self>,
}

impl VaultlinkMcpService {
    /// Create a server for `vault_path` with the given config.
    pub fn new(vault_path: PathBuf, config: VaultlinkConfig) -> Self {
        Self {
            vault_path,
            config,
            tool_router: Self::tool_router(),
        }
    }

    fn open_pipeline(&self) -> Result<DocumentPipeline<FsVault>, String> {
        let storage = FsVault::new(&self.vault_path).with_ignore(self.config.vault.ignore.clone());
        DocumentPipeline::open(storage, self.config.pipeline_options())
            .map_err(|e| format!("Failed to open vault: {e}"))
    }
}

fn error_json(message: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(error_json)
}

// === Tool request types ===

/// Request naming one vault file.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileRequest {
    /// Path relative to the vault root (e.g., "Research/article.md")
    pub filepath: String,
}

/// Request naming several vault files.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BatchRequest {
    /// Paths relative to the vault root
    pub filepaths: Vec<String>,
}

/// Request carrying content for a file.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ContentRequest {
    /// Path relative to the vault root
    pub filepath: String,
    /// Markdown content; links are normalized before storing
    pub content: String,
}

/// Request to merge front-matter fields.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FrontmatterUpdateRequest {
    /// Path relative to the vault root
    pub filepath: String,
    /// Fields to set; existing keys keep their position
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Request to remove one front-matter field.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FrontmatterDeleteRequest {
    /// Path relative to the vault root
    pub filepath: String,
    /// Key to remove
    pub field: String,
}

/// Request for a vault-wide normalization pass.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NormalizeRequest {
    /// Report changes without writing (default: true)
    pub dry_run: Option<bool>,
}

/// Request to repoint links after a file moves.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateLinksRequest {
    /// Previous path relative to the vault root
    pub old_path: String,
    /// New path relative to the vault root
    pub new_path: String,
}

/// Request to scaffold a project.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProjectRequest {
    /// Project name or path; "Projects/" is prepended when missing
    pub base_path: String,
    /// "research_project" (default) or "simple"
    pub template: Option<String>,
}

/// Request for a daily progress note.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DailyNoteRequest {
    /// Project name or path; "Projects/" is prepended when missing
    pub project_path: String,
    /// Date in YYYY-MM-DD format (default: today)
    pub date: Option<String>,
}

#[tool_router]
impl VaultlinkMcpService {
    /// List every file in the vault.
    #[tool(description = "List all files in the vault, as paths relative to the vault root")]
    fn vault_list_files(&self) -> String {
        match self.open_pipeline() {
            Ok(pipeline) => to_json(&pipeline.list_files()),
            Err(e) => error_json(e),
        }
    }

    /// Read one file, with front-matter instructions shown first.
    #[tool(
        description = "Read a file. If its front matter carries instructions (mode, instructions, stage, status), a banner with them precedes the content and must be followed"
    )]
    fn vault_get_file_contents(&self, Parameters(req): Parameters<FileRequest>) -> String {
        let pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.read(&req.filepath) {
            Ok(presented) => presented.text(),
            Err(e) => error_json(e),
        }
    }

    /// Read several files in one call.
    #[tool(
        description = "Read several files, each under a FILE header. Instruction banners are included per file; unreadable files get an error line"
    )]
    fn vault_batch_get_file_contents(&self, Parameters(req): Parameters<BatchRequest>) -> String {
        match self.open_pipeline() {
            Ok(pipeline) => pipeline.read_batch(&req.filepaths),
            Err(e) => error_json(e),
        }
    }

    /// Create or replace a file.
    #[tool(
        description = "Create or replace a file. Links to existing notes are rewritten to [[name]] form before storing"
    )]
    fn vault_put_content(&self, Parameters(req): Parameters<ContentRequest>) -> String {
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.write(&req.filepath, &req.content) {
            Ok(outcome) => to_json(&outcome),
            Err(e) => error_json(e),
        }
    }

    /// Append to a file.
    #[tool(description = "Append content to a file, creating it if missing. Links are normalized")]
    fn vault_append_content(&self, Parameters(req): Parameters<ContentRequest>) -> String {
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.append(&req.filepath, &req.content) {
            Ok(outcome) => to_json(&outcome),
            Err(e) => error_json(e),
        }
    }

    /// Front matter of a file as JSON.
    #[tool(description = "Get the YAML front matter of a file as a JSON object")]
    fn vault_get_frontmatter(&self, Parameters(req): Parameters<FileRequest>) -> String {
        let pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.front_matter(&req.filepath) {
            Ok(fields) => to_json(&fields),
            Err(e) => error_json(e),
        }
    }

    /// Merge fields into a file's front matter.
    #[tool(
        description = "Set front-matter fields on a file, creating the front matter if needed. Other fields are kept"
    )]
    fn vault_update_frontmatter(
        &self,
        Parameters(req): Parameters<FrontmatterUpdateRequest>,
    ) -> String {
        let updates = match serde_yaml::to_value(&req.fields) {
            Ok(serde_yaml::Value::Mapping(m)) => m,
            Ok(_) => Mapping::new(),
            Err(e) => return error_json(format!("Invalid fields: {e}")),
        };
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.update_front_matter(&req.filepath, updates) {
            Ok(outcome) => to_json(&outcome),
            Err(e) => error_json(e),
        }
    }

    /// Remove one front-matter field.
    #[tool(
        description = "Remove a field from a file's front matter. The front matter is dropped once empty"
    )]
    fn vault_delete_frontmatter_field(
        &self,
        Parameters(req): Parameters<FrontmatterDeleteRequest>,
    ) -> String {
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.delete_front_matter_field(&req.filepath, &req.field) {
            Ok(removed) => to_json(&serde_json::json!({
                "path": req.filepath,
                "field": req.field,
                "removed": removed,
            })),
            Err(e) => error_json(e),
        }
    }

    /// Links in a file with their resolution status.
    #[tool(
        description = "List the links in a file (front matter and body) with their target and status: resolved, unresolved, ambiguous or external"
    )]
    fn vault_get_links(&self, Parameters(req): Parameters<FileRequest>) -> String {
        let pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.links(&req.filepath) {
            Ok(entries) => to_json(&entries),
            Err(e) => error_json(e),
        }
    }

    /// Files linking to one file.
    #[tool(
        description = "List the files whose links resolve to the given file, with the matching links"
    )]
    fn vault_get_backlinks(&self, Parameters(req): Parameters<FileRequest>) -> String {
        let pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.backlinks(&req.filepath) {
            Ok(backlinks) => to_json(&serde_json::json!({
                "filepath": req.filepath,
                "backlinks": backlinks,
            })),
            Err(e) => error_json(e),
        }
    }

    /// Repoint links after a rename.
    #[tool(
        description = "After moving or renaming a file, rewrite every link to old_path so it points at new_path. Does not move the file itself"
    )]
    fn vault_update_links(&self, Parameters(req): Parameters<UpdateLinksRequest>) -> String {
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.update_links(&req.old_path, &req.new_path) {
            Ok(report) => to_json(&report),
            Err(e) => error_json(e),
        }
    }

    /// Normalize links across the vault.
    #[tool(
        description = "Normalize links in every markdown file of the vault. Defaults to a dry run that only reports what would change"
    )]
    fn vault_normalize(&self, Parameters(req): Parameters<NormalizeRequest>) -> String {
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match pipeline.normalize_vault(req.dry_run.unwrap_or(true)) {
            Ok(report) => to_json(&report),
            Err(e) => error_json(e),
        }
    }

    /// Scaffold a project folder.
    #[tool(
        description = "Create a project inside Projects/. Templates: 'research_project' (Chats/, Research/, Daily Progress/ and a thinking-mode index) or 'simple' (just an index)"
    )]
    fn vault_create_project(&self, Parameters(req): Parameters<ProjectRequest>) -> String {
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        let template = ProjectTemplate::from_name(req.template.as_deref().unwrap_or_default());
        match templates::create_project(&mut pipeline, &req.base_path, template) {
            Ok(created) => to_json(&created),
            Err(e) => error_json(e),
        }
    }

    /// Create a daily progress note.
    #[tool(
        description = "Create a daily progress note at <project>/Daily Progress/daily_progress_YYYY_MM_DD.md"
    )]
    fn vault_create_daily_progress(&self, Parameters(req): Parameters<DailyNoteRequest>) -> String {
        let date = match req.date.as_deref().map(templates::parse_date).transpose() {
            Ok(date) => date,
            Err(e) => return error_json(e),
        };
        let mut pipeline = match self.open_pipeline() {
            Ok(p) => p,
            Err(e) => return error_json(e),
        };
        match templates::create_daily_note(&mut pipeline, &req.project_path, date) {
            Ok(path) => {
                debug!(path = %path, "daily progress note created");
                to_json(&serde_json::json!({ "path": path }))
            }
            Err(e) => error_json(e),
        }
    }
}

#[tool_handler]
impl ServerHandler for VaultlinkMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Markdown vault server. Reads show front-matter instructions as a banner \
                 before the content; follow them. Writes rewrite links to existing notes \
                 into [[name]] form."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
