//! Project scaffolding and daily progress notes.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use vaultlink_core::error::{Result, VaultlinkError};

use crate::pipeline::DocumentPipeline;
use crate::storage::VaultStorage;

/// Folder that holds every project.
pub const PROJECTS_ROOT: &str = "Projects";

const DAILY_FOLDER: &str = "Daily Progress";
const PLACEHOLDER: &str = ".placeholder";

const THINKING_INSTRUCTIONS: &str = concat!(
    "  CRITICAL: I am in THINKING mode, not WRITING mode.\n",
    "\n",
    "  DO NOT write articles, guides, or drafts for me.\n",
    "  Only help me explore and deepen my thinking about this project.\n",
    "\n",
    "  Your role is to:\n",
    "  - Ask me probing questions to clarify my thoughts\n",
    "  - Help me identify patterns and connections\n",
    "  - Challenge my assumptions constructively\n",
    "  - Suggest areas to explore further\n",
    "  - Summarize what I've learned so far\n",
    "  - Organize research materials\n",
    "\n",
    "  You are my thinking partner, not my ghostwriter.\n",
);

/// Project layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectTemplate {
    /// `Chats/`, `Research/`, `Daily Progress/`, a README and a
    /// thinking-mode index.
    #[default]
    ResearchProject,
    /// Just an index with the creation date.
    Simple,
}

impl ProjectTemplate {
    /// Look a template up by name. Unknown names fall back to
    /// [`ProjectTemplate::ResearchProject`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "simple" => Self::Simple,
            "research_project" | "" => Self::ResearchProject,
            other => {
                warn!(template = other, "unknown project template; using research_project");
                Self::ResearchProject
            }
        }
    }

    fn folders(self) -> &'static [&'static str] {
        match self {
            Self::ResearchProject => &["Chats", "Research", DAILY_FOLDER],
            Self::Simple => &[],
        }
    }

    fn files(self, base: &str, today: NaiveDate) -> Vec<(&'static str, String)> {
        match self {
            Self::ResearchProject => vec![
                ("README.md", String::new()),
                (
                    "index.md",
                    format!(
                        "---\nproject: {base}\nstatus: active\nstage: exploration\nmode: thinking\ninstructions: |\n{THINKING_INSTRUCTIONS}---\n\n# {base}\n\n## Overview\n\n## Key Questions\n\n## Resources\n\n## Next Steps\n"
                    ),
                ),
            ],
            Self::Simple => vec![(
                "index.md",
                format!("# {base}\n\nCreated on {}\n", today.format("%Y-%m-%d")),
            )],
        }
    }
}

/// Paths written by [`create_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreatedPaths {
    pub folders: Vec<String>,
    pub files: Vec<String>,
}

/// Place a project name under `Projects/` unless it already is.
#[must_use]
pub fn project_path(name: &str) -> String {
    let name = name.trim().trim_matches('/');
    if name == PROJECTS_ROOT || name.starts_with(&format!("{PROJECTS_ROOT}/")) {
        name.to_string()
    } else {
        format!("{PROJECTS_ROOT}/{name}")
    }
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`VaultlinkError::InvalidInput`] for anything else.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| VaultlinkError::InvalidInput(format!("date '{text}': {e}")))
}

/// Scaffold a project using today's date.
///
/// # Errors
///
/// Stops at the first write that fails.
pub fn create_project<S: VaultStorage>(
    pipeline: &mut DocumentPipeline<S>,
    name: &str,
    template: ProjectTemplate,
) -> Result<CreatedPaths> {
    create_project_on(pipeline, name, template, Local::now().date_naive())
}

/// Scaffold a project as of `today`.
///
/// # Errors
///
/// Stops at the first write that fails.
pub fn create_project_on<S: VaultStorage>(
    pipeline: &mut DocumentPipeline<S>,
    name: &str,
    template: ProjectTemplate,
    today: NaiveDate,
) -> Result<CreatedPaths> {
    let base = project_path(name);
    let mut created = CreatedPaths::default();

    for folder in template.folders() {
        let folder = format!("{base}/{folder}");
        pipeline.write(&format!("{folder}/{PLACEHOLDER}"), "")?;
        created.folders.push(folder);
    }
    for (file, content) in template.files(&base, today) {
        let outcome = pipeline.write(&format!("{base}/{file}"), &content)?;
        created.files.push(outcome.path);
    }
    info!(project = %base, ?template, "created project");
    Ok(created)
}

/// Create `<project>/Daily Progress/daily_progress_<YYYY_MM_DD>.md`.
///
/// Returns the path of the note. An existing note for that day is
/// replaced.
///
/// # Errors
///
/// Propagates storage errors.
pub fn create_daily_note<S: VaultStorage>(
    pipeline: &mut DocumentPipeline<S>,
    project: &str,
    date: Option<NaiveDate>,
) -> Result<String> {
    let project = project_path(project);
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let day = date.format("%Y-%m-%d").to_string();
    let project_name = project.rsplit('/').next().unwrap_or(&project);

    let path = format!(
        "{project}/{DAILY_FOLDER}/daily_progress_{}.md",
        date.format("%Y_%m_%d")
    );
    let content = format!(
        "---\ndate: [[{day}]]\ntype: daily_progress\nproject: \"[[{project_name}]]\"\ntags: [daily-progress, research-planning]\n---\n\n# Daily Progress - [[{day}]]\n\n## What I Learned Today\n\n## Key Insights\n\n## Questions & Challenges\n\n## Next Steps\n\n## Resources Referenced\n"
    );
    let outcome = pipeline.write(&path, &content)?;
    Ok(outcome.path)
}
