//! Shared CLI formatting helpers

use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::store::FsStore;

/// Truncate a string with an ellipsis
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Quote a CSV field when needed
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Shorten an entity ID for table display
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Discover the project and open its store
pub fn open_store(project: &Option<std::path::PathBuf>) -> miette::Result<(Project, FsStore)> {
    let project = match project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    }
    .map_err(|e| miette::miette!("{}", e))?;
    let store = FsStore::open(&project);
    Ok((project, store))
}
