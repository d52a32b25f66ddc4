//! Prompt definitions and on-disk prompt loading.
//!
//! A prompt is either inline (system and user text given in the config file)
//! or backed by a path. Path-backed prompts are read on first use:
//!
//! - A regular file becomes the system text.
//! - A directory contributes `system.md` and `user.md`; either may be absent
//!   but not both.

use crate::error::{AxonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const SYSTEM_FILE: &str = "system.md";
const USER_FILE: &str = "user.md";
const PROMPT_EXTENSION: &str = "md";

/// A named system/user template pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub name: String,
    pub system: Option<String>,
    pub user: Option<String>,
    pub path: Option<PathBuf>,
    loaded: bool,
}

/// On-disk shape of a `[prompts.<name>]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Prompt {
    /// A prompt whose text is already known.
    pub fn inline(name: &str, system: Option<&str>, user: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            system: system.map(str::to_string),
            user: user.map(str::to_string),
            path: None,
            loaded: true,
        }
    }

    /// A prompt read from `path` on first use.
    pub fn from_path(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Build from a config table. Relative paths resolve against `base`.
    pub fn from_table(name: &str, table: PromptTable, base: &Path) -> Self {
        let has_text = table.system.is_some() || table.user.is_some();
        Self {
            name: name.to_string(),
            system: table.system,
            user: table.user,
            path: table.path.map(|p| if p.is_relative() { base.join(p) } else { p }),
            loaded: has_text,
        }
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Where the prompt text comes from, for display.
    pub fn source(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "config".to_string(),
        }
    }

    /// Read the prompt text from its path. A no-op once loaded.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let path = self.path.clone().ok_or_else(|| AxonError::PromptLoad {
            name: self.name.clone(),
            reason: "prompt has neither text nor a path".to_string(),
        })?;

        // fs::metadata follows symlinks.
        let meta = fs::metadata(&path).map_err(|e| self.load_error(&path, e))?;

        if meta.is_dir() {
            if self.system.is_none() {
                self.system = read_optional(&path.join(SYSTEM_FILE))
                    .map_err(|e| self.load_error(&path.join(SYSTEM_FILE), e))?;
            }
            if self.user.is_none() {
                self.user = read_optional(&path.join(USER_FILE))
                    .map_err(|e| self.load_error(&path.join(USER_FILE), e))?;
            }
            if self.system.is_none() && self.user.is_none() {
                return Err(AxonError::PromptLoad {
                    name: self.name.clone(),
                    reason: format!(
                        "directory '{}' contains neither {} nor {}",
                        path.display(),
                        SYSTEM_FILE,
                        USER_FILE
                    ),
                });
            }
        } else {
            let content = fs::read_to_string(&path).map_err(|e| self.load_error(&path, e))?;
            self.system = Some(content);
        }

        debug!(prompt = %self.name, path = %path.display(), "loaded prompt");
        self.loaded = true;
        Ok(())
    }

    fn load_error(&self, path: &Path, e: std::io::Error) -> AxonError {
        AxonError::PromptLoad {
            name: self.name.clone(),
            reason: format!("failed to read '{}': {}", path.display(), e),
        }
    }
}

/// Read a file, treating a missing or blank file as absent.
fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Register every prompt found directly under `dir` that is not already in
/// `prompts`.
///
/// Sub-directories become directory prompts and `*.md` files become file
/// prompts named after the file stem. Unreadable directories are skipped.
pub fn scan_prompt_dir(dir: &Path, prompts: &mut HashMap<String, Prompt>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            trace!(dir = %dir.display(), error = %e, "skipping prompt directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };

        let name = if meta.is_dir() {
            entry.file_name().to_string_lossy().into_owned()
        } else if path.extension().is_some_and(|ext| ext == PROMPT_EXTENSION) {
            match path.file_stem() {
                Some(stem) => stem.to_string_lossy().into_owned(),
                None => continue,
            }
        } else {
            continue;
        };

        if name.is_empty() || name.starts_with('.') || prompts.contains_key(&name) {
            continue;
        }

        trace!(prompt = %name, path = %path.display(), "discovered prompt");
        prompts.insert(name.clone(), Prompt::from_path(&name, path));
    }
}
