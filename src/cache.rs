//! Last-run cache.
//!
//! After every successful run axon records the output text and enough about
//! the run to repeat it:
//!
//! - `last_output.txt` - the final pipe value, printed by `--last`
//! - `last_run_data.json` - pattern, flags, input, and prompt, used by
//!   `--replay`
//!
//! Both files live in `$XDG_CACHE_HOME/axon` and are replaced atomically.

use crate::error::{AxonError, Result};
use crate::fs::atomic_write;
use crate::pattern::Pattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LAST_OUTPUT_FILE: &str = "last_output.txt";
const LAST_RUN_FILE: &str = "last_run_data.json";

/// Command-line flags that shaped a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFlags {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PathBuf>,
}

/// Everything needed to replay a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunData {
    /// The resolved pattern, so a replay survives later config edits.
    pub pattern: Pattern,
    pub flags: RunFlags,
    pub input: String,
    pub prompt: String,
    pub saved_at: DateTime<Utc>,
}

/// Reads and writes the cache files in one directory.
#[derive(Debug, Clone)]
pub struct RunCache {
    dir: PathBuf,
}

impl RunCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_output(&self, output: &str) -> Result<()> {
        atomic_write(self.dir.join(LAST_OUTPUT_FILE), output.as_bytes())
    }

    pub fn last_output(&self) -> Result<String> {
        let path = self.dir.join(LAST_OUTPUT_FILE);
        std::fs::read_to_string(&path).map_err(|e| missing_or(&path, e, "no previous output"))
    }

    pub fn save_run(&self, data: &RunData) -> Result<()> {
        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| AxonError::Cache(format!("failed to serialize run data: {}", e)))?;
        atomic_write(self.dir.join(LAST_RUN_FILE), &json)
    }

    pub fn last_run(&self) -> Result<RunData> {
        let path = self.dir.join(LAST_RUN_FILE);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| missing_or(&path, e, "no previous run to replay"))?;
        serde_json::from_str(&content).map_err(|e| {
            AxonError::Cache(format!("failed to parse '{}': {}", path.display(), e))
        })
    }
}

fn missing_or(path: &Path, e: std::io::Error, missing: &str) -> AxonError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AxonError::Cache(missing.to_string())
    } else {
        AxonError::Cache(format!("failed to read '{}': {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Step;
    use tempfile::TempDir;

    fn sample_run() -> RunData {
        RunData {
            pattern: Pattern::new(
                "commit",
                vec![
                    Step::command("git diff --cached").with_output("DIFF"),
                    Step::ai("@commit-message").with_model("openai/gpt-4o-mini"),
                ],
            ),
            flags: RunFlags {
                pattern: "commit".to_string(),
                model: Some("anthropic/claude".to_string()),
                quiet: true,
                config: None,
            },
            input: "stdin text".to_string(),
            prompt: "be terse".to_string(),
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_output_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = RunCache::new(dir.path().join("axon"));

        cache.save_output("first").unwrap();
        cache.save_output("second").unwrap();

        assert_eq!(cache.last_output().unwrap(), "second");
    }

    #[test]
    fn test_run_data_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = RunCache::new(dir.path());
        let run = sample_run();

        cache.save_run(&run).unwrap();

        assert_eq!(cache.last_run().unwrap(), run);
    }

    #[test]
    fn test_missing_files_report_cache_errors() {
        let dir = TempDir::new().unwrap();
        let cache = RunCache::new(dir.path().join("empty"));

        let err = cache.last_output().unwrap_err();
        assert_eq!(err.to_string(), "cache error: no previous output");

        let err = cache.last_run().unwrap_err();
        assert_eq!(err.to_string(), "cache error: no previous run to replay");
    }

    #[test]
    fn test_corrupt_run_data() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(LAST_RUN_FILE), "{not json").unwrap();

        let err = RunCache::new(dir.path()).last_run().unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_run_data_rejects_invalid_step() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(LAST_RUN_FILE),
            r#"{"pattern":{"name":"p","steps":[{"output":"X"}]},
                "flags":{"pattern":"p"},"input":"","prompt":"",
                "saved_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let err = RunCache::new(dir.path()).last_run().unwrap_err();
        assert!(err.to_string().contains("either 'prompt' or 'command'"));
    }
}
