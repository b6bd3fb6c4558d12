//! External tool detection and management.

use ripvault_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is on `PATH` and, given a version argument, query its version.
///
/// Some tools (`ssh -V`) print their version on stderr; the first non-empty
/// line of either stream is used.
///
/// # Example
///
/// ```no_run
/// use ripvault_mkv::check_tool;
///
/// let info = check_tool("ffprobe", Some("-version"));
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, version_arg: Option<&str>) -> ToolInfo {
    let Ok(path) = which::which(name) else {
        return ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        };
    };

    let version = version_arg.and_then(|arg| {
        let output = Command::new(&path).arg(arg).output().ok()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    });

    ToolInfo {
        name: name.to_string(),
        available: true,
        version,
        path: Some(path),
    }
}

/// Check every tool ripvault shells out to.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![
        check_tool("makemkvcon", None),
        check_tool("ffprobe", Some("-version")),
        check_tool("ssh", Some("-V")),
        check_tool("scp", None),
        check_tool("udevadm", Some("--version")),
    ]
}

/// Require that a tool is available, returning its path.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool(name, "not found in PATH"))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!("Configured {} path {:?} does not exist", name, path);
    }

    require_tool(name)
}

/// Like [`get_tool_path`], but falls back to the bare tool name so that a
/// missing tool surfaces as a spawn error at first use rather than at startup.
pub fn tool_path_or_name(name: &str, config_path: Option<&Path>) -> PathBuf {
    get_tool_path(name, config_path).unwrap_or_else(|_| PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tool_not_found() {
        let info = check_tool("nonexistent_tool_12345", Some("--version"));
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn test_require_tool_missing() {
        let err = require_tool("nonexistent_tool_12345").unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }

    #[test]
    fn test_configured_path_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("makemkvcon");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(get_tool_path("makemkvcon", Some(fake.as_path())).unwrap(), fake);
    }

    #[test]
    fn test_tool_path_or_name_falls_back() {
        assert_eq!(
            tool_path_or_name("nonexistent_tool_12345", None),
            PathBuf::from("nonexistent_tool_12345")
        );
    }
}
