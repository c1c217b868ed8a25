//! Environment and path helpers

use path_clean::PathClean;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Reject variables a process environment cannot carry: empty names, names
/// containing `=` and NUL bytes anywhere
pub fn validate_environment(env: &HashMap<String, String>) -> Result<()> {
    for (name, value) in env {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(Error::Validation(format!(
                "invalid environment variable name: {name:?}"
            )));
        }
        if value.contains('\0') {
            return Err(Error::Validation(format!(
                "environment variable {name} contains a NUL byte"
            )));
        }
    }
    Ok(())
}

/// Reject names a shell cannot `export`
pub fn validate_shell_names<'a>(names: impl IntoIterator<Item = &'a String>) -> Result<()> {
    for name in names {
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
            && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
        if !valid {
            return Err(Error::Validation(format!(
                "invalid environment variable name: {name:?}"
            )));
        }
    }
    Ok(())
}

/// Host environment with `overrides` applied; override values win
#[must_use]
pub fn merged_environment(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Resolve `path` against `base` when relative and normalize it lexically
#[must_use]
pub fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf().clean()
    } else {
        base.join(candidate).clean()
    }
}

/// Resolve and require an existing directory
pub async fn require_directory(base: &Path, path: &str) -> Result<PathBuf> {
    let resolved = resolve_path(base, path);
    match tokio::fs::metadata(&resolved).await {
        Ok(meta) if meta.is_dir() => Ok(resolved),
        _ => Err(Error::DirectoryNotFound(resolved.display().to_string())),
    }
}

/// Working directory of the service itself
pub fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| Error::Internal(format!("cannot read current directory: {e}")))
}

/// Quote a value for inclusion in a shell command line
pub fn shell_quote(value: &str) -> Result<String> {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| Error::Validation(format!("value cannot be quoted for a shell: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_clean() {
        let base = Path::new("/tmp/work");
        assert_eq!(resolve_path(base, "../other/./x"), PathBuf::from("/tmp/other/x"));
        assert_eq!(resolve_path(base, "/var//log/"), PathBuf::from("/var/log"));
        assert_eq!(resolve_path(base, "."), PathBuf::from("/tmp/work"));
    }

    #[tokio::test]
    async fn test_require_directory() {
        let dir = tempfile::tempdir().unwrap();
        let found = require_directory(Path::new("/"), dir.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(found, dir.path());

        let err = require_directory(dir.path(), "missing").await.unwrap_err();
        assert_eq!(err.code(), "DIRECTORY_NOT_FOUND");

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        tokio_test::assert_err!(require_directory(dir.path(), "file.txt").await);
    }

    #[test]
    fn test_merged_environment_overrides_win() {
        let mut overrides = HashMap::new();
        overrides.insert("PATH".to_string(), "/custom".to_string());
        overrides.insert("DEVBOX_TEST_ONLY".to_string(), "1".to_string());
        let env = merged_environment(&overrides);
        assert_eq!(env.get("PATH").map(String::as_str), Some("/custom"));
        assert_eq!(env.get("DEVBOX_TEST_ONLY").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_name_validation() {
        let ok = ["FOO".to_string(), "_bar9".to_string()];
        tokio_test::assert_ok!(validate_shell_names(ok.iter()));
        assert!(validate_shell_names(["9X".to_string()].iter()).is_err());
        assert!(validate_shell_names(["A-B".to_string()].iter()).is_err());
    }

    fn env_of(name: &str, value: &str) -> HashMap<String, String> {
        HashMap::from([(name.to_string(), value.to_string())])
    }

    #[test]
    fn test_environment_validation() {
        tokio_test::assert_ok!(validate_environment(&env_of("A-B", "x")));
        assert!(validate_environment(&env_of("A=B", "x")).is_err());
        assert!(validate_environment(&env_of("", "x")).is_err());

        let err = validate_environment(&env_of("GOOD", "bad\0value")).unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain").unwrap(), "plain");
        assert_eq!(shell_quote("a b").unwrap(), "'a b'");
        assert!(shell_quote("nul\0").is_err());
    }
}
