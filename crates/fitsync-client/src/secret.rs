//! Secret references in `config.toml`.
//!
//! `client_id` and `client_secret` may point at a value stored elsewhere:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and takes the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is used as written

/// Expands a value that may carry a `pass::` or `env::` prefix.
pub fn resolve(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("pass::") {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        resolve_env(var)
    } else {
        Ok(value.to_string())
    }
}

/// True if `value` names a secret rather than holding it.
pub fn is_reference(value: &str) -> bool {
    value.starts_with("pass::") || value.starts_with("env::")
}

fn resolve_pass(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed (exit {}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

fn resolve_env(var: &str) -> Result<String, String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) => Err(format!("environment variable `{}` is empty", var)),
        Err(_) => Err(format!("environment variable `{}` is not set", var)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve("23ABCD").unwrap(), "23ABCD");
        assert_eq!(resolve("").unwrap(), "");
        assert!(!is_reference("23ABCD"));
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_FITSYNC_TEST_SECRET", "s3cret");
        }
        assert!(is_reference("env::_FITSYNC_TEST_SECRET"));
        assert_eq!(resolve("env::_FITSYNC_TEST_SECRET").unwrap(), "s3cret");
        unsafe {
            std::env::remove_var("_FITSYNC_TEST_SECRET");
        }
    }

    #[test]
    fn missing_env_var_errors() {
        let err = resolve("env::_FITSYNC_NONEXISTENT_VAR_12345").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn pass_reference_to_missing_entry_errors() {
        // Fails whether or not `pass` is installed.
        assert!(resolve("pass::fitsync/nonexistent/entry/12345").is_err());
    }
}
