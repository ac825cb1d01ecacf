use anyhow::Result;
use regex::Regex;
use std::env;
use tracing::{debug, warn};

const PLACEHOLDER: &str = r"\$\{(\w+)\}|\$(\w+)";

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
pub fn substitute_env_vars(content: &str) -> Result<String> {
    substitute_vars_with(content, |name| env::var(name).ok())
}

/// Substitute placeholders using `lookup`; unknown names are left in place
/// so validation can report them
pub fn substitute_vars_with<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(PLACEHOLDER)?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
        let whole = &caps[0];
        let Some(name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
            return whole.to_string();
        };
        match lookup(name) {
            Some(value) => {
                debug!(var = name, "Substituting environment variable");
                value
            }
            None => {
                warn!("Environment variable '{}' not set", name);
                missing_vars.push(name.to_string());
                whole.to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (may use defaults or fail validation): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Names of placeholders still present in `content`
pub fn unresolved_env_vars(content: &str) -> Result<Vec<String>> {
    let re = Regex::new(PLACEHOLDER)?;
    Ok(re
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect())
}
