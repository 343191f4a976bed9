use anyhow::Result;
use regex::Regex;

const ENV_VAR_PATTERN: &str = r"\$\{([^}:]+)(?::-(.*?))?\}";

/// Interpolate environment variables in a string
/// Supports ${VAR} and ${VAR:-default} syntax
pub fn interpolate_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(ENV_VAR_PATTERN)?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        match (std::env::var(var_name), cap.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing_vars.push(var_name.to_string());
                cap[0].to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        anyhow::bail!("Missing required environment variables: {}", missing_vars.join(", "));
    }

    Ok(result.into_owned())
}

/// Interpolate environment variables in YAML content
pub fn interpolate_yaml_content(yaml_content: &str) -> Result<String> {
    let lines: Vec<String> = yaml_content
        .lines()
        .map(|line| {
            // Don't interpolate comments
            if line.trim().starts_with('#') {
                return Ok(line.to_string());
            }

            interpolate_env_vars(line)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(lines.join("\n"))
}
