use std::collections::HashMap;
use std::fs;
use std::path::Path;

use render::registry::OutputFormat;

use crate::error::CliError;

/// Connection string used when the CONN argument is `-`.
pub const CONN_VAR: &str = "ROWDUMP_CONN";
/// Output format used when `--format` is not given.
pub const FORMAT_VAR: &str = "ROWDUMP_FORMAT";

/// Environment variable manager that loads from system and .env files
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn from_system() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Load variables from a .env file. File entries override the process environment.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Replaces every `${NAME}` in `input` with the variable's value.
    pub fn expand(&self, input: &str) -> Result<String, CliError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| {
                CliError::Config(format!("Unterminated variable reference in '{input}'"))
            })?;

            let name = &after[..end];
            if name.is_empty() {
                return Err(CliError::Config(format!(
                    "Empty variable reference in '{input}'"
                )));
            }
            let value = self.get(name).ok_or_else(|| {
                CliError::Config(format!("Environment variable '{name}' is not set"))
            })?;
            out.push_str(value);
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Resolves the CONN argument: `-` reads `ROWDUMP_CONN`, then `${NAME}` references are expanded.
    pub fn conn_str(&self, arg: &str) -> Result<String, CliError> {
        let raw = if arg == "-" {
            self.get(CONN_VAR).ok_or_else(|| {
                CliError::Config(format!("Connection string is '-' but {CONN_VAR} is not set"))
            })?
        } else {
            arg
        };
        self.expand(raw)
    }

    /// `--format` when given, else `ROWDUMP_FORMAT`, else the default format.
    pub fn output_format(&self, flag: Option<&str>) -> Result<OutputFormat, CliError> {
        match flag.or_else(|| self.get(FORMAT_VAR)) {
            Some(token) => Ok(token.parse()?),
            None => Ok(OutputFormat::default()),
        }
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars
                .insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }

        value.to_string()
    }
}
