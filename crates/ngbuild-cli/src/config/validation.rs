use crate::config::NgbuildConfig;
use crate::error::{ConfigError, Result};
use axum::http::{HeaderName, HeaderValue};

impl NgbuildConfig {
    /// Validate configuration values that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "command".to_string(),
                hint: "Set `command` to the shell command that builds your application, e.g. \"ng build\"".to_string(),
            }
            .into());
        }

        if self.port == 0 {
            return Err(invalid("port", "0", "Use a port between 1 and 65535"));
        }

        if self.host.trim().is_empty() {
            return Err(invalid("host", "\"\"", "Use a hostname or IP address such as 127.0.0.1"));
        }

        if !self.serve_path.starts_with('/') {
            return Err(invalid(
                "servePath",
                &self.serve_path,
                "Serve paths must start with '/', e.g. \"/app/\"",
            ));
        }

        for (name, value) in &self.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(invalid("headers", name, "Header names may only contain token characters"));
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(invalid(
                    "headers",
                    value,
                    "Header values must be visible ASCII characters",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str, hint: &str) -> crate::error::CliError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    }
    .into()
}
