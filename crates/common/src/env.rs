// Shell export rendering for `eval "$(influxboot env)"`.

use serde::Serialize;

use crate::types::BootstrapSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: &'static str,
    pub value: String,
}

impl EnvVar {
    fn new(name: &'static str, value: &str) -> Self {
        Self { name, value: value.to_string() }
    }
}

/// The variables a shell session expects after bootstrap.
pub fn bootstrap_vars(credentials_file: &str, settings: &BootstrapSettings) -> Vec<EnvVar> {
    vec![
        EnvVar::new("CREDENTIALS_FILE", credentials_file),
        EnvVar::new("INFLUX_USER", &settings.user),
        EnvVar::new("INFLUX_PASSWORD", &settings.password),
        EnvVar::new("INFLUX_ORG", &settings.org),
        EnvVar::new("INFLUX_BUCKET", &settings.bucket),
        EnvVar::new("INFLUX_RETENTION", &settings.retention),
        EnvVar::new("INFLUX_TOKEN", &settings.token),
    ]
}

pub fn render_exports(vars: &[EnvVar]) -> String {
    vars.iter()
        .map(|var| format!("export {}={}\n", var.name, shell_quote(&var.value)))
        .collect()
}

/// POSIX single-quote a value.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BootstrapSettings {
        BootstrapSettings {
            user: "rctrl".into(),
            password: "it's secret".into(),
            org: "o".into(),
            bucket: "b".into(),
            retention: "30d".into(),
            token: "abc123".into(),
        }
    }

    #[test]
    fn renders_all_variables_in_order() {
        let vars = bootstrap_vars("/home/dev/credentials.toml", &settings());
        let names: Vec<_> = vars.iter().map(|var| var.name).collect();
        assert_eq!(
            names,
            vec![
                "CREDENTIALS_FILE",
                "INFLUX_USER",
                "INFLUX_PASSWORD",
                "INFLUX_ORG",
                "INFLUX_BUCKET",
                "INFLUX_RETENTION",
                "INFLUX_TOKEN",
            ]
        );

        let rendered = render_exports(&vars);
        assert!(rendered.starts_with("export CREDENTIALS_FILE='/home/dev/credentials.toml'\n"));
        assert!(rendered.contains("export INFLUX_TOKEN='abc123'\n"));
    }

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
    }
}
