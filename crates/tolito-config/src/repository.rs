use std::fs;

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use tolito_utils::path::resolve_path;

use crate::error::{ErrorContext, Result};

/// A binary repository, reached through one or more mirror servers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Repository {
    /// Repository name, taken from the table key.
    #[serde(skip)]
    pub name: String,

    /// Mirror URL templates, tried in ranked order. `$repo` and `$arch` are substituted.
    #[serde(
        default,
        alias = "Servers",
        alias = "Server",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub servers: Vec<String>,

    /// Signature policy passed through to pacman (e.g. "Required DatabaseOptional").
    #[serde(alias = "SigLevel", skip_serializing_if = "Option::is_none")]
    pub sig_level: Option<String>,

    /// Mirrorlist file with `Server = ...` lines, used when `servers` is empty.
    /// Environment variables such as `$HOME` are expanded.
    #[serde(alias = "Include", skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

impl Repository {
    /// Mirror templates for this repository: `servers` if set, otherwise the
    /// entries of the `include` mirrorlist.
    pub fn server_templates(&self) -> Result<Vec<String>> {
        if !self.servers.is_empty() {
            return Ok(self.servers.clone());
        }

        let Some(include) = &self.include else {
            return Ok(Vec::new());
        };

        let path = resolve_path(include)?;
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading mirrorlist {}", path.display()))?;
        Ok(parse_mirrorlist(&content))
    }

    /// File name of the repository's package index on a mirror.
    pub fn db_filename(&self) -> String {
        format!("{}.db", self.name)
    }
}

/// Extracts `Server = <url>` entries from a pacman mirrorlist, in file order.
pub fn parse_mirrorlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == "Server").then(|| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
        .collect()
}

/// Substitutes `$repo` and `$arch` in a mirror template and trims any trailing slash.
pub fn substitute_template(template: &str, repo: &str, arch: &str) -> String {
    template
        .replace("$repo", repo)
        .replace("$arch", arch)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_mirrorlist() {
        let content = r#"
## Chaotic mirrors
# Server = https://disabled.example/$repo/$arch
Server = https://cdn-mirror.chaotic.cx/$repo/$arch
Server=https://geo-mirror.chaotic.cx/$repo/$arch
Include = /etc/pacman.d/other
"#;
        assert_eq!(
            parse_mirrorlist(content),
            vec![
                "https://cdn-mirror.chaotic.cx/$repo/$arch",
                "https://geo-mirror.chaotic.cx/$repo/$arch",
            ]
        );
    }

    #[test]
    fn test_substitute_template() {
        assert_eq!(
            substitute_template("https://m.example/$repo/os/$arch/", "extra", "x86_64"),
            "https://m.example/extra/os/x86_64"
        );
    }

    #[test]
    fn test_server_templates_prefers_servers() {
        let repo = Repository {
            name: "custom".into(),
            servers: vec!["https://a/$repo".into()],
            sig_level: None,
            include: Some("/nonexistent/mirrorlist".into()),
        };
        assert_eq!(repo.server_templates().unwrap(), vec!["https://a/$repo"]);
    }

    #[test]
    fn test_server_templates_reads_include() {
        let dir = tempdir().unwrap();
        let mirrorlist = dir.path().join("mirrorlist");
        fs::write(&mirrorlist, "Server = https://b/$repo/$arch\n").unwrap();

        let repo = Repository {
            name: "custom".into(),
            servers: Vec::new(),
            sig_level: None,
            include: Some(mirrorlist.to_string_lossy().into_owned()),
        };
        assert_eq!(repo.server_templates().unwrap(), vec!["https://b/$repo/$arch"]);
        assert_eq!(repo.db_filename(), "custom.db");
    }

    #[test]
    fn test_server_templates_missing_include_errors() {
        let repo = Repository {
            name: "custom".into(),
            servers: Vec::new(),
            sig_level: None,
            include: Some("/nonexistent/tolito/mirrorlist".into()),
        };
        assert!(repo.server_templates().is_err());
    }

    #[test]
    fn test_pacman_style_keys() {
        let repo: Repository = toml::from_str(
            "Servers = [\"https://c/$repo\"]\nSigLevel = \"Never\"\n",
        )
        .unwrap();
        assert_eq!(repo.servers, vec!["https://c/$repo"]);
        assert_eq!(repo.sig_level.as_deref(), Some("Never"));
    }
}
