use compio::{fs::File, io::AsyncReadExt, io::BufReader};
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::{
    borrow::Cow,
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::ext::BestEffortPathExt;

const CONFIG_FILE_NAME: &str = "tandem.yaml";
const ANCESTOR_FILE_SUFFIX: &str = ".ancestor.yaml";

const SESSIONS_KEY: &str = "sessions";
const ALPHA_KEY: &str = "alpha";
const BETA_KEY: &str = "beta";
const ANCESTOR_KEY: &str = "ancestor";

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

fn yaml_key(key: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(key)))
}

/// One configured session: two endpoint URLs and where the agreed ancestor
/// is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub name: String,
    pub alpha: String,
    pub beta: String,
    /// Relative to the root directory unless absolute.
    pub ancestor: PathBuf,
}

impl SessionSpec {
    fn from_session_yaml(
        name: &str,
        data: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Self, SessionRegistryCreationError> {
        debug!("Parsing session '{}'", name);

        let get = |key: &'static str| data.get(&yaml_key(key)).and_then(|value| value.as_str());
        let alpha = get(ALPHA_KEY).context(MissingEndpointSnafu {
            session: name,
            key: ALPHA_KEY,
        })?;
        let beta = get(BETA_KEY).context(MissingEndpointSnafu {
            session: name,
            key: BETA_KEY,
        })?;
        let ancestor = get(ANCESTOR_KEY)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{name}{ANCESTOR_FILE_SUFFIX}")));

        for key in data.keys() {
            let known = key
                .as_str()
                .is_some_and(|key| [ALPHA_KEY, BETA_KEY, ANCESTOR_KEY].contains(&key));
            if !known {
                debug!("Ignoring unknown key {:?} in session '{}'", key, name);
            }
        }

        Ok(SessionSpec {
            name: name.to_string(),
            alpha: alpha.to_string(),
            beta: beta.to_string(),
            ancestor,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: HashMap<String, SessionSpec>,
}

impl SessionRegistry {
    pub async fn read(root: &Path) -> Result<Self, SessionRegistryCreationError> {
        Self::from_path(get_config_file_path(root)).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, SessionRegistryCreationError> {
        debug!("Opening config file: {}", path.best_effort_path_display());
        let file = File::open(&path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;

        debug!("Reading config file");
        let cursor = Cursor::new(file);
        let mut reader = BufReader::new(cursor);
        let res = reader.read_to_string(String::new()).await;
        match res.0 {
            Ok(n) => debug!("Successfully read config file: {n} bytes"),
            _ => {
                res.0.context(ReadSnafu {
                    file_path: path.best_effort_path_display(),
                })?;
            }
        }
        res.1.as_str().try_into()
    }

    pub fn get_session_by_name(&self, name: impl AsRef<str>) -> Option<&SessionSpec> {
        self.sessions.get(name.as_ref())
    }

    /// Configured session names, sorted.
    pub fn session_names(&self) -> Vec<&str> {
        let mut names = self.sessions.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    fn parse_sessions_from_yaml(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Vec<SessionSpec>, SessionRegistryCreationError> {
        top_level
            .get(&yaml_key(SESSIONS_KEY))
            .unwrap_or(&Yaml::Mapping(LinkedHashMap::new()))
            .as_mapping()
            .ok_or(SessionRegistryCreationError::SessionsNotMap)?
            .iter()
            .filter_map(|(key, value)| {
                if let Yaml::Value(Scalar::String(name)) = key {
                    return Some((name, value));
                }
                debug!("Skipping session entry with non-string name: {:?}", key);
                None
            })
            .map(|(name, value)| {
                let data = value
                    .as_mapping()
                    .context(SessionNotMapSnafu {
                        session: name.to_string(),
                    })?;
                SessionSpec::from_session_yaml(name, data)
            })
            .collect()
    }
}

impl TryFrom<&str> for SessionRegistry {
    type Error = SessionRegistryCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let contents_vec = Yaml::load_from_str(contents)
            .map_err(|e| SessionRegistryCreationError::ParseError { source: e })?;
        let contents = contents_vec
            .first()
            .ok_or(SessionRegistryCreationError::MalformedConfig)?;

        let top_level = contents
            .as_mapping()
            .ok_or(SessionRegistryCreationError::TopLevelNotMap)?;

        let sessions = Self::parse_sessions_from_yaml(top_level)?
            .into_iter()
            .map(|session| (session.name.clone(), session))
            .collect();

        Ok(SessionRegistry { sessions })
    }
}

#[derive(Debug, Snafu)]
pub enum SessionRegistryCreationError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Sessions section should be a map"))]
    SessionsNotMap,
    #[snafu(display("Session '{}' should be a map", session))]
    SessionNotMap { session: String },
    #[snafu(display("Session '{}' is missing its '{}' endpoint", session, key))]
    MissingEndpointError { session: String, key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(contents: &str) -> Result<SessionRegistry, SessionRegistryCreationError> {
        contents.try_into()
    }

    #[compio::test]
    async fn config_returns_error_on_nonexistent_file() {
        let result = SessionRegistry::from_path(Path::new("nonexistent.yaml").to_path_buf()).await;
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::ReadError { .. })
        ));
    }

    #[compio::test]
    async fn config_reads_from_root() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "sessions:\n  docs:\n    alpha: manifest:a.yaml\n    beta: 'memory:'\n",
        )
        .expect("Failed to write config");

        let registry = SessionRegistry::read(dir.path())
            .await
            .expect("Failed to read config");

        assert_eq!(registry.session_names(), vec!["docs"]);
    }

    #[test]
    fn config_returns_error_on_invalid_yaml() {
        let result = parse("invalid: yaml: content: [unclosed");
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::ParseError { .. })
        ));
    }

    #[test]
    fn config_returns_error_on_empty_file() {
        let result = parse("");
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::MalformedConfig)
        ));
    }

    #[test]
    fn config_returns_error_when_top_level_is_not_map() {
        let result = parse("- item1\n- item2");
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::TopLevelNotMap)
        ));
    }

    #[test]
    fn config_returns_error_when_top_level_is_scalar() {
        let result = parse("just a string");
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::TopLevelNotMap)
        ));
    }

    #[test]
    fn config_returns_error_when_sessions_is_not_map() {
        let result = parse("sessions:\n  - invalid_session_format");
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::SessionsNotMap)
        ));
    }

    #[test]
    fn config_handles_missing_sessions_section() {
        let registry = parse("other_config: value").expect("Failed to parse config");
        assert!(registry.session_names().is_empty());
    }

    #[test]
    fn config_parses_full_session() {
        let registry = parse(
            r#"
sessions:
  docs:
    alpha: manifest:alpha.yaml
    beta: "memory:"
    ancestor: state/docs.yaml
"#,
        )
        .expect("Failed to parse config");

        assert_eq!(
            registry.get_session_by_name("docs"),
            Some(&SessionSpec {
                name: "docs".to_string(),
                alpha: "manifest:alpha.yaml".to_string(),
                beta: "memory:".to_string(),
                ancestor: PathBuf::from("state/docs.yaml"),
            })
        );
    }

    #[test]
    fn config_defaults_ancestor_path() {
        let registry = parse("sessions:\n  site:\n    alpha: manifest:a.yaml\n    beta: manifest:b.yaml\n")
            .expect("Failed to parse config");

        let session = registry
            .get_session_by_name("site")
            .expect("session should exist");
        assert_eq!(session.ancestor, PathBuf::from("site.ancestor.yaml"));
    }

    #[test]
    fn config_ignores_unknown_session_keys() {
        let registry = parse(
            "sessions:\n  site:\n    alpha: manifest:a.yaml\n    beta: manifest:b.yaml\n    mode: two-way\n",
        )
        .expect("Failed to parse config");

        assert!(registry.get_session_by_name("site").is_some());
    }

    #[test]
    fn config_returns_error_on_missing_endpoint() {
        let result = parse("sessions:\n  site:\n    alpha: manifest:a.yaml\n");
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::MissingEndpointError { session, key })
                if session == "site" && key == "beta"
        ));
    }

    #[test]
    fn config_returns_error_when_session_is_not_map() {
        let result = parse("sessions:\n  site: manifest:a.yaml\n");
        assert!(matches!(
            result,
            Err(SessionRegistryCreationError::SessionNotMap { .. })
        ));
    }

    #[test]
    fn config_skips_non_string_session_names() {
        let registry = parse(
            "sessions:\n  123:\n    alpha: a:b\n    beta: c:d\n  ok:\n    alpha: a:b\n    beta: c:d\n",
        )
        .expect("Failed to parse config");

        assert_eq!(registry.session_names(), vec!["ok"]);
    }

    #[test]
    fn config_handles_unicode_session_names() {
        let registry = parse(
            r#"
sessions:
  "тест":
    alpha: "memory:"
    beta: "memory:"
  "🚀rocket":
    alpha: "memory:"
    beta: "memory:"
"#,
        )
        .expect("Failed to parse config");

        assert_eq!(registry.session_names().len(), 2);
    }
}
