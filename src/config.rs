use crate::error::{Error, Result};
use crate::handler::InputSession;
use crate::log;
use crate::mode::MappingModes;
use crate::options::OptionValue;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "modekeys";

/// Owner tag of mappings installed from the config file.
pub const CONFIG_OWNER: &str = "config";

pub fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"))
        .join(APP_NAME)
}

pub fn state_dir() -> PathBuf {
    std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local").join("state"))
        .join(APP_NAME)
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// One `map`/`noremap` line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Mode letters, e.g. `"nx"`. Empty means normal, visual and
    /// operator-pending.
    pub modes: String,
    pub from: String,
    pub to: String,
    pub noremap: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub options: BTreeMap<String, OptionValue>,
    pub mappings: Vec<MappingConfig>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        let path = config_dir().join("config.yaml");
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("warning: {e}");
                log::entry(log::Level::Warn, "config_parse_failed", &e.to_string());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        serde_yml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Installs options and mappings. Mappings from an earlier `apply` are
    /// replaced.
    pub fn apply(&self, session: &mut InputSession) -> Result<()> {
        for (name, value) in &self.options {
            session.options_mut().set(name, value.clone())?;
        }
        session.remove_mappings(CONFIG_OWNER);
        for m in &self.mappings {
            let modes = MappingModes::from_letters(&m.modes)?;
            session.add_owned_mapping(CONFIG_OWNER, modes, &m.from, &m.to, !m.noremap)?;
        }
        if let Some(level) = &self.log_level {
            let level = log::parse_level(level)
                .ok_or_else(|| Error::Config(format!("unknown log level '{level}'")))?;
            log::set_level(level);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;
    use std::time::Duration;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_and_apply() {
        let (_dir, path) = write_config(
            "options:\n  timeoutlen: 300\n  ignorecase: true\nmappings:\n  - modes: n\n    from: Y\n    to: y$\n    noremap: true\n  - from: <Space>w\n    to: w\n",
        );
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.mappings.len(), 2);
        assert_eq!(cfg.mappings[1].modes, "");
        assert!(!cfg.mappings[1].noremap);

        let mut session = InputSession::new();
        cfg.apply(&mut session).unwrap();
        assert_eq!(session.options().timeoutlen(), Duration::from_millis(300));
        assert!(session.options().ignorecase());
        assert_eq!(session.mappings().entries(MappingModes::NORMAL).len(), 2);
        assert_eq!(session.mappings().entries(MappingModes::OP_PENDING).len(), 1);

        let mut editor = TextBuffer::new("foo bar");
        session.feed_keys(&mut editor, "Y").unwrap();
        assert_eq!(session.registers().get('0').unwrap().text(), "foo bar");
    }

    #[test]
    fn test_apply_replaces_config_mappings() {
        let (_dir, path) = write_config("mappings:\n  - from: a\n    to: b\n");
        let cfg = Config::load_from(&path).unwrap();
        let mut session = InputSession::new();
        cfg.apply(&mut session).unwrap();
        cfg.apply(&mut session).unwrap();
        assert_eq!(session.mappings().entries(MappingModes::NORMAL).len(), 1);
        assert_eq!(session.remove_mappings(CONFIG_OWNER), 4);
    }

    #[test]
    fn test_rejects_bad_values() {
        let (_dir, path) = write_config("options:\n  timeoutlen: fast\n");
        let cfg = Config::load_from(&path).unwrap();
        assert!(matches!(cfg.apply(&mut InputSession::new()), Err(Error::Config(_))));

        let (_dir, path) = write_config("mappings:\n  - modes: q\n    from: a\n    to: b\n");
        let cfg = Config::load_from(&path).unwrap();
        assert!(matches!(cfg.apply(&mut InputSession::new()), Err(Error::Config(_))));

        let (_dir, path) = write_config("mappings: [1, 2\n");
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
