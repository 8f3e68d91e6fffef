//! Option threading and user-level configuration.
//!
//! Every pipeline stage reads an explicit [`Options`] value; there is no
//! process-wide state. Priority for each knob:
//!   1. command-line flag
//!   2. user config file (`$AUGSCRIPT_CONFIG`, else
//!      `{config_dir}/augscript/config.toml`)
//!   3. built-in default

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Flags observed by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Pad predicate values and separate sibling blocks with blank lines.
    pub pretty: bool,
    /// Relax predicate values into prefix regexps of at least this length.
    pub regexp: Option<usize>,
    /// Address numbered entries as `/*/` instead of `/seq::*/`.
    pub noseq: bool,
    /// Rename the loaded subtree to this absolute path before emission.
    pub target: Option<String>,
    /// Lens module to apply instead of autodetection.
    pub lens: Option<String>,
    /// Extra lens search directories.
    pub lens_dirs: Vec<String>,
    pub verbose: bool,
}

impl Options {
    /// Wildcard used for numbered children: `seq::*`, or `*` under
    /// `--noseq`.
    pub fn seq_star(&self) -> &'static str {
        if self.noseq { "*" } else { "seq::*" }
    }

    /// Fill any knob the command line left unset from the user config.
    pub fn apply_user_config(&mut self, cfg: &UserConfig) {
        if !self.pretty {
            self.pretty = cfg.pretty.unwrap_or(false);
        }
        if self.regexp.is_none() {
            self.regexp = cfg.regexp;
        }
        if !self.noseq {
            self.noseq = cfg.noseq.unwrap_or(false);
        }
        if let Some(dirs) = &cfg.lens_dirs {
            self.lens_dirs.extend(dirs.iter().cloned());
        }
    }
}

/// User-level defaults, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub pretty: Option<bool>,
    pub regexp: Option<usize>,
    pub noseq: Option<bool>,
    pub lens_dirs: Option<Vec<String>>,
}

/// Path of the user config file: `$AUGSCRIPT_CONFIG` when set and
/// non-empty, else `{config_dir}/augscript/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AUGSCRIPT_CONFIG")
        && !path.is_empty()
    {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("augscript/config.toml"))
}

/// Try to load a user config from `path`. Returns `Ok(None)` when the file
/// does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or contains
/// invalid TOML.
pub fn try_load_user_config(path: &Path) -> anyhow::Result<Option<UserConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read config file: {}", path.display())));
        }
    };
    let config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(Some(config))
}

/// Load the user config, warning about a malformed file on stderr and
/// falling back to defaults. A missing file is silently fine.
pub fn load_user_config() -> UserConfig {
    let Some(path) = user_config_path() else {
        return UserConfig::default();
    };
    match try_load_user_config(&path) {
        Ok(Some(cfg)) => cfg,
        Ok(None) => UserConfig::default(),
        Err(e) => {
            eprintln!("[augscript] warning: {e:#}");
            UserConfig::default()
        }
    }
}
