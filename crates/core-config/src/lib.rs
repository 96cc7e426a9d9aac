//! Configuration loading and parsing.
//!
//! Parses `snipline.toml` (or an override path provided by the binary). Every
//! section is optional; unknown fields are ignored so the file format can grow
//! without warnings. A missing or malformed file yields the defaults, which
//! mirror Vim's stock indent options (`tabstop=8`, `shiftwidth=8`,
//! `noexpandtab`).
//!
//! ```toml
//! [indent]
//! tabstop = 4
//! shiftwidth = 4
//! expandtab = true
//!
//! [engine]
//! filetypes = ["rust", "all"]
//!
//! [options]
//! "g:author" = "someone"
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Indentation options consulted when rendering multi-line snippet text.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct IndentConfig {
    #[serde(default = "IndentConfig::default_tabstop")]
    pub tabstop: usize,
    #[serde(default)]
    pub softtabstop: usize,
    #[serde(default = "IndentConfig::default_shiftwidth")]
    pub shiftwidth: usize,
    #[serde(default)]
    pub expandtab: bool,
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self {
            tabstop: Self::default_tabstop(),
            softtabstop: 0,
            shiftwidth: Self::default_shiftwidth(),
            expandtab: false,
        }
    }
}

impl IndentConfig {
    const fn default_tabstop() -> usize {
        8
    }
    const fn default_shiftwidth() -> usize {
        8
    }

    /// Columns moved by one shift: `shiftwidth`, else `softtabstop`, else `tabstop`.
    pub fn shift_width(&self) -> usize {
        [self.shiftwidth, self.softtabstop, self.tabstop]
            .into_iter()
            .find(|w| *w > 0)
            .unwrap_or(1)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on mirror/code recomputation passes per edit.
    #[serde(default = "EngineConfig::default_max_passes")]
    pub max_propagation_passes: usize,
    /// Filetypes consulted when selecting candidates, most specific first.
    #[serde(default = "EngineConfig::default_filetypes")]
    pub filetypes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_propagation_passes: Self::default_max_passes(),
            filetypes: Self::default_filetypes(),
        }
    }
}

impl EngineConfig {
    const fn default_max_passes() -> usize {
        64
    }
    fn default_filetypes() -> Vec<String> {
        vec!["all".to_string()]
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    #[serde(default = "ShellConfig::default_program")]
    pub program: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
        }
    }
}

impl ShellConfig {
    fn default_program() -> String {
        "sh".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub indent: IndentConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    /// Named options readable from code fragments (`opt("g:name")`).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub source: Option<PathBuf>,
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("snipline.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("snipline").join("snipline.toml");
    }
    PathBuf::from("snipline.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(
                target: "config",
                path = %path.display(),
                tabstop = file.indent.tabstop,
                shiftwidth = file.indent.shiftwidth,
                expandtab = file.indent.expandtab,
                options = file.options.len(),
                "config_loaded"
            );
            Ok(Config {
                raw: Some(content),
                file,
                source: Some(path),
            })
        }
        Err(err) => {
            // Malformed files fall back to defaults rather than aborting startup.
            warn!(target: "config", path = %path.display(), error = %err, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn indent(&self) -> IndentConfig {
        self.file.indent
    }

    /// Look up a named option. Returns `None` when the option is not defined.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.file.options.get(name).map(String::as_str)
    }
}
