#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_config::{Config, IndentConfig};
use core_engine::Session;
use core_registry::Registry;
use core_snippet::SnippetOptions;

pub const EX: &str = "<Tab>";
pub const JF: &str = "<C-j>";
pub const JB: &str = "<C-k>";
pub const ESC: &str = "<Esc>";
pub const BS: &str = "<BS>";
pub const LEFT: &str = "<Left>";
pub const RIGHT: &str = "<Right>";
pub const UP: &str = "<Up>";
pub const DOWN: &str = "<Down>";

pub fn registry(snippets: &[(&str, &str)]) -> Registry {
    let mut registry = Registry::new();
    for (trigger, body) in snippets {
        registry
            .add_snippet(trigger, body, "", SnippetOptions::empty())
            .unwrap();
    }
    registry
}

pub fn session(snippets: &[(&str, &str)]) -> Session {
    Session::new(&Config::default(), registry(snippets)).unwrap()
}

/// Feed `keys` into a fresh session and return the buffer text.
pub fn run(snippets: &[(&str, &str)], keys: &[&str]) -> String {
    let mut s = session(snippets);
    s.feed(&keys.concat()).unwrap();
    s.text()
}

pub fn indent_config(tabstop: usize, shiftwidth: usize, expandtab: bool) -> Config {
    let mut config = Config::default();
    config.file.indent = IndentConfig {
        tabstop,
        softtabstop: 0,
        shiftwidth,
        expandtab,
    };
    config
}
