use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(i64),
    String(String),
}

impl OptionValue {
    fn same_kind(&self, other: &OptionValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

const DEFAULTS: &[(&str, fn() -> OptionValue)] = &[
    ("timeout", || OptionValue::Bool(true)),
    ("timeoutlen", || OptionValue::Number(1000)),
    ("maxmapdepth", || OptionValue::Number(1000)),
    ("selection", || OptionValue::String("inclusive".into())),
    ("virtualedit", || OptionValue::String(String::new())),
    ("ignorecase", || OptionValue::Bool(false)),
    ("shiftwidth", || OptionValue::Number(4)),
    ("wrapscan", || OptionValue::Bool(true)),
];

/// Option values: global settings plus per-session overrides.
#[derive(Clone, Debug)]
pub struct Options {
    global: BTreeMap<String, OptionValue>,
    local: BTreeMap<String, OptionValue>,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    pub fn new() -> Self {
        Self {
            global: DEFAULTS
                .iter()
                .map(|(name, value)| (name.to_string(), value()))
                .collect(),
            local: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.local.get(name).or_else(|| self.global.get(name))
    }

    fn check(&self, name: &str, value: &OptionValue) -> Result<()> {
        match self.global.get(name) {
            None => Err(Error::Config(format!("unknown option '{name}'"))),
            Some(current) if !current.same_kind(value) => {
                Err(Error::Config(format!("wrong value type for '{name}'")))
            }
            Some(_) => Ok(()),
        }
    }

    pub fn set(&mut self, name: &str, value: OptionValue) -> Result<()> {
        self.check(name, &value)?;
        self.global.insert(name.to_string(), value);
        Ok(())
    }

    /// Overrides an option for this session only.
    pub fn set_local(&mut self, name: &str, value: OptionValue) -> Result<()> {
        self.check(name, &value)?;
        self.local.insert(name.to_string(), value);
        Ok(())
    }

    pub fn clear_local(&mut self, name: &str) {
        self.local.remove(name);
    }

    fn bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(OptionValue::Bool(true)))
    }

    fn number(&self, name: &str) -> i64 {
        match self.get(name) {
            Some(OptionValue::Number(n)) => *n,
            _ => 0,
        }
    }

    fn string(&self, name: &str) -> &str {
        match self.get(name) {
            Some(OptionValue::String(s)) => s,
            _ => "",
        }
    }

    // ── Typed accessors ─────────────────────────────────────────────────

    pub fn timeout(&self) -> bool {
        self.bool("timeout")
    }

    pub fn timeoutlen(&self) -> Duration {
        Duration::from_millis(self.number("timeoutlen").max(0) as u64)
    }

    pub fn maxmapdepth(&self) -> usize {
        self.number("maxmapdepth").max(1) as usize
    }

    pub fn selection_exclusive(&self) -> bool {
        self.string("selection") == "exclusive"
    }

    pub fn virtualedit_onemore(&self) -> bool {
        self.string("virtualedit").split(',').any(|v| v == "onemore" || v == "all")
    }

    pub fn ignorecase(&self) -> bool {
        self.bool("ignorecase")
    }

    pub fn shiftwidth(&self) -> usize {
        self.number("shiftwidth").clamp(1, 64) as usize
    }

    pub fn wrapscan(&self) -> bool {
        self.bool("wrapscan")
    }
}
