//! Container options.
//!
//! Options can be set in code, read from environment variables, or (with the
//! `config` feature) parsed from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default bound on nested resolution depth.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Options applied when a [`ComponentCollection`](crate::ComponentCollection)
/// registers definitions and opens a container.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::ContainerOptions;
///
/// let options = ContainerOptions::default()
///     .allow_overriding(true)
///     .eager_singletons(true);
/// assert!(options.allow_overriding);
/// assert_eq!(options.max_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct ContainerOptions {
    /// Replace a definition registered twice from the same source instead of
    /// failing with `DuplicateRegistration`
    pub allow_overriding: bool,
    /// Build every singleton during `open()` instead of on first lookup
    pub eager_singletons: bool,
    /// Maximum nesting of constructions before `DepthExceeded`
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            allow_overriding: false,
            eager_singletons: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ContainerOptions {
    pub fn allow_overriding(mut self, allow: bool) -> Self {
        self.allow_overriding = allow;
        self
    }

    pub fn eager_singletons(mut self, eager: bool) -> Self {
        self.eager_singletons = eager;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Defaults overridden by `{prefix}ALLOW_OVERRIDING`,
    /// `{prefix}EAGER_SINGLETONS` and `{prefix}MAX_DEPTH`.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        let mut options = Self::default();
        if let Some(value) = read_env(prefix, "ALLOW_OVERRIDING") {
            options.allow_overriding = parse_bool(&value)?;
        }
        if let Some(value) = read_env(prefix, "EAGER_SINGLETONS") {
            options.eager_singletons = parse_bool(&value)?;
        }
        if let Some(value) = read_env(prefix, "MAX_DEPTH") {
            options.max_depth = value
                .parse()
                .map_err(|_| DiError::InvalidConfiguration(format!("MAX_DEPTH is not a number: {value}")))?;
        }
        options.validate()
    }

    /// Parses options from a JSON object; missing fields keep their defaults.
    ///
    /// ```rust
    /// # #[cfg(feature = "config")] {
    /// use ferrous_ioc::ContainerOptions;
    ///
    /// let options = ContainerOptions::from_json_str(r#"{ "eager_singletons": true }"#).unwrap();
    /// assert!(options.eager_singletons);
    /// assert!(!options.allow_overriding);
    /// # }
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| DiError::InvalidConfiguration(e.to_string()))?;
        options.validate()
    }

    fn validate(self) -> DiResult<Self> {
        if self.max_depth == 0 {
            return Err(DiError::InvalidConfiguration("max_depth must be at least 1".into()));
        }
        Ok(self)
    }
}

fn read_env(prefix: &str, name: &str) -> Option<String> {
    env::var(format!("{prefix}{name}")).ok()
}

fn parse_bool(value: &str) -> DiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DiError::InvalidConfiguration(format!("not a boolean: {other}"))),
    }
}
