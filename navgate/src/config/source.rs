// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use super::error::ConfigError;

/// Where navgate YAML comes from. Hosts embedding the gate usually ship
/// their config inline; the CLI reads a file.
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;

    /// Short label for log lines.
    fn describe(&self) -> String;
}

pub struct FileSource {
    pub path: PathBuf,
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub struct StringSource {
    pub content: String,
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }

    fn describe(&self) -> String {
        "<inline>".to_string()
    }
}
