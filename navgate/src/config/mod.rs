// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads navgate.yaml, validates structure, resolves variable interpolation
// and fills in defaults for every optional section.

pub mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{AddressBarConfig, ClassifierConfig, Config, InterceptionConfig};
