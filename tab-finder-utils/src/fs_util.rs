use std::{any::type_name, io::ErrorKind, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Parses a TOML file.  Errors name the file and the target type.
pub fn read_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let content = fs_err::read_to_string(path)?;
    toml::from_str(&content)
        .with_context(|| format!("{path:?} is not a valid {}", type_name::<T>()))
}

/// Reads a whole file, mapping "not found" to `Ok(None)`.
pub fn read_to_string_if_exists(path: impl AsRef<Path>) -> std::io::Result<Option<String>> {
    match fs_err::read_to_string(path.as_ref()) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
