use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(source_name: &str, src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| Error::Config {
        source_name: source_name.to_string(),
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

/// Read a JSON side file (mapping, type map, partitions).
pub fn from_file_with_path<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let src = std::fs::read_to_string(file)?;
    from_str_with_path(&file.to_string_lossy(), &src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn errors_name_the_offending_key() {
        let err = from_str_with_path::<IndexMap<String, String>>("mapping.json", r#"{"a": "x", "b": 3}"#)
            .unwrap_err();
        match err {
            Error::Config { source_name, path, .. } => {
                assert_eq!(source_name, "mapping.json");
                assert_eq!(path, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn key_order_is_preserved() {
        let m: IndexMap<String, String> = from_str_with_path("p", r#"{"z": "INT", "a": "DATE"}"#).unwrap();
        assert_eq!(m.keys().collect::<Vec<_>>(), ["z", "a"]);
    }
}
