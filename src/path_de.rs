//! JSON loading with the failing JSON path in the error.
use serde::de::DeserializeOwned;

use crate::error::ImportError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, ImportError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(malformed)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ImportError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(malformed)
}

/// Re-read an already parsed value into a typed model.
pub fn from_value_with_path<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, ImportError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(malformed)
}

fn malformed<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> ImportError {
    let path = err.path().to_string();
    ImportError::Malformed { path, message: err.into_inner().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Fixture {
        name: String,
        sizes: Vec<u32>,
    }

    #[test]
    fn reports_the_failing_path() {
        let src = r#"{"name": "orders", "sizes": [1, "two"]}"#;
        match from_str_with_path::<Fixture>(src) {
            Err(ImportError::Malformed { path, .. }) => assert_eq!(path, "sizes[1]"),
            other => panic!("expected a malformed error, got {other:?}"),
        }
    }

    #[test]
    fn loads_valid_documents() {
        let expr: Expr = from_slice_with_path(br#"{"kind": "path", "path": "input.a"}"#).unwrap();
        assert_eq!(expr, Expr::path("input.a"));
    }
}
