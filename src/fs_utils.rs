use crate::error::{DocfillError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Reads the contents of a file at the given path
///
/// # Errors
///
/// - `DocfillError::FileNotFound` if the path doesn't exist or isn't a file.
/// - `DocfillError::Io` if there's an error reading the file.
pub fn read_file_contents(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DocfillError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    fs::read_to_string(path).map_err(std::convert::Into::into)
}

/// Parses a JSON document into a render context
///
/// # Errors
///
/// - `DocfillError::Json` if the text isn't valid JSON.
/// - `DocfillError::InvalidContext` if the root isn't an object.
pub fn parse_context(json: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(DocfillError::InvalidContext {
            message: format!("root must be a JSON object, found {}", type_name(&value)),
        });
    }
    Ok(value)
}

/// Loads a render context from a JSON file
///
/// # Errors
///
/// Returns errors from `read_file_contents` or `parse_context`.
pub fn load_context(path: &Path) -> Result<Value> {
    let contents = read_file_contents(path)?;
    parse_context(&contents)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_file_contents() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        fs::write(&file_path, "test content").unwrap();
        let result = read_file_contents(&file_path);
        assert_eq!(result.unwrap(), "test content");

        let non_existent = temp_dir.path().join("nonexistent.txt");
        let result = read_file_contents(&non_existent);
        assert!(matches!(result, Err(DocfillError::FileNotFound { .. })));

        // Directories are not templates
        let dir_path = temp_dir.path().join("dir");
        fs::create_dir(&dir_path).unwrap();
        let result = read_file_contents(&dir_path);
        assert!(matches!(result, Err(DocfillError::FileNotFound { .. })));
    }

    #[test]
    fn test_parse_context() {
        let value = parse_context(r#"{"sale": {"total": 10}}"#).unwrap();
        assert_eq!(value, json!({"sale": {"total": 10}}));

        let result = parse_context("[1, 2]");
        assert!(matches!(result, Err(DocfillError::InvalidContext { .. })));
        assert!(result.unwrap_err().to_string().contains("an array"));

        let result = parse_context("{not json");
        assert!(matches!(result, Err(DocfillError::Json(_))));
    }

    #[test]
    fn test_load_context() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("context.json");
        fs::write(&file_path, r#"{"boilerCost": "£24.99"}"#).unwrap();

        let value = load_context(&file_path).unwrap();
        assert_eq!(value["boilerCost"], "£24.99");

        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            load_context(&missing),
            Err(DocfillError::FileNotFound { .. })
        ));
    }
}
