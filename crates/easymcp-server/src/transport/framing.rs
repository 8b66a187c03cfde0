//! Message framing for newline-delimited JSON.

use serde_json::Value;

use easymcp::{McpError, McpResult};

/// Parse a single line of text as a JSON value.
pub fn parse_message(line: &str) -> McpResult<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_line() {
        let value = parse_message("  {\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n").unwrap();
        assert_eq!(value["method"], "ping");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_message("   "), Err(McpError::ParseError(_))));
        assert!(matches!(parse_message("{oops"), Err(McpError::ParseError(_))));
    }

    #[test]
    fn test_frame_is_single_line() {
        let framed = frame_message(&json!({ "a": "line\nbreak" })).unwrap();
        assert!(framed.ends_with('\n'));
        assert_eq!(framed.matches('\n').count(), 1);
    }
}
