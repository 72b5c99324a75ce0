//! Reading content units from JSON or JSON Lines.

use std::io::{self, Read};
use std::path::Path;

use crate::error::InputError;
use crate::models::ContentUnit;

/// Read input from a file, or stdin when `file` is `None` or `-`.
pub fn read_input(file: Option<&Path>) -> Result<String, InputError> {
    match file {
        Some(path) if path.to_string_lossy() != "-" => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

/// Parse content units from a JSON array or one JSON object per line.
pub fn parse_units(input: &str) -> Result<Vec<ContentUnit>, InputError> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(Vec::new());
    }

    if input.starts_with('[') {
        return serde_json::from_str(input).map_err(|source| InputError::ParseError { line: 1, source });
    }

    let mut units = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let unit = serde_json::from_str(line)
            .map_err(|source| InputError::ParseError { line: i + 1, source })?;
        units.push(unit);
    }

    Ok(units)
}

/// Read and parse content units in one step.
pub fn read_units(file: Option<&Path>) -> Result<Vec<ContentUnit>, InputError> {
    parse_units(&read_input(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Payload;
    use std::io::Write;

    #[test]
    fn test_parse_jsonl_skips_blank_lines() {
        let input = r#"
{"id":"u1","document_id":"d1","payload":"first"}

{"id":"u2","document_id":"d1","payload":"second","metadata":{"page":2}}
"#;
        let units = parse_units(input).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].metadata["page"], serde_json::json!(2));
    }

    #[test]
    fn test_parse_json_array() {
        let input = r#"[{"id":"u1","document_id":"d1","payload":[1,2,3]}]"#;
        let units = parse_units(input).unwrap();
        assert_eq!(units[0].payload, Payload::Binary(vec![1, 2, 3]));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = "{\"id\":\"u1\",\"document_id\":\"d1\",\"payload\":\"ok\"}\nnot json\n";
        match parse_units(input) {
            Err(InputError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_units_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id":"u1","document_id":"d1","payload":"hello"}}"#).unwrap();

        let units = read_units(Some(file.path())).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id, "u1");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_units("  \n ").unwrap().is_empty());
    }
}
