// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for flat `key=value` documents.

use crate::domain::{ConfigType, Result};
use crate::ports::ConfigParser;
use std::collections::HashMap;

/// Parser for the default flat key/value format.
///
/// - `key=value`, `key: value` and `key value` are all accepted; the first separator wins
/// - lines starting with `#` or `!` are comments
/// - a trailing `\` continues the logical line on the next physical line
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::PropertiesParser;
/// use cfgweave::ports::ConfigParser;
///
/// let parsed = PropertiesParser::new().parse("# db\ndatabase.host = localhost\nport:5432").unwrap();
/// assert_eq!(parsed["database.host"], "localhost");
/// assert_eq!(parsed["port"], "5432");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesParser;

impl PropertiesParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl ConfigParser for PropertiesParser {
    fn parse(&self, content: &str) -> Result<HashMap<String, String>> {
        let mut result = HashMap::new();
        let mut logical = String::new();

        for line in content.lines() {
            let line = if logical.is_empty() {
                line.trim_start()
            } else {
                line.trim()
            };

            if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }

            if let Some(continued) = line.strip_suffix('\\') {
                logical.push_str(continued);
                continue;
            }
            logical.push_str(line);

            if let Some((key, value)) = split_entry(&logical) {
                result.insert(key, value);
            }
            logical.clear();
        }

        if !logical.is_empty() {
            if let Some((key, value)) = split_entry(&logical) {
                result.insert(key, value);
            }
        }

        Ok(result)
    }

    fn supported_types(&self) -> &[ConfigType] {
        &[ConfigType::Properties]
    }
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let at = line.find(|c: char| c == '=' || c == ':' || c.is_whitespace());
    let (key, value) = match at {
        Some(at) => {
            let rest = line[at..].trim_start();
            let rest = rest
                .strip_prefix('=')
                .or_else(|| rest.strip_prefix(':'))
                .unwrap_or(rest);
            (&line[..at], rest.trim_start())
        }
        None => (line, ""),
    };
    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        let parsed = PropertiesParser::new()
            .parse("a=1\nb: 2\nc 3\nd = 4\ne")
            .unwrap();
        assert_eq!(parsed["a"], "1");
        assert_eq!(parsed["b"], "2");
        assert_eq!(parsed["c"], "3");
        assert_eq!(parsed["d"], "4");
        assert_eq!(parsed["e"], "");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let parsed = PropertiesParser::new()
            .parse("# comment\n! also comment\n\n  key=value\n")
            .unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["key"], "value");
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let parsed = PropertiesParser::new()
            .parse("url=jdbc:pg://host:5432/db?x=1")
            .unwrap();
        assert_eq!(parsed["url"], "jdbc:pg://host:5432/db?x=1");
    }

    #[test]
    fn test_line_continuation() {
        let parsed = PropertiesParser::new()
            .parse("list=a,\\\n    b,\\\n    c\nnext=1")
            .unwrap();
        assert_eq!(parsed["list"], "a,b,c");
        assert_eq!(parsed["next"], "1");
    }

    #[test]
    fn test_last_duplicate_wins() {
        let parsed = PropertiesParser::new().parse("KEY=V\nKEY=222").unwrap();
        assert_eq!(parsed["KEY"], "222");
    }
}
