use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

use crate::errors::{Result, StudioError};

fn json_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```json\s*(.*?)\s*```").unwrap())
}

/// A ```json fenced block, else the first balanced `{...}` in the text.
pub fn extract_json_object(text: &str) -> Option<String> {
    if let Some(body) = json_fence().captures(text).and_then(|c| c.get(1)) {
        let body = body.as_str().trim();
        if !body.is_empty() {
            return Some(body.to_string());
        }
    }
    first_balanced_object(text)
}

fn first_balanced_object(s: &str) -> Option<String> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if in_str {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if start.is_some() => in_str = true,
            '{' => {
                start.get_or_insert(i);
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| s[st..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Drops `//` and `/* */` comments and trailing commas outside strings.
pub fn clean_json(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut in_str = false;

    while i < chars.len() {
        let c = chars[i];
        if in_str {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_str = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_str = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            (',', _) => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Locates a JSON object in a model reply and deserializes it, retrying
/// once on the cleaned text.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let raw = extract_json_object(text)
        .ok_or_else(|| StudioError::Generation("no JSON object in response".into()))?;
    match serde_json::from_str(&raw) {
        Ok(v) => Ok(v),
        Err(_) => Ok(serde_json::from_str(&clean_json(&raw))?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn prefers_json_fence() {
        let t = "intro {\"a\":0}\n```json\n{\"b\": 1}\n```";
        assert_eq!(extract_json_object(t).as_deref(), Some("{\"b\": 1}"));
    }

    #[test]
    fn balanced_object_ignores_braces_in_strings() {
        let t = r#"Sure: {"code": "if (x) { y(); }", "n": {"k": 1}} trailing"#;
        let got = extract_json_object(t).unwrap();
        let v: Value = serde_json::from_str(&got).unwrap();
        assert_eq!(v["n"]["k"], 1);
    }

    #[test]
    fn cleans_comments_and_trailing_commas() {
        let dirty = "{\n  // note\n  \"url\": \"http://x.y\", /* c */\n  \"list\": [1, 2,],\n}";
        let v: Value = serde_json::from_str(&clean_json(dirty)).unwrap();
        assert_eq!(v["url"], "http://x.y");
        assert_eq!(v["list"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn parse_retries_on_cleaned_text() {
        let v: Value = parse_json_object("```json\n{\"a\": 1,}\n```").unwrap();
        assert_eq!(v["a"], 1);
        assert!(parse_json_object::<Value>("no json here").is_err());
    }
}
