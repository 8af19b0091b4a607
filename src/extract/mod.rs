use regex::Regex;

use crate::prompt::language_from_path;
use crate::wire::{FileOrigin, GeneratedFile};

pub mod json;
mod placeholder;

pub use json::{clean_json, extract_json_object, parse_json_object};
pub use placeholder::default_content;

/// Result of pulling a file body out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Generated(String),
    Fallback { content: String, reason: String },
}

impl Extraction {
    pub fn content(&self) -> &str {
        match self {
            Extraction::Generated(c) => c,
            Extraction::Fallback { content, .. } => content,
        }
    }

    pub fn into_content(self) -> String {
        match self {
            Extraction::Generated(c) => c,
            Extraction::Fallback { content, .. } => content,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback { .. })
    }

    pub fn into_file(self, path: &str) -> GeneratedFile {
        let language = language_from_path(path);
        match self {
            Extraction::Generated(content) => {
                GeneratedFile::new(path, content, language, FileOrigin::Generated)
            }
            Extraction::Fallback { content, reason } => {
                GeneratedFile::new(path, content, language, FileOrigin::Fallback { reason })
            }
        }
    }
}

fn fence_regex(language: &str) -> Option<Regex> {
    // The tag is either the inferred language or a bare info word on its own
    // line; code sharing the opening line stays in the body. The lazy body
    // stops at the first closing fence.
    let pattern = format!(
        r"(?is)```(?:{}\b|[\w+#.-]*[^\S\n]*\n)?\s*(.*?)\s*```",
        regex::escape(language)
    );
    Regex::new(&pattern).ok()
}

/// Fenced block, else the trimmed reply, else a placeholder for the path's
/// extension. Never fails.
pub fn extract_code_content(response: &str, path: &str) -> Extraction {
    if !response.trim().is_empty() {
        let language = language_from_path(path);
        if let Some(body) = fence_regex(&language)
            .as_ref()
            .and_then(|re| re.captures(response))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
        {
            return Extraction::Generated(body.to_string());
        }

        return Extraction::Generated(response.trim().to_string());
    }

    tracing::warn!(path, "no usable content in reply, substituting placeholder");
    Extraction::Fallback {
        content: default_content(path),
        reason: "empty model response".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_with_matching_tag() {
        let reply = "Aquí está:\n```html\n<h1>Panadería</h1>\n```\nSaludos";
        assert_eq!(
            extract_code_content(reply, "index.html"),
            Extraction::Generated("<h1>Panadería</h1>".into())
        );
    }

    #[test]
    fn foreign_tag_is_not_part_of_the_body() {
        let reply = "```python\nprint('hola')\n```";
        let got = extract_code_content(reply, "index.html");
        assert_eq!(got.content(), "print('hola')");
    }

    #[test]
    fn code_on_the_opening_fence_line_is_kept() {
        let reply = "```const a = 1;\nconst b = 2;\n```";
        assert_eq!(extract_code_content(reply, "app.js").content(), "const a = 1;\nconst b = 2;");
        assert_eq!(extract_code_content("```c++ \nint x;\n```", "main.cpp").content(), "int x;");
    }

    #[test]
    fn first_block_wins() {
        let reply = "```css\na{}\n```\n```css\nb{}\n```";
        assert_eq!(extract_code_content(reply, "styles.css").content(), "a{}");
    }

    #[test]
    fn raw_text_when_no_fence() {
        let got = extract_code_content("  body { margin: 0 }\n", "styles.css");
        assert_eq!(got, Extraction::Generated("body { margin: 0 }".into()));
    }

    #[test]
    fn empty_fence_falls_back_to_raw_text() {
        let got = extract_code_content("```js\n```", "app.js");
        assert_eq!(got.content(), "```js\n```");
        assert!(!got.is_fallback());
    }

    #[test]
    fn blank_reply_gets_placeholder_per_extension() {
        let html = extract_code_content("   ", "site/about.html");
        assert!(html.is_fallback());
        assert!(html.content().contains("<title>CODESTORM - about</title>"));
        assert!(html.content().contains("lang=\"es\""));

        let js = extract_code_content("", "src/app.ts");
        assert!(js.content().contains("Archivo app.ts cargado correctamente"));
        assert!(js.content().contains("DOMContentLoaded"));

        let css = extract_code_content("", "styles.css");
        assert!(css.content().contains(".codestorm-primary"));

        let other = extract_code_content("", "main.py");
        assert!(other.content().ends_with("Tipo de archivo: py"));
    }

    #[test]
    fn fallback_origin_flows_into_file() {
        let f = extract_code_content("", "index.html").into_file("index.html");
        assert!(f.is_fallback());
        assert_eq!(f.language, "html");
    }
}
