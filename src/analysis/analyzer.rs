use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub language: String,
    pub confidence: f64,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub line_start: usize,
    pub line_end: usize,
    pub parameters: Vec<String>,
    pub is_async: bool,
    pub complexity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub line_start: usize,
    pub line_end: usize,
    pub extends: Option<String>,
    pub implements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Function,
    Class,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub line: usize,
    pub scope: Scope,
    pub is_constant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    pub module: String,
    pub imports: Vec<String>,
    pub line: usize,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportInfo {
    pub name: String,
    pub line: usize,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub cyclomatic: usize,
    pub cognitive: usize,
    pub lines_of_code: usize,
    pub maintainability_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeStructure {
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub variables: Vec<VariableInfo>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    pub complexity: ComplexityMetrics,
}

fn re(p: &str) -> Regex {
    Regex::new(p).unwrap()
}

fn language_patterns() -> &'static [(&'static str, Vec<Regex>)] {
    static TABLE: OnceLock<Vec<(&'static str, Vec<Regex>)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            ("javascript", vec![
                re(r"\b(function|const|let|var|async|await)\b|=>"),
                re(r"\bconsole\.log\b|\bdocument\.|\bwindow\."),
                re(r"\b(require|import|export)\b"),
            ]),
            ("typescript", vec![
                re(r"\b(interface|type|enum|namespace)\b"),
                re(r":\s*(string|number|boolean|any|void)\b"),
                re(r"\b(public|private|protected|readonly)\b"),
            ]),
            ("python", vec![
                re(r"\b(def|class|import|from|if __name__|print)\b"),
                re(r"\b(self|cls)\b"),
                re(r"(?m)^\s*#.*$"),
            ]),
            ("java", vec![
                re(r"\b(public|private|protected|static|final|class|interface)\b"),
                re(r"\bSystem\.out\.println\b|\b(String|int|boolean)\b"),
                re(r"\bimport\s+[\w.]+;"),
            ]),
            ("cpp", vec![
                re(r"#include\b|\busing namespace\b|\bstd::"),
                re(r"\b(int|char|float|double|void|bool)\b"),
                re(r"\b(cout|cin|endl)\b"),
            ]),
            ("csharp", vec![
                re(r"\b(using|namespace|public|private|static|class|interface)\b"),
                re(r"\bConsole\.WriteLine\b|\b(string|int|bool)\b"),
                re(r"\[.*\]"),
            ]),
        ]
    })
}

/// Weighted vote over the per-language pattern table. Ties go to the
/// language listed first; confidence is capped at 95.
pub fn detect_language(code: &str) -> LanguageDetection {
    let mut best: Option<(&str, usize, Vec<String>)> = None;
    let mut total = 0usize;

    for (language, patterns) in language_patterns() {
        let mut score = 0;
        let mut features = Vec::new();
        for p in patterns {
            let n = p.find_iter(code).count();
            if n > 0 {
                score += n;
                features.push(format!("{n} {} matches", p.as_str()));
            }
        }
        total += score;
        if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
            best = Some((*language, score, features));
        }
    }

    let (language, score, features) = best.unwrap_or(("javascript", 0, Vec::new()));
    let confidence = if total > 0 { score as f64 / total as f64 * 100.0 } else { 0.0 };

    LanguageDetection {
        language: language.to_string(),
        confidence: confidence.min(95.0),
        features,
    }
}

struct StructurePatterns {
    function: Regex,
    class: Regex,
    variable: Regex,
}

fn structure_patterns(language: &str) -> Option<&'static StructurePatterns> {
    static TABLE: OnceLock<Vec<(&'static str, StructurePatterns)>> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let js_fn = r"function\s+(\w+)|const\s+(\w+)\s*=\s*(?:async\s+)?\(|(\w+)\s*:\s*(?:async\s+)?\(";
        let java_fn = r"(?:public|private|protected)?\s*(?:static\s+)?(?:\w+\s+)?(\w+)\s*\(";
        vec![
            ("javascript", StructurePatterns {
                function: re(js_fn),
                class: re(r"class\s+(\w+)(?:\s+extends\s+(\w+))?"),
                variable: re(r"(?:const|let|var)\s+(\w+)"),
            }),
            ("typescript", StructurePatterns {
                function: re(js_fn),
                class: re(r"class\s+(\w+)(?:\s+extends\s+(\w+))?(?:\s+implements\s+([\w,\s]+))?"),
                variable: re(r"(?:const|let|var)\s+(\w+)(?:\s*:\s*(\w+))?"),
            }),
            ("python", StructurePatterns {
                function: re(r"def\s+(\w+)\s*\("),
                class: re(r"class\s+(\w+)(?:\(([^)]+)\))?:"),
                variable: re(r"(\w+)\s*="),
            }),
            ("java", StructurePatterns {
                function: re(java_fn),
                class: re(r"(?:public\s+)?class\s+(\w+)(?:\s+extends\s+(\w+))?(?:\s+implements\s+([\w,\s]+))?"),
                variable: re(r"(?:public|private|protected)?\s*(?:static\s+)?(?:final\s+)?(\w+)\s+(\w+)"),
            }),
            ("cpp", StructurePatterns {
                function: re(r"(?:\w+\s+)?(\w+)\s*\([^)]*\)\s*\{"),
                class: re(r"class\s+(\w+)(?:\s*:\s*(?:public|private|protected)\s+(\w+))?"),
                variable: re(r"(?:int|char|float|double|bool|string)\s+(\w+)"),
            }),
            ("csharp", StructurePatterns {
                function: re(java_fn),
                class: re(r"(?:public\s+)?class\s+(\w+)(?:\s*:\s*(\w+))?"),
                variable: re(r"(?:public|private|protected)?\s*(?:static\s+)?(?:readonly\s+)?(\w+)\s+(\w+)"),
            }),
        ]
    });
    table.iter().find(|(l, _)| *l == language).map(|(_, p)| p)
}

pub fn analyze_structure(code: &str, language: &str) -> CodeStructure {
    let lines: Vec<&str> = code.split('\n').collect();
    let patterns = structure_patterns(language);

    CodeStructure {
        functions: patterns.map(|p| extract_functions(&lines, &p.function)).unwrap_or_default(),
        classes: patterns.map(|p| extract_classes(&lines, &p.class)).unwrap_or_default(),
        variables: patterns.map(|p| extract_variables(&lines, &p.variable)).unwrap_or_default(),
        imports: extract_imports(&lines),
        exports: extract_exports(&lines),
        complexity: complexity(code),
    }
}

fn extract_functions(lines: &[&str], pattern: &Regex) -> Vec<FunctionInfo> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let caps = pattern.captures(line)?;
            let name = (1..=3).find_map(|g| caps.get(g))?.as_str().to_string();
            Some(FunctionInfo {
                name,
                line_start: i + 1,
                line_end: block_end(lines, i),
                parameters: parameters(line),
                is_async: line.contains("async"),
                complexity: function_complexity(lines, i),
            })
        })
        .collect()
}

fn extract_classes(lines: &[&str], pattern: &Regex) -> Vec<ClassInfo> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let caps = pattern.captures(line)?;
            Some(ClassInfo {
                name: caps.get(1)?.as_str().to_string(),
                line_start: i + 1,
                line_end: block_end(lines, i),
                extends: caps.get(2).map(|m| m.as_str().trim().to_string()),
                implements: caps
                    .get(3)
                    .map(|m| m.as_str().split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

fn extract_variables(lines: &[&str], pattern: &Regex) -> Vec<VariableInfo> {
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let is_constant = ["const", "final", "readonly"].iter().any(|k| line.contains(k));
        for caps in pattern.captures_iter(line) {
            if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                out.push(VariableInfo {
                    name: name.as_str().to_string(),
                    line: i + 1,
                    scope: scope_at(lines, i),
                    is_constant,
                });
            }
        }
    }
    out
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| re(r#"import\s+(?:\{([^}]+)\}|(\w+))\s+from\s+['"]([^'"]+)['"]"#))
}

fn export_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| re(r"export\s+(?:default\s+)?(?:function\s+|class\s+|const\s+|let\s+|var\s+)?(\w+)"))
}

fn extract_imports(lines: &[&str]) -> Vec<ImportInfo> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| {
            let t = l.trim_start();
            t.starts_with("import") || t.starts_with("from")
        })
        .filter_map(|(i, line)| {
            let caps = import_regex().captures(line)?;
            let imports = match (caps.get(1), caps.get(2)) {
                (Some(named), _) => named.as_str().split(',').map(|s| s.trim().to_string()).collect(),
                (None, Some(default)) => vec![default.as_str().to_string()],
                _ => Vec::new(),
            };
            Some(ImportInfo {
                module: caps.get(3)?.as_str().to_string(),
                imports,
                line: i + 1,
                is_default: caps.get(2).is_some(),
            })
        })
        .collect()
}

fn extract_exports(lines: &[&str]) -> Vec<ExportInfo> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.trim_start().starts_with("export"))
        .filter_map(|(i, line)| {
            let caps = export_regex().captures(line)?;
            Some(ExportInfo {
                name: caps.get(1)?.as_str().to_string(),
                line: i + 1,
                is_default: line.contains("default"),
            })
        })
        .collect()
}

/// 1-based line where the brace block opened at `start` closes; the start
/// line itself when no block opens.
pub fn block_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i64 = 0;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;
        if opens > 0 {
            depth += opens;
            opened = true;
        }
        if closes > 0 {
            depth -= closes;
            if opened && depth == 0 {
                return i + 1;
            }
        }
    }
    start + 1
}

fn parameters(line: &str) -> Vec<String> {
    let Some(open) = line.find('(') else { return Vec::new() };
    let rest = &line[open + 1..];
    let Some(close) = rest.find(')') else { return Vec::new() };
    rest[..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn decision_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| re(r"\b(if|else|while|for|switch|case|catch)\b|&&|\|\|"))
}

fn cognitive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| re(r"\b(if|else|while|for|switch|case|catch|try)\b|&&|\|\|"))
}

fn function_complexity(lines: &[&str], start: usize) -> usize {
    let end = block_end(lines, start);
    1 + lines[start..end.max(start + 1).min(lines.len())]
        .iter()
        .filter(|l| decision_regex().is_match(l))
        .count()
}

fn scope_at(lines: &[&str], index: usize) -> Scope {
    for line in lines[..=index].iter().rev() {
        if line.contains("function") || line.contains("def") {
            return Scope::Function;
        }
        if line.contains("class") {
            return Scope::Class;
        }
        if line.contains('{') {
            return Scope::Block;
        }
    }
    Scope::Global
}

pub fn complexity(code: &str) -> ComplexityMetrics {
    let loc = code.split('\n').filter(|l| !l.trim().is_empty()).count();
    let cyclomatic = decision_regex().find_iter(code).count() + 1;
    let cognitive = cognitive_regex().find_iter(code).count();

    ComplexityMetrics {
        cyclomatic,
        cognitive,
        lines_of_code: loc,
        maintainability_index: maintainability_index(loc, cyclomatic, cognitive),
    }
}

/// 0..=100; loses up to 30 points for size and up to 40 for branching.
pub fn maintainability_index(loc: usize, cyclomatic: usize, cognitive: usize) -> f64 {
    let loc_penalty = (loc as f64 * 0.1).min(30.0);
    let complexity_penalty = ((cyclomatic + cognitive) as f64 * 2.0).min(40.0);
    (100.0 - loc_penalty - complexity_penalty).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_python_with_high_confidence() {
        let code = "def saludar(self):\n    # saludo\n    print('hola')\n";
        let d = detect_language(code);
        assert_eq!(d.language, "python");
        assert!(d.confidence > 50.0);
        assert!(d.confidence <= 95.0);
    }

    #[test]
    fn no_hits_means_zero_confidence() {
        let d = detect_language("");
        assert_eq!(d.confidence, 0.0);
        assert!(d.features.is_empty());
    }

    #[test]
    fn js_structure() {
        let code = "import { a, b } from './util';\nexport function sumar(x, y) {\n  if (x && y) {\n    return x + y;\n  }\n  return 0;\n}\nconst total = sumar(1, 2);\nclass Caja extends Base {\n}\n";
        let s = analyze_structure(code, "javascript");

        assert_eq!(s.imports.len(), 1);
        assert_eq!(s.imports[0].module, "./util");
        assert_eq!(s.imports[0].imports, vec!["a", "b"]);
        assert!(!s.imports[0].is_default);

        assert_eq!(s.exports[0].name, "sumar");
        let f = &s.functions[0];
        assert_eq!((f.name.as_str(), f.line_start, f.line_end), ("sumar", 2, 7));
        assert_eq!(f.parameters, vec!["x", "y"]);
        assert_eq!(f.complexity, 2);

        assert_eq!(s.classes[0].name, "Caja");
        assert_eq!(s.classes[0].extends.as_deref(), Some("Base"));
        assert!(s.variables.iter().any(|v| v.name == "total" && v.is_constant));
    }

    #[test]
    fn complexity_counts_branches() {
        let m = complexity("if (a || b) {\n} else {\n  try { x() } catch (e) {}\n}\n");
        // if, ||, else, catch
        assert_eq!(m.cyclomatic, 5);
        assert_eq!(m.cognitive, 5);
        assert_eq!(m.lines_of_code, 4);
        assert!((m.maintainability_index - (100.0 - 0.4 - 20.0)).abs() < 1e-9);
    }

    #[test]
    fn maintainability_is_floored() {
        assert_eq!(maintainability_index(10_000, 100, 100), 30.0);
        assert_eq!(maintainability_index(0, 1, 0), 98.0);
    }

    #[test]
    fn unknown_language_still_measures() {
        let s = analyze_structure("SELECT 1;", "sql");
        assert!(s.functions.is_empty());
        assert_eq!(s.complexity.lines_of_code, 1);
    }
}
