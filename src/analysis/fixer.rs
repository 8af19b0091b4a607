use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::detector::{CodeError, ErrorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Fix,
    Improvement,
    Optimization,
}

impl From<ErrorType> for ChangeKind {
    fn from(t: ErrorType) -> Self {
        match t {
            ErrorType::Syntax | ErrorType::Logic | ErrorType::Security => ChangeKind::Fix,
            ErrorType::Performance => ChangeKind::Optimization,
            ErrorType::Style => ChangeKind::Improvement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionChange {
    pub id: String,
    pub line_number: usize,
    pub original_code: String,
    pub corrected_code: String,
    pub reason: String,
    pub kind: ChangeKind,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementsSummary {
    pub syntax_fixes: usize,
    pub logic_improvements: usize,
    pub security_fixes: usize,
    pub performance_optimizations: usize,
    pub style_improvements: usize,
}

impl ImprovementsSummary {
    fn count(&mut self, kind: ErrorType) {
        match kind {
            ErrorType::Syntax => self.syntax_fixes += 1,
            ErrorType::Logic => self.logic_improvements += 1,
            ErrorType::Security => self.security_fixes += 1,
            ErrorType::Performance => self.performance_optimizations += 1,
            ErrorType::Style => self.style_improvements += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.syntax_fixes
            + self.logic_improvements
            + self.security_fixes
            + self.performance_optimizations
            + self.style_improvements
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeGenerationResult {
    pub corrected_code: String,
    pub changes: Vec<CorrectionChange>,
    pub explanations: Vec<String>,
    pub improvements_summary: ImprovementsSummary,
    pub quality_score: f64,
    pub maintainability_improvement: f64,
}

fn re(p: &str) -> Regex {
    Regex::new(p).unwrap()
}

macro_rules! cached {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| re($pat))
        }
    };
}

cached!(var_kw, r"var\s+");
cached!(let_kw, r"let\s+");
cached!(let_name, r"let\s+(\w+)");
cached!(anon_fn, r"function\s*\(([^)]*)\)\s*\{");
cached!(concat, r#"'([^']*)'\s*\+\s*(\w+)|"([^"]*)"\s*\+\s*(\w+)"#);
cached!(length_loop, r"for\s*\(\s*(?:let\s+|var\s+)?(\w+)\s*=\s*0;\s*(\w+)\s*<\s*(\w+)\.length");
cached!(eq_true, r"\s*(?:===?\s*true|true\s*===?)\s*");
cached!(eq_false, r"\s*(?:===?\s*false|false\s*===?)\s*");
cached!(if_cond, r"if\s*\(\s*(.+?)\s*\)");
cached!(camel_word, r"\b[a-z]+[A-Z]\w*\b");
cached!(camel_hump, r"([a-z0-9])([A-Z])");
cached!(py_is_true, r"==\s*True|True\s*==");
cached!(py_def, r"^(\s*)def\s+(\w+)\s*\(([^)]*)\)\s*:");
cached!(py_value_return, r"^\s*return\s+\S");
cached!(complexity_kw, r"\b(if|else|while|for|switch|case|try|catch)\b");
cached!(decl_kw, r"\b(function|def|class)\b");

fn template_literal(line: &str) -> String {
    concat()
        .replace_all(line, |c: &Captures| {
            let (text, var) = match (c.get(1), c.get(2)) {
                (Some(t), Some(v)) => (t.as_str(), v.as_str()),
                _ => (c.get(3).map_or("", |m| m.as_str()), c.get(4).map_or("", |m| m.as_str())),
            };
            format!("`{text}${{{var}}}`")
        })
        .into_owned()
}

fn cache_loop_length(line: &str) -> String {
    length_loop()
        .replace(line, |c: &Captures| {
            if c[1] == c[2] {
                format!("for (let {i} = 0, len = {arr}.length; {i} < len", i = &c[1], arr = &c[3])
            } else {
                c[0].to_string()
            }
        })
        .into_owned()
}

fn drop_bool_comparison(line: &str, negate: bool) -> String {
    let comparison = if negate { eq_false() } else { eq_true() };
    let stripped = comparison.replace_all(line, "");
    if_cond()
        .replace(&stripped, |c: &Captures| {
            if negate { format!("if (!{})", &c[1]) } else { format!("if ({})", &c[1]) }
        })
        .into_owned()
}

fn snake_case(line: &str) -> String {
    camel_word()
        .replace_all(line, |c: &Captures| camel_hump().replace_all(&c[0], "${1}_${2}").to_lowercase())
        .into_owned()
}

/// Named correction for a detector message; `None` when the language has no
/// rule for it.
fn named_rule(language: &str, message: &str, line: &str) -> Option<String> {
    match language {
        "javascript" | "typescript" => match message {
            "Missing semicolon" => Some(format!("{};", line.trim_end())),
            "Use let or const instead of var" => Some(var_kw().replace(line, "const ").into_owned()),
            "Use template literals instead of concatenation" => Some(template_literal(line)),
            "Trailing whitespace" => Some(line.trim_end().to_string()),
            "Use spaces instead of tabs" => Some(line.replace('\t', "  ")),
            "Consider using arrow functions" => Some(anon_fn().replace(line, "($1) => {").into_owned()),
            "Cache array length in loop" => Some(cache_loop_length(line)),
            "Unnecessary comparison with true" => Some(drop_bool_comparison(line, false)),
            "Unnecessary comparison with false" => Some(drop_bool_comparison(line, true)),
            _ => None,
        },
        "python" => match message {
            "Use 4 spaces instead of tabs (PEP 8)" => Some(line.replace('\t', "    ")),
            "Trailing whitespace" => Some(line.trim_end().to_string()),
            "Use snake_case for variables (PEP 8)" => Some(snake_case(line)),
            r#"Use "is True" instead of "== True""# => Some(py_is_true().replace_all(line, "is True").into_owned()),
            _ => None,
        },
        _ => None,
    }
}

/// Suggestions that describe a fix in prose rather than giving the line.
pub fn is_advisory(suggestion: &str) -> bool {
    suggestion.starts_with("Fix: ")
        || suggestion.starts_with("Remove ")
        || suggestion.starts_with("Use `")
        || suggestion.starts_with("Use textContent")
        || suggestion.starts_with("Consider ")
}

/// Applies fixable findings line by line, then the language's second pass.
/// Findings without a named rule fall back to the finding's suggestion when
/// it is a replacement line; prose suggestions only produce an explanation.
pub fn generate_corrected_code(code: &str, errors: &[CodeError], language: &str) -> CodeGenerationResult {
    let original: Vec<&str> = code.split('\n').collect();
    let mut lines: Vec<String> = original.iter().map(|s| s.to_string()).collect();
    let mut changes = Vec::new();
    let mut explanations = Vec::new();
    let mut summary = ImprovementsSummary::default();

    for (index, error) in errors.iter().enumerate() {
        if !error.fixable || error.line_start == 0 || error.line_start > lines.len() {
            continue;
        }
        let at = error.line_start - 1;
        let (corrected, reason, confidence) = match named_rule(language, &error.message, &lines[at]) {
            Some(fixed) => (fixed, format!("Applied rule: {}", error.message), 0.9),
            None if is_advisory(&error.suggestion) => {
                explanations.push(format!("Line {}: {} → {}", error.line_start, error.message, error.suggestion));
                continue;
            }
            None => (error.suggestion.clone(), format!("Applied suggestion: {}", error.message), 0.7),
        };
        if corrected == lines[at] {
            continue;
        }

        explanations.push(format!("Line {}: {} → {}", error.line_start, error.message, reason));
        changes.push(CorrectionChange {
            id: format!("change-{index}"),
            line_number: error.line_start,
            original_code: original[at].to_string(),
            corrected_code: corrected.clone(),
            reason,
            kind: error.kind.into(),
            confidence,
        });
        summary.count(error.kind);
        lines[at] = corrected;
    }

    let before = changes.len();
    match language {
        "javascript" | "typescript" => javascript_pass(&mut lines, &mut changes, &mut explanations),
        "python" => python_pass(&mut lines, &mut changes, &mut explanations),
        _ => {}
    }
    summary.style_improvements += changes.len() - before;

    let corrected_code = lines.join("\n");
    CodeGenerationResult {
        quality_score: quality_score(code, &corrected_code),
        maintainability_improvement: maintainability_improvement(code, &corrected_code),
        corrected_code,
        changes,
        explanations,
        improvements_summary: summary,
    }
}

fn improvement(index: usize, from: &str, to: &str, reason: &str, confidence: f64) -> CorrectionChange {
    CorrectionChange {
        id: format!("improvement-{index}"),
        line_number: index + 1,
        original_code: from.to_string(),
        corrected_code: to.to_string(),
        reason: reason.to_string(),
        kind: ChangeKind::Improvement,
        confidence,
    }
}

fn javascript_pass(lines: &mut [String], changes: &mut Vec<CorrectionChange>, explanations: &mut Vec<String>) {
    for i in 0..lines.len() {
        let line = lines[i].clone();
        if line.contains("function(") && !line.contains("function ") {
            let arrow = anon_fn().replace(&line, "($1) => {").into_owned();
            if arrow != line {
                changes.push(improvement(i, &line, &arrow, "Converted to arrow function for better readability", 0.8));
                explanations.push(format!("Line {}: Converted to arrow function", i + 1));
                lines[i] = arrow;
            }
        }

        let line = lines[i].clone();
        if let Some(caps) = let_name().captures(&line) {
            let name = &caps[1];
            let tail = &line[caps.get(0).map_or(line.len(), |m| m.end())..];
            if !is_reassigned(tail, &lines[i + 1..], name) {
                let as_const = let_kw().replace(&line, "const ").into_owned();
                changes.push(improvement(i, &line, &as_const, "Changed to const as variable is not reassigned", 0.9));
                explanations.push(format!("Line {}: Changed let to const", i + 1));
                lines[i] = as_const;
            }
        }
    }
}

/// Assignment, compound assignment or increment of `name` after its
/// declaration: in the rest of the declaring line or in later lines.
fn is_reassigned(tail: &str, rest: &[String], name: &str) -> bool {
    let n = regex::escape(name);
    let assign = re(&format!(r"(?:^|[^\w.]){n}\s*(?:[-+*/%&|^]|\*\*|<<|>>|\?\?|&&|\|\|)?=(?:[^=]|$)"));
    let step = re(&format!(r"(?:\+\+|--)\s*{n}\b|\b{n}\s*(?:\+\+|--)"));
    let redeclared = re(&format!(r"\b(?:let|const|var)\s+{n}\b"));
    std::iter::once(tail)
        .chain(rest.iter().map(String::as_str))
        .filter(|l| !redeclared.is_match(l))
        .any(|l| assign.is_match(l) || step.is_match(l))
}

fn python_pass(lines: &mut [String], changes: &mut Vec<CorrectionChange>, explanations: &mut Vec<String>) {
    for i in 0..lines.len() {
        let line = lines[i].clone();
        if line.contains("->") {
            continue;
        }
        let Some(caps) = py_def().captures(&line) else { continue };
        let indent = caps[1].len();
        let body_returns_value = lines[i + 1..]
            .iter()
            .take_while(|l| l.trim().is_empty() || l.len() - l.trim_start().len() > indent)
            .any(|l| py_value_return().is_match(l));
        if body_returns_value {
            continue;
        }

        let hinted = py_def()
            .replace(&line, |c: &Captures| format!("{}def {}({}) -> None:", &c[1], &c[2], &c[3]))
            .into_owned();
        changes.push(improvement(i, &line, &hinted, "Added type hints for better code documentation", 0.7));
        explanations.push(format!("Line {}: Added type hints", i + 1));
        lines[i] = hinted;
    }
}

fn estimate_complexity(code: &str) -> usize {
    complexity_kw().find_iter(code).count()
        + decl_kw().find_iter(code).count()
        + code.chars().filter(|c| *c == '{' || *c == '}').count()
}

fn complexity_reduction(original: &str, corrected: &str) -> f64 {
    let before = estimate_complexity(original);
    if before == 0 {
        return 0.0;
    }
    let after = estimate_complexity(corrected);
    (before as f64 - after as f64).max(0.0) / before as f64
}

/// 70 base, up to 20 for reduced complexity, up to 12 for kept length.
pub fn quality_score(original: &str, corrected: &str) -> f64 {
    let non_empty = |s: &str| s.split('\n').filter(|l| !l.trim().is_empty()).count();
    let length_factor = (non_empty(corrected) as f64 / non_empty(original).max(1) as f64).min(1.2);
    (70.0 + complexity_reduction(original, corrected) * 20.0 + length_factor * 10.0).min(100.0)
}

pub fn maintainability_improvement(original: &str, corrected: &str) -> f64 {
    complexity_reduction(original, corrected) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detector::analyze_code;

    fn fix(code: &str, language: &str) -> CodeGenerationResult {
        let found = analyze_code(code, language);
        generate_corrected_code(code, &found.errors, language)
    }

    #[test]
    fn var_becomes_const() {
        let r = fix("var x = 1", "javascript");
        assert_eq!(r.corrected_code, "const x = 1");
        let c = &r.changes[0];
        assert_eq!(c.kind, ChangeKind::Improvement);
        assert_eq!(c.confidence, 0.9);
        assert_eq!(c.original_code, "var x = 1");
        assert_eq!(r.improvements_summary.style_improvements, 1);
    }

    #[test]
    fn let_kept_when_reassigned() {
        let r = fix("let n = 0;\nn += 1;\nlet m = 2;\nconsole.log(m);", "javascript");
        assert!(r.corrected_code.starts_with("let n = 0;"));
        assert!(r.corrected_code.contains("const m = 2;"));
        assert!(is_reassigned("", &["i++".to_string()], "i"));
        assert!(!is_reassigned("", &["if (i == 2) {}".to_string()], "i"));
    }

    #[test]
    fn let_kept_when_reassigned_on_its_own_line() {
        let code = "let total = 0;\nfor (let i = 0; i < 3; i++) {\n  total += i;\n}";
        let r = fix(code, "javascript");
        assert!(r.corrected_code.contains("for (let i = 0; i < 3; i++) {"));
        assert!(r.corrected_code.starts_with("let total = 0;"));

        let r = fix("let n = 0; n += 1;\nconsole.log(n);", "javascript");
        assert!(r.corrected_code.starts_with("let n = 0; n += 1;"));
        assert!(!is_reassigned(" = 0;", &[], "n"));
    }

    #[test]
    fn anonymous_function_becomes_arrow() {
        let r = fix("items.forEach(function(item) {\n  use(item);\n});", "javascript");
        assert!(r.corrected_code.starts_with("items.forEach((item) => {"));
    }

    #[test]
    fn prose_suggestions_do_not_replace_code() {
        let code = "if (ready) {\n  go();\n}";
        let r = fix(code, "javascript");
        assert_eq!(r.corrected_code, code);
        assert!(r.explanations.iter().any(|e| e.contains("Unclosed block")));
    }

    #[test]
    fn python_fixes_and_hints() {
        let code = "def saludar(nombre):\n    print(nombre)\n\ndef doble(x):\n    return x * 2\nmiValor = True == ok";
        let r = fix(code, "python");
        assert!(r.corrected_code.starts_with("def saludar(nombre) -> None:"));
        assert!(r.corrected_code.contains("def doble(x):\n"));
        assert!(r.corrected_code.contains("mi_valor = is True ok"));
    }

    #[test]
    fn rule_helpers() {
        assert_eq!(template_literal("msg = 'Hola ' + nombre;"), "msg = `Hola ${nombre}`;");
        assert_eq!(
            cache_loop_length("for (let i = 0; i < items.length; i++) {"),
            "for (let i = 0, len = items.length; i < len; i++) {"
        );
        assert_eq!(drop_bool_comparison("if (done == true) {", false), "if (done) {");
        assert_eq!(drop_bool_comparison("if (done == false) {", true), "if (!done) {");
    }

    #[test]
    fn metrics_guard_empty_input() {
        assert_eq!(maintainability_improvement("", ""), 0.0);
        assert_eq!(quality_score("a", "a"), 80.0);
        let q = quality_score("if (a) { b() }", "b()");
        assert!(q > 80.0 && q <= 100.0);
    }
}
