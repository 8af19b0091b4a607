use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Syntax,
    Logic,
    Security,
    Performance,
    Style,
}

impl ErrorType {
    pub const ALL: [ErrorType; 5] = [
        ErrorType::Syntax,
        ErrorType::Logic,
        ErrorType::Security,
        ErrorType::Performance,
        ErrorType::Style,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Syntax => "syntax",
            ErrorType::Logic => "logic",
            ErrorType::Security => "security",
            ErrorType::Performance => "performance",
            ErrorType::Style => "style",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            ErrorType::Syntax => "Syntax",
            ErrorType::Logic => "Logic",
            ErrorType::Security => "Security",
            ErrorType::Performance => "Performance",
            ErrorType::Style => "Style",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ErrorType::Syntax => "Syntax issue detected",
            ErrorType::Logic => "Logic issue detected",
            ErrorType::Security => "Security vulnerability detected",
            ErrorType::Performance => "Performance issue detected",
            ErrorType::Style => "Style issue detected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeError {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ErrorType,
    pub severity: Severity,
    pub message: String,
    pub description: String,
    pub line_start: usize,
    pub line_end: usize,
    pub code: String,
    pub suggestion: String,
    pub fixable: bool,
    pub rule: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChange {
    pub line_number: usize,
    pub old_content: String,
    pub new_content: String,
    pub context: [String; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAnalysisResult {
    pub errors: Vec<CodeError>,
    pub total_issues: usize,
    pub critical_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub diff: Vec<DiffChange>,
}

enum Matcher {
    Re(Regex),
    /// `x == x`; the regex crate has no backreferences.
    SelfCompare,
}

impl Matcher {
    fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Re(re) => re.is_match(line),
            Matcher::SelfCompare => compares_to_itself(line),
        }
    }
}

struct Rule {
    matcher: Matcher,
    message: &'static str,
    severity: Severity,
}

fn rule(pattern: &str, message: &'static str, severity: Severity) -> Rule {
    Rule { matcher: Matcher::Re(Regex::new(pattern).unwrap()), message, severity }
}

type Table = Vec<(ErrorType, Vec<Rule>)>;

fn javascript_rules() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Severity::*;
        vec![
            (ErrorType::Syntax, vec![
                rule(r"\b(var|let|const)\s+(\w+)\s*=\s*$", "Incomplete variable declaration", Error),
                rule(r"function\s+\w+\s*\([^)]*\)\s*$", "Function missing body", Error),
                rule(r"if\s*\([^)]*\)\s*$", "If statement missing body", Error),
                rule(r"\{\s*$", "Unclosed block", Warning),
                rule(r"console\.log\(.*[^;]$", "Missing semicolon", Warning),
            ]),
            (ErrorType::Logic, vec![
                rule(r"if\s*\(\s*true\s*\)", "Condition is always true", Warning),
                rule(r"if\s*\(\s*false\s*\)", "Condition is always false", Warning),
                rule(r"==\s*true|true\s*==", "Unnecessary comparison with true", Info),
                rule(r"==\s*false|false\s*==", "Unnecessary comparison with false", Info),
                Rule { matcher: Matcher::SelfCompare, message: "Variable compared to itself", severity: Warning },
            ]),
            (ErrorType::Security, vec![
                rule(r"eval\s*\(", "Use of eval() is dangerous", Critical),
                rule(r"innerHTML\s*=", "innerHTML can lead to XSS vulnerabilities", Warning),
                rule(r"document\.write\s*\(", "document.write can be dangerous", Warning),
                rule(r#"setTimeout\s*\(\s*["']"#, "setTimeout with string is dangerous", Warning),
            ]),
            (ErrorType::Performance, vec![
                rule(r"for\s*\([^)]*\.length[^)]*\)", "Cache array length in loop", Info),
                rule(r#"\+\s*["']|["']\s*\+"#, "Use template literals instead of concatenation", Info),
                rule(r"new\s+RegExp\s*\(", "Use regex literal instead of RegExp constructor", Info),
            ]),
            (ErrorType::Style, vec![
                rule(r"\t", "Use spaces instead of tabs", Info),
                rule(r"\s+$", "Trailing whitespace", Info),
                rule(r"var\s+", "Use let or const instead of var", Warning),
                rule(r"function\s*\(", "Consider using arrow functions", Info),
            ]),
        ]
    })
}

fn python_rules() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Severity::*;
        vec![
            (ErrorType::Syntax, vec![
                rule(r"def\s+\w+\s*\([^)]*\):\s*$", "Function missing body", Error),
                rule(r"if\s+.*:\s*$", "If statement missing body", Error),
                rule(r"class\s+\w+.*:\s*$", "Class missing body", Error),
            ]),
            (ErrorType::Logic, vec![
                rule(r"if\s+True:", "Condition is always True", Warning),
                rule(r"if\s+False:", "Condition is always False", Warning),
                rule(r"==\s*True|True\s*==", r#"Use "is True" instead of "== True""#, Info),
            ]),
            (ErrorType::Security, vec![
                rule(r"eval\s*\(", "Use of eval() is dangerous", Critical),
                rule(r"exec\s*\(", "Use of exec() is dangerous", Critical),
                rule(r"input\s*\(", "input() can be dangerous in Python 2", Warning),
            ]),
            (ErrorType::Style, vec![
                rule(r"\t", "Use 4 spaces instead of tabs (PEP 8)", Info),
                rule(r"\s+$", "Trailing whitespace", Info),
                rule(r"^[a-z]+[A-Z]", "Use snake_case for variables (PEP 8)", Info),
            ]),
        ]
    })
}

fn rules_for(language: &str) -> Option<&'static Table> {
    match language {
        "javascript" | "typescript" => Some(javascript_rules()),
        "python" => Some(python_rules()),
        _ => None,
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True when some `==` has the same word run on both sides, as
/// `(\w+)\s*==\s*\1` would match.
fn compares_to_itself(line: &str) -> bool {
    line.match_indices("==").any(|(i, _)| {
        let left = line[..i].trim_end();
        let word_start = left
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_word(*c))
            .last()
            .map(|(j, _)| j);
        let Some(start) = word_start else { return false };
        let word = &left[start..];
        let right = line[i + 2..].trim_start();
        (0..word.len()).any(|k| right.starts_with(&word[k..]))
    })
}

/// Replacement text offered for a finding.
pub fn suggestion_for(line: &str, message: &str) -> String {
    match message {
        "Missing semicolon" => format!("{line};"),
        "Use let or const instead of var" => line.replacen("var ", "const ", 1).replacen("var\t", "const ", 1),
        "Use template literals instead of concatenation" => "Use `${variable}` syntax instead".into(),
        "Trailing whitespace" => line.trim_end().to_string(),
        "Use spaces instead of tabs" => line.replace('\t', "  "),
        "Condition is always true" => "Remove unnecessary condition".into(),
        "Condition is always false" => "Remove unreachable code".into(),
        "Use of eval() is dangerous" => "Consider safer alternatives like JSON.parse()".into(),
        "innerHTML can lead to XSS vulnerabilities" => "Use textContent or sanitize input".into(),
        other => format!("Fix: {other}"),
    }
}

/// Line scan over the rule tables: one finding per (line, rule) match, in
/// category order. Languages without a table yield no findings.
pub fn analyze_code(code: &str, language: &str) -> ErrorAnalysisResult {
    let lines: Vec<&str> = code.split('\n').collect();
    let mut errors = Vec::new();

    if let Some(table) = rules_for(language) {
        for (kind, rules) in table {
            for (index, line) in lines.iter().enumerate() {
                for (rule_index, r) in rules.iter().enumerate() {
                    if !r.matcher.is_match(line) {
                        continue;
                    }
                    errors.push(CodeError {
                        id: format!("{}-{index}-{rule_index}", kind.as_str()),
                        kind: *kind,
                        severity: r.severity,
                        message: r.message.to_string(),
                        description: format!("{}: {}", kind.describe(), r.message),
                        line_start: index + 1,
                        line_end: index + 1,
                        code: line.trim().to_string(),
                        suggestion: suggestion_for(line, r.message),
                        fixable: *kind != ErrorType::Security,
                        rule: format!("{}-{rule_index}", kind.as_str()),
                        category: kind.category().to_string(),
                    });
                }
            }
        }
    }
    tracing::debug!(language, findings = errors.len(), "error scan finished");

    let count = |s: Severity| errors.iter().filter(|e| e.severity == s).count();
    ErrorAnalysisResult {
        total_issues: errors.len(),
        critical_count: count(Severity::Critical),
        error_count: count(Severity::Error),
        warning_count: count(Severity::Warning),
        info_count: count(Severity::Info),
        diff: diff(&lines, &errors),
        errors,
    }
}

fn diff(lines: &[&str], errors: &[CodeError]) -> Vec<DiffChange> {
    let at = |i: Option<usize>| i.and_then(|i| lines.get(i)).map(|s| s.to_string()).unwrap_or_default();
    errors
        .iter()
        .filter(|e| e.fixable && e.suggestion != e.code)
        .map(|e| DiffChange {
            line_number: e.line_start,
            old_content: e.code.clone(),
            new_content: e.suggestion.clone(),
            context: [at(e.line_start.checked_sub(2)), at(Some(e.line_start - 1)), at(Some(e.line_start))],
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct Categorized<'a> {
    pub critical: Vec<&'a CodeError>,
    pub errors: Vec<&'a CodeError>,
    pub warnings: Vec<&'a CodeError>,
    pub info: Vec<&'a CodeError>,
}

pub fn categorize(errors: &[CodeError]) -> Categorized<'_> {
    let mut out = Categorized::default();
    for e in errors {
        match e.severity {
            Severity::Critical => out.critical.push(e),
            Severity::Error => out.errors.push(e),
            Severity::Warning => out.warnings.push(e),
            Severity::Info => out.info.push(e),
        }
    }
    out
}

pub fn report(result: &ErrorAnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Code Analysis Report");
    let _ = writeln!(out, "===================");
    let _ = writeln!(out, "Total Issues: {}", result.total_issues);
    let _ = writeln!(out, "Critical: {}", result.critical_count);
    let _ = writeln!(out, "Errors: {}", result.error_count);
    let _ = writeln!(out, "Warnings: {}", result.warning_count);
    let _ = writeln!(out, "Suggestions: {}", result.info_count);
    out.push('\n');
    for e in &result.errors {
        let _ = writeln!(out, "Line {}: {} - {}", e.line_start, e.severity.as_str().to_uppercase(), e.message);
    }
    out.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Cheap structural checks; not a parser.
pub fn validate_syntax(code: &str, language: &str) -> SyntaxCheck {
    let mut errors = Vec::new();
    match language {
        "javascript" | "typescript" => {
            if code.contains("function") && !code.contains('{') {
                errors.push("Function declaration missing opening brace".to_string());
            }
        }
        "python" => {
            let lines: Vec<&str> = code.split('\n').collect();
            if let Some(last) = lines.last() {
                if last.trim().ends_with(':') {
                    errors.push(format!("Line {}: Statement missing body", lines.len()));
                }
            }
        }
        _ => {}
    }
    SyntaxCheck { is_valid: errors.is_empty(), errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_gets_style_warning() {
        let r = analyze_code("var x = 1", "javascript");
        let var = r
            .errors
            .iter()
            .find(|e| e.message == "Use let or const instead of var")
            .unwrap();
        assert_eq!(var.severity, Severity::Warning);
        assert_eq!(var.kind, ErrorType::Style);
        assert_eq!(var.id, "style-0-2");
        assert_eq!(var.suggestion, "const x = 1");
        assert!(var.fixable);
    }

    #[test]
    fn security_findings_are_not_fixable() {
        let r = analyze_code("eval(userInput);", "typescript");
        let e = &r.errors[0];
        assert_eq!(e.kind, ErrorType::Security);
        assert_eq!(e.severity, Severity::Critical);
        assert!(!e.fixable);
        assert_eq!(r.critical_count, 1);
        assert!(r.diff.iter().all(|d| d.old_content != "eval(userInput);"));
    }

    #[test]
    fn one_finding_per_rule_no_dedup() {
        let r = analyze_code("x = 1 \ny = 2 ", "python");
        let trailing: Vec<_> = r.errors.iter().filter(|e| e.message == "Trailing whitespace").collect();
        assert_eq!(trailing.len(), 2);
        assert_eq!(trailing[1].line_start, 2);
        assert_eq!(r.total_issues, r.errors.len());
    }

    #[test]
    fn clean_code_has_no_findings() {
        let r = analyze_code("const total = sumar(1, 2);", "javascript");
        assert_eq!(r.total_issues, 0);
        assert!(r.diff.is_empty());
        assert_eq!(analyze_code("int main() {}", "cpp").total_issues, 0);
    }

    #[test]
    fn self_comparison_without_backreferences() {
        assert!(compares_to_itself("if (a == a) {"));
        assert!(compares_to_itself("ok = count==count2"));
        assert!(!compares_to_itself("if (a === a) {"));
        assert!(!compares_to_itself("if (a == b) {"));
    }

    #[test]
    fn diff_carries_context() {
        let r = analyze_code("let a = 1;\nconsole.log(a)\nlet b = 2;", "javascript");
        let d = r.diff.iter().find(|d| d.new_content == "console.log(a);").unwrap();
        assert_eq!(d.line_number, 2);
        assert_eq!(d.context, ["let a = 1;".to_string(), "console.log(a)".into(), "let b = 2;".into()]);
    }

    #[test]
    fn report_and_categories() {
        let r = analyze_code("var s = 'a' + b", "javascript");
        let c = categorize(&r.errors);
        assert_eq!(c.warnings.len(), r.warning_count);
        assert_eq!(c.info.len(), r.info_count);
        let text = report(&r);
        assert!(text.starts_with("Code Analysis Report"));
        assert!(text.contains("Line 1: WARNING - Use let or const instead of var"));
    }

    #[test]
    fn syntax_validation() {
        assert!(!validate_syntax("function f()", "javascript").is_valid);
        assert!(validate_syntax("function f() {}", "javascript").is_valid);
        let py = validate_syntax("x = 1\nif x:", "python");
        assert_eq!(py.errors, vec!["Line 2: Statement missing body".to_string()]);
    }
}
