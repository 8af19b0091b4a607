use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::analyzer::{self, CodeStructure, LanguageDetection};
use crate::analysis::detector::{self, CodeError, ErrorAnalysisResult};
use crate::analysis::fixer::{self, ChangeKind, CodeGenerationResult, CorrectionChange};
use crate::errors::{Result, StudioError};
use crate::events::{EventSink, Stage};
use crate::extract::parse_json_object;
use crate::prompt::correction_prompt;
use crate::provider::ModelRegistry;

const ANALYZER: &str = "Agente Analizador";
const DETECTOR: &str = "Agente Detector";
const GENERATOR: &str = "Agente Generador";
const SYSTEM: &str = "Sistema";

pub const MAX_CODE_LENGTH: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionOptions {
    pub analyze_security: bool,
    pub analyze_performance: bool,
    pub generate_tests: bool,
    pub explain_changes: bool,
    pub auto_fix: bool,
    pub preserve_formatting: bool,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            analyze_security: true,
            analyze_performance: true,
            generate_tests: false,
            explain_changes: true,
            auto_fix: true,
            preserve_formatting: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusReport {
    pub analyzer: AgentStatus,
    pub detector: AgentStatus,
    pub generator: AgentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub processing_time_ms: u64,
    pub confidence_score: u32,
    pub improvement_percentage: u32,
    pub recommended_actions: Vec<String>,
}

/// Outcome of the optional model pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Refinement {
    Applied { model: String, summary: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionReport {
    pub language_detection: LanguageDetection,
    pub code_structure: CodeStructure,
    pub error_analysis: ErrorAnalysisResult,
    pub code_generation: CodeGenerationResult,
    pub overall_metrics: OverallMetrics,
    pub agent_status: AgentStatusReport,
    pub refinement: Option<Refinement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

pub fn validate_input(code: &str, max_len: usize) -> InputCheck {
    let mut errors = Vec::new();
    if code.trim().is_empty() {
        errors.push("El código no puede estar vacío".to_string());
    }
    if code.chars().count() > max_len {
        errors.push(format!("El código es demasiado largo (máximo {max_len} caracteres)"));
    }
    InputCheck { is_valid: errors.is_empty(), errors }
}

/// Runs detection, structure analysis, error scan and correction in order,
/// reporting progress on the event sink.
pub struct CodeCorrector {
    events: EventSink,
    max_len: usize,
    assist: Option<(Arc<ModelRegistry>, String)>,
}

impl CodeCorrector {
    pub fn new(events: EventSink) -> Self {
        Self { events, max_len: MAX_CODE_LENGTH, assist: None }
    }

    pub fn with_max_length(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Sends the rule-based result through `model` for a second opinion.
    pub fn with_model(mut self, registry: Arc<ModelRegistry>, model: impl Into<String>) -> Self {
        self.assist = Some((registry, model.into()));
        self
    }

    pub async fn run(&self, code: &str, language: &str, options: &CorrectionOptions) -> Result<CorrectionReport> {
        let check = validate_input(code, self.max_len);
        if !check.is_valid {
            return Err(StudioError::Validation(check.errors.join("; ")));
        }
        let started = Instant::now();
        let ev = &self.events;

        ev.progress(Stage::Analysis, 10, "Iniciando análisis de código...", ANALYZER);
        ev.progress(Stage::Analysis, 15, "Detectando lenguaje de programación...", ANALYZER);
        let language_detection = detect_or_fallback(code, language);
        let working_language = if language_detection.confidence > 70.0 {
            language_detection.language.clone()
        } else {
            language.to_string()
        };
        tracing::info!(
            detected = %language_detection.language,
            confidence = language_detection.confidence,
            using = %working_language,
            "language resolved"
        );

        ev.progress(Stage::Analysis, 25, "Analizando estructura del código...", ANALYZER);
        ev.progress(Stage::Analysis, 30, "Extrayendo estructura del código...", ANALYZER);
        let code_structure = analyzer::analyze_structure(code, &working_language);

        ev.progress(Stage::Detection, 40, "Detectando errores y problemas...", DETECTOR);
        ev.progress(Stage::Detection, 50, "Analizando errores de sintaxis...", DETECTOR);
        ev.progress(Stage::Detection, 55, "Verificando problemas de lógica...", DETECTOR);
        if options.analyze_security {
            ev.progress(Stage::Detection, 60, "Analizando vulnerabilidades de seguridad...", DETECTOR);
        }
        if options.analyze_performance {
            ev.progress(Stage::Detection, 65, "Evaluando problemas de rendimiento...", DETECTOR);
        }
        let error_analysis = detector::analyze_code(code, &working_language);

        ev.progress(Stage::Generation, 70, "Generando código corregido...", GENERATOR);
        ev.progress(Stage::Generation, 75, "Aplicando correcciones automáticas...", GENERATOR);
        ev.progress(Stage::Generation, 80, "Optimizando código...", GENERATOR);
        ev.progress(Stage::Generation, 85, "Generando explicaciones...", GENERATOR);
        let mut code_generation = fixer::generate_corrected_code(code, &error_analysis.errors, &working_language);

        let refinement = match &self.assist {
            Some((registry, model)) => {
                ev.progress(Stage::Generation, 88, "Refinando corrección con el modelo...", GENERATOR);
                Some(
                    refine(registry, model, code, &working_language, &error_analysis.errors, options, &mut code_generation)
                        .await,
                )
            }
            None => None,
        };

        ev.progress(Stage::Finalization, 90, "Calculando métricas finales...", SYSTEM);
        let overall_metrics = overall_metrics(started, &language_detection, &error_analysis, &code_generation);
        let agent_status = agent_status(&language_detection, &error_analysis, &code_generation);
        ev.progress(Stage::Complete, 100, "Análisis completado exitosamente", SYSTEM);

        Ok(CorrectionReport {
            language_detection,
            code_structure,
            error_analysis,
            code_generation,
            overall_metrics,
            agent_status,
            refinement,
        })
    }
}

/// Falls back to the caller's language, reported at 60, when detection is
/// below 50.
fn detect_or_fallback(code: &str, suggested: &str) -> LanguageDetection {
    let detection = analyzer::detect_language(code);
    if detection.confidence < 50.0 {
        return LanguageDetection {
            language: suggested.to_string(),
            confidence: 60.0,
            features: vec![format!("Fallback to suggested language: {suggested}")],
        };
    }
    detection
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelCorrection {
    corrected_code: String,
    #[serde(default)]
    changes: Vec<ModelChange>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelChange {
    #[serde(default)]
    line_number: usize,
    #[serde(default)]
    original_code: String,
    #[serde(default)]
    corrected_code: String,
    #[serde(default)]
    reason: String,
}

async fn refine(
    registry: &ModelRegistry,
    model: &str,
    code: &str,
    language: &str,
    issues: &[CodeError],
    options: &CorrectionOptions,
    generation: &mut CodeGenerationResult,
) -> Refinement {
    let prompt = correction_prompt(code, language, issues, options);
    let response = match registry.try_with_fallback(&prompt, model).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(model, error = %e, "model correction failed, keeping rule-based result");
            return Refinement::Skipped { reason: e.to_string() };
        }
    };
    let parsed: ModelCorrection = match parse_json_object(&response.content) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(model = %response.model, error = %e, "unparsable correction reply");
            return Refinement::Skipped { reason: format!("unparsable model reply: {e}") };
        }
    };
    if parsed.corrected_code.trim().is_empty() {
        return Refinement::Skipped { reason: "model returned no code".into() };
    }

    let confidence = if parsed.confidence > 1.0 { parsed.confidence / 100.0 } else { parsed.confidence };
    let offset = generation.changes.len();
    generation.changes.extend(parsed.changes.into_iter().enumerate().map(|(i, c)| CorrectionChange {
        id: format!("model-{}", offset + i),
        line_number: c.line_number,
        original_code: c.original_code,
        corrected_code: c.corrected_code,
        reason: c.reason,
        kind: ChangeKind::Fix,
        confidence,
    }));
    if !parsed.summary.is_empty() {
        generation.explanations.push(parsed.summary.clone());
    }
    generation.quality_score = fixer::quality_score(code, &parsed.corrected_code);
    generation.maintainability_improvement = fixer::maintainability_improvement(code, &parsed.corrected_code);
    generation.corrected_code = parsed.corrected_code;

    Refinement::Applied { model: response.model, summary: parsed.summary }
}

fn overall_metrics(
    started: Instant,
    detection: &LanguageDetection,
    errors: &ErrorAnalysisResult,
    generation: &CodeGenerationResult,
) -> OverallMetrics {
    let issues_score = if errors.total_issues > 0 { 80.0 } else { 95.0 };
    let confidence = (detection.confidence + issues_score + generation.quality_score) / 3.0;

    OverallMetrics {
        processing_time_ms: started.elapsed().as_millis() as u64,
        confidence_score: confidence.round() as u32,
        improvement_percentage: generation.maintainability_improvement.round() as u32,
        recommended_actions: recommendations(errors, generation),
    }
}

fn agent_status(
    detection: &LanguageDetection,
    errors: &ErrorAnalysisResult,
    generation: &CodeGenerationResult,
) -> AgentStatusReport {
    AgentStatusReport {
        analyzer: if detection.confidence > 70.0 { AgentStatus::Success } else { AgentStatus::Warning },
        detector: match errors.critical_count {
            0 => AgentStatus::Success,
            1 | 2 => AgentStatus::Warning,
            _ => AgentStatus::Error,
        },
        generator: if generation.quality_score > 80.0 {
            AgentStatus::Success
        } else if generation.quality_score > 60.0 {
            AgentStatus::Warning
        } else {
            AgentStatus::Error
        },
    }
}

fn recommendations(errors: &ErrorAnalysisResult, generation: &CodeGenerationResult) -> Vec<String> {
    let mut out = Vec::new();
    if errors.critical_count > 0 {
        out.push(format!("Corregir {} problema(s) crítico(s) de inmediato", errors.critical_count));
    }
    if errors.error_count > 0 {
        out.push(format!("Revisar {} error(es) de código", errors.error_count));
    }
    if errors.warning_count > 5 {
        out.push("Considerar refactorizar el código para reducir advertencias".into());
    }
    if generation.improvements_summary.performance_optimizations > 0 {
        out.push("Aplicar optimizaciones de rendimiento sugeridas".into());
    }
    if generation.quality_score < 70.0 {
        out.push("Mejorar la calidad general del código".into());
    }
    if out.is_empty() {
        out.push("El código está en buen estado, considerar mejoras menores de estilo".into());
    }
    out
}

pub fn comprehensive_report(r: &CorrectionReport) -> String {
    let d = &r.language_detection;
    let e = &r.error_analysis;
    let g = &r.code_generation;
    let s = &g.improvements_summary;
    let m = &r.overall_metrics;

    let mut out = String::new();
    let _ = writeln!(out, "REPORTE DE ANÁLISIS MULTI-AGENTE");
    let _ = writeln!(out, "================================\n");
    let _ = writeln!(out, "DETECCIÓN DE LENGUAJE");
    let _ = writeln!(out, "Lenguaje: {}", d.language);
    let _ = writeln!(out, "Confianza: {:.1}%\n", d.confidence);
    let _ = writeln!(out, "ANÁLISIS DE ERRORES");
    let _ = writeln!(out, "Total de problemas: {}", e.total_issues);
    let _ = writeln!(out, "- Críticos: {}", e.critical_count);
    let _ = writeln!(out, "- Errores: {}", e.error_count);
    let _ = writeln!(out, "- Advertencias: {}", e.warning_count);
    let _ = writeln!(out, "- Sugerencias: {}\n", e.info_count);
    let _ = writeln!(out, "CORRECCIONES APLICADAS");
    let _ = writeln!(out, "Cambios realizados: {}", g.changes.len());
    let _ = writeln!(out, "- Correcciones de sintaxis: {}", s.syntax_fixes);
    let _ = writeln!(out, "- Mejoras de lógica: {}", s.logic_improvements);
    let _ = writeln!(out, "- Correcciones de seguridad: {}", s.security_fixes);
    let _ = writeln!(out, "- Optimizaciones: {}", s.performance_optimizations);
    let _ = writeln!(out, "- Mejoras de estilo: {}\n", s.style_improvements);
    let _ = writeln!(out, "MÉTRICAS GENERALES");
    let _ = writeln!(out, "Puntuación de calidad: {:.0}/100", g.quality_score);
    let _ = writeln!(out, "Mejora de mantenibilidad: {}%", m.improvement_percentage);
    let _ = writeln!(out, "Tiempo de procesamiento: {}ms", m.processing_time_ms);
    let _ = writeln!(out, "Confianza general: {}%", m.confidence_score);
    if let Some(Refinement::Applied { model, .. }) = &r.refinement {
        let _ = writeln!(out, "Refinado con: {model}");
    }
    let _ = writeln!(out, "\nRECOMENDACIONES");
    for action in &m.recommended_actions {
        let _ = writeln!(out, "• {action}");
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{channel, StudioEvent};
    use crate::provider::scripted::ScriptedProvider;

    #[tokio::test]
    async fn clean_code_reports_no_issues() {
        let (tx, mut rx) = channel();
        let report = CodeCorrector::new(tx.into())
            .run("const total = sumar(1, 2);", "javascript", &CorrectionOptions::default())
            .await
            .unwrap();

        assert_eq!(report.error_analysis.total_issues, 0);
        assert_eq!(report.agent_status.detector, AgentStatus::Success);

        let mut percents = Vec::new();
        while let Ok(StudioEvent::Progress(p)) = rx.try_recv() {
            percents.push(p.percent);
        }
        assert_eq!(percents.first(), Some(&10));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn low_confidence_falls_back_to_caller_language() {
        let report = CodeCorrector::new(EventSink::disabled())
            .run("x", "ruby", &CorrectionOptions::default())
            .await
            .unwrap();
        assert_eq!(report.language_detection.language, "ruby");
        assert_eq!(report.language_detection.confidence, 60.0);
        assert_eq!(report.agent_status.analyzer, AgentStatus::Warning);
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_input() {
        let c = CodeCorrector::new(EventSink::disabled()).with_max_length(10);
        let opts = CorrectionOptions::default();
        assert!(matches!(c.run("   ", "javascript", &opts).await, Err(StudioError::Validation(_))));
        assert!(matches!(c.run("var abcdefghijk = 1", "javascript", &opts).await, Err(StudioError::Validation(_))));
        assert!(validate_input(&"a".repeat(MAX_CODE_LENGTH), MAX_CODE_LENGTH).is_valid);
        assert!(!validate_input(&"a".repeat(MAX_CODE_LENGTH + 1), MAX_CODE_LENGTH).is_valid);
    }

    #[tokio::test]
    async fn skipped_progress_steps_follow_options() {
        let (tx, mut rx) = channel();
        let opts = CorrectionOptions { analyze_security: false, analyze_performance: false, ..Default::default() };
        CodeCorrector::new(tx.into()).run("var x = 1", "javascript", &opts).await.unwrap();
        let mut seen = Vec::new();
        while let Ok(StudioEvent::Progress(p)) = rx.try_recv() {
            seen.push(p.percent);
        }
        assert!(!seen.contains(&60) && !seen.contains(&65));
    }

    #[tokio::test]
    async fn model_reply_replaces_rule_based_code() {
        let reply = "```json\n{\"correctedCode\": \"const x = 1;\", \"changes\": [{\"lineNumber\": 1, \"originalCode\": \"var x = 1\", \"correctedCode\": \"const x = 1;\", \"reason\": \"const\"}], \"summary\": \"ok\", \"confidence\": 92}\n```";
        let reg = ModelRegistry::default().with("Claude 3.7", Arc::new(ScriptedProvider::new().with_reply(reply)));
        let report = CodeCorrector::new(EventSink::disabled())
            .with_model(Arc::new(reg), "Claude 3.7")
            .run("var x = 1", "javascript", &CorrectionOptions::default())
            .await
            .unwrap();

        assert_eq!(report.code_generation.corrected_code, "const x = 1;");
        let last = report.code_generation.changes.last().unwrap();
        assert_eq!(last.kind, ChangeKind::Fix);
        assert!((last.confidence - 0.92).abs() < 1e-9);
        assert!(matches!(report.refinement, Some(Refinement::Applied { .. })));
    }

    #[tokio::test]
    async fn failed_model_keeps_rule_based_code() {
        let reg = ModelRegistry::default().with("Claude 3.7", Arc::new(ScriptedProvider::new().with_reply("no json")));
        let report = CodeCorrector::new(EventSink::disabled())
            .with_model(Arc::new(reg), "Claude 3.7")
            .run("var x = 1", "javascript", &CorrectionOptions::default())
            .await
            .unwrap();
        assert_eq!(report.code_generation.corrected_code, "const x = 1");
        assert!(matches!(report.refinement, Some(Refinement::Skipped { .. })));
        assert!(comprehensive_report(&report).contains("Total de problemas: 1"));
    }
}
