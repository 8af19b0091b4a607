use std::sync::Arc;
use std::time::Duration;

use codestorm::config::Config;
use codestorm::coordinator::{AgentType, Coordinator, TaskStatus};
use codestorm::corrector::{AgentStatus, CodeCorrector, CorrectionOptions};
use codestorm::events::{self, EventSink, StudioEvent};
use codestorm::provider::scripted::ScriptedProvider;
use codestorm::provider::ModelRegistry;
use codestorm::wire::{FileDescription, StackCategory, TechnologyStack};
use codestorm::StudioError;

const BAKERY_HTML: &str = "<!DOCTYPE html>\n<html lang=\"es\">\n<body><h1>Panadería La Espiga</h1></body>\n</html>";

fn coordinator_with(model: &str, provider: Arc<ScriptedProvider>) -> (Coordinator, events::EventReceiver) {
    let reg = ModelRegistry::default().with(model, provider);
    let (tx, rx) = events::channel();
    (Coordinator::new(Arc::new(reg), Config::default(), tx), rx)
}

fn drain(rx: &mut events::EventReceiver) -> Vec<StudioEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test]
async fn bakery_index_uses_static_template_and_fenced_body() {
    let provider = Arc::new(
        ScriptedProvider::new().with_reply(format!("Claro, aquí tienes:\n```html\n{BAKERY_HTML}\n```\nSaludos")),
    );
    let (mut coord, mut rx) = coordinator_with("GPT-4O", provider.clone());

    let file = FileDescription::new("index.html", "create index.html for a bakery");
    let generated = coord.generate_file(&file, "panadería artesanal", None).await.unwrap();

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("SITIOS WEB ESTÁTICOS"));
    assert_eq!(generated.content, BAKERY_HTML);
    assert_eq!(generated.language, "html");
    assert!(!generated.is_fallback());

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, StudioEvent::FilesGenerated(f) if f.len() == 1)));
}

#[tokio::test]
async fn quota_on_gpt4o_retries_with_gemini_flash() {
    let gpt = Arc::new(ScriptedProvider::new().with_quota_error());
    let flash = Arc::new(ScriptedProvider::new().with_reply("```css\nbody { color: brown; }\n```"));
    let reg = ModelRegistry::default().with("GPT-4O", gpt.clone()).with("Gemini 2.5 Flash", flash.clone());

    let resp = reg.try_with_fallback("estilos", "GPT-4O").await.unwrap();
    assert!(resp.fallback_used);
    assert_eq!(resp.model, "Gemini 2.5 Flash");
    assert_eq!(gpt.calls(), 1);
    assert_eq!(flash.calls(), 1);
}

#[tokio::test]
async fn clean_code_has_no_issues_and_detector_succeeds() {
    let code = "const saludo = nombre => `Hola ${nombre}`;\nexport default saludo;";
    let report = CodeCorrector::new(EventSink::disabled())
        .run(code, "javascript", &CorrectionOptions::default())
        .await
        .unwrap();
    assert_eq!(report.error_analysis.total_issues, 0);
    assert_eq!(report.agent_status.detector, AgentStatus::Success);
    assert_eq!(report.code_generation.corrected_code, code);
}

#[tokio::test]
async fn empty_reply_becomes_a_marked_placeholder() {
    let (mut coord, _rx) = coordinator_with("GPT-4O", Arc::new(ScriptedProvider::new().with_reply("  ")));
    let generated = coord.generate_file(&FileDescription::new("app.js", "lógica"), "", None).await.unwrap();
    assert!(generated.is_fallback());
    assert!(generated.content.contains("Archivo app.js cargado correctamente"));
}

#[tokio::test]
async fn stack_overrides_the_static_template() {
    let provider = Arc::new(ScriptedProvider::new().with_reply("ok"));
    let (mut coord, _rx) = coordinator_with("GPT-4O", provider.clone());
    let stack = TechnologyStack {
        name: "API".into(),
        category: StackCategory::Backend,
        technologies: vec!["Axum".into()],
        features: vec![],
        complexity: "intermediate".into(),
    };
    coord.generate_file(&FileDescription::new("index.html", "docs"), "", Some(&stack)).await.unwrap();
    let prompt = &provider.prompts()[0];
    assert!(!prompt.contains("SITIOS WEB ESTÁTICOS"));
    assert!(prompt.contains("Axum"));
}

#[tokio::test]
async fn website_flow_builds_design_then_code_tasks() {
    let proposal = r##"```json
{"analysis": {}, "proposal": {"title": "Panadería", "description": "", "style": "rústico",
 "colorPalette": {"primary": "#8b4513"},
 "components": [
   {"name": "Encabezado", "type": "header", "description": "Navegación"},
   {"name": "Nuestros servicios", "type": "grid", "description": "Pan y pasteles"},
   {"name": "Contacto", "type": "contact", "description": "Formulario de pedidos"}
 ]}}
```"##;
    let analysis = r#"{"businessType": "Panadería de barrio", "visualStyle": "creativo-artístico",
 "modernTrends": ["micro-animaciones"], "colorScheme": "warm-professional",
 "layoutApproach": "card-masonry", "interactionLevel": "playful-creative", "targetAudience": "Vecinos"}"#;
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_reply(analysis)
            .with_reply(proposal)
            .with_reply("```html\n<h1>Inicio</h1>\n```")
            .with_reply("```css\nbody{}\n```")
            .with_reply("```javascript\nconsole.log(1);\n```")
            .with_reply("```html\n<h1>Servicios</h1>\n```")
            .with_reply("```html\n<h1>Contacto</h1>\n```"),
    );
    let (mut coord, mut rx) = coordinator_with("GPT-4O", provider.clone());
    let outcome = coord.generate_website("una panadería de barrio").await;

    assert!(outcome.succeeded());
    let paths: Vec<_> = outcome.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["index.html", "styles.css", "script.js", "services.html", "contact.html"]);
    assert_eq!(outcome.files[3].content, "<h1>Servicios</h1>");
    assert_eq!(outcome.proposal.as_ref().map(|p| p.title.as_str()), Some("Panadería"));
    let analysis = outcome.analysis.as_ref().unwrap();
    assert!(!analysis.fallback);
    assert_eq!(analysis.layout_approach, "card-masonry");

    let prompts = provider.prompts();
    assert!(prompts[0].contains("INSTRUCCIÓN: \"una panadería de barrio\""));
    assert!(prompts[1].contains("INSTRUCCIÓN ORIGINAL: una panadería de barrio"));
    assert!(prompts[1].contains("- Tipo de negocio: Panadería de barrio"));
    assert!(prompts[1].contains("- Enfoque de layout: card-masonry"));

    let main = &outcome.tasks[0];
    assert_eq!(main.agent_type, AgentType::Coordinator);
    assert_eq!(main.subtasks.len(), 2);
    assert_eq!(main.subtasks[0].agent_type, AgentType::Design);
    assert_eq!(main.subtasks[1].subtasks.len(), 5);
    assert!(main.subtasks[1].subtasks.iter().all(|t| t.status == TaskStatus::Completed));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, StudioEvent::DesignProposalUpdate(Some(_)))));
    assert!(!events.iter().any(|e| matches!(e, StudioEvent::Error(_))));
    assert_eq!(provider.calls(), 7);
}

#[tokio::test]
async fn website_with_unusable_design_reply_uses_fallback_proposal() {
    let provider = Arc::new(ScriptedProvider::new().with_reply("no tengo JSON").with_reply("contenido"));
    let (mut coord, _rx) = coordinator_with("GPT-4O", provider);
    let outcome = coord.generate_website("portafolio").await;
    assert!(outcome.succeeded());
    let proposal = outcome.proposal.as_ref().unwrap();
    assert!(proposal.fallback);
    assert_eq!(proposal.title, "portafolio");
    assert_eq!(outcome.files.len(), 3);
}

#[tokio::test]
async fn unparsable_analysis_feeds_default_direction_to_design() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_reply("Claro, es una floristería elegante.")
            .with_reply("sin propuesta")
            .with_reply("contenido"),
    );
    let (mut coord, _rx) = coordinator_with("GPT-4O", provider.clone());
    let outcome = coord.generate_website("floristería").await;

    assert!(outcome.succeeded());
    assert!(outcome.analysis.as_ref().is_some_and(|a| a.fallback));
    let design_prompt = &provider.prompts()[1];
    assert!(design_prompt.contains("INSTRUCCIÓN ORIGINAL: floristería"));
    assert!(design_prompt.contains("- Tipo de negocio: Sitio web general"));
    assert!(design_prompt.contains("- Estilo visual: elegante-minimalista"));
}

#[tokio::test]
async fn website_design_failure_is_reported_not_returned() {
    let provider = Arc::new(ScriptedProvider::new().with_error("network down"));
    let (mut coord, mut rx) = coordinator_with("GPT-4O", provider);
    let outcome = coord.generate_website("tienda").await;

    assert!(!outcome.succeeded());
    assert!(outcome.files.is_empty());
    let main = &outcome.tasks[0];
    assert_eq!(main.status, TaskStatus::Failed);
    assert_eq!(main.subtasks[0].status, TaskStatus::Failed);
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, StudioEvent::Error(m) if m.contains("network down"))));
}

#[tokio::test]
async fn cancel_during_website_discards_the_in_flight_file() {
    let provider = Arc::new(ScriptedProvider::new().with_reply("x").with_delay(Duration::from_millis(40)));
    let (mut coord, _rx) = coordinator_with("GPT-4O", provider.clone());
    let handle = coord.cancel_handle();
    tokio::spawn(async move {
        // analysis call finishes at ~40ms, design call is in flight at ~60ms
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.cancel();
    });

    let outcome = coord.generate_website("blog").await;
    assert!(!outcome.succeeded());
    assert!(outcome.files.is_empty());
    assert_eq!(provider.calls(), 2);
    assert_eq!(outcome.tasks[0].error.as_deref(), Some(StudioError::Cancelled.to_string().as_str()));
}
