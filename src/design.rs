//! Design stage: asks a model for a site proposal and turns it into the
//! static-site file plan the code stage works through.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::errors::{Result, StudioError};
use crate::extract::parse_json_object;
use crate::prompt::{design_proposal_prompt, instruction_analysis_prompt};
use crate::provider::ModelRegistry;
use crate::wire::FileDescription;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            primary: "#3b82f6".into(),
            secondary: "#10b981".into(),
            accent: "#8b5cf6".into(),
            background: "#ffffff".into(),
            text: "#1f2937".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignComponent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl DesignComponent {
    fn new(name: &str, kind: &str, description: &str, properties: Value) -> Self {
        Self {
            id: new_id("component"),
            name: name.into(),
            kind: kind.into(),
            description: description.into(),
            properties: match properties {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignProposal {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub color_palette: ColorPalette,
    #[serde(default)]
    pub components: Vec<DesignComponent>,
    /// Set when the model reply could not be used.
    #[serde(default)]
    pub fallback: bool,
}

fn default_style() -> String {
    "modern".into()
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Canned header/hero/content/footer proposal.
pub fn fallback_proposal(instruction: &str) -> DesignProposal {
    let title = if instruction.chars().count() > 50 {
        format!("{}...", instruction.chars().take(50).collect::<String>())
    } else {
        instruction.to_string()
    };
    DesignProposal {
        id: new_id("design-proposal"),
        title,
        description: format!("Propuesta generada como respaldo basada en la instrucción: {instruction}"),
        style: default_style(),
        color_palette: ColorPalette::default(),
        components: vec![
            DesignComponent::new(
                "Encabezado",
                "header",
                "Encabezado principal con navegación",
                json!({"title": "Mi Sitio Web", "navigation": ["Inicio", "Acerca de", "Contacto"]}),
            ),
            DesignComponent::new(
                "Sección Principal",
                "hero",
                "Sección hero con título y descripción",
                json!({"title": "Bienvenido", "subtitle": "Descripción del sitio web", "hasButton": true}),
            ),
            DesignComponent::new(
                "Contenido",
                "content",
                "Sección de contenido principal",
                json!({"layout": "single-column", "hasImages": false}),
            ),
            DesignComponent::new(
                "Pie de Página",
                "footer",
                "Pie de página con información de contacto",
                json!({"copyright": true, "links": ["Privacidad", "Términos"]}),
            ),
        ],
        fallback: true,
    }
}

/// Reads `{analysis, proposal}` or a bare proposal object out of `reply`.
/// Anything unusable yields [`fallback_proposal`].
pub fn parse_proposal(reply: &str, instruction: &str) -> DesignProposal {
    let parsed = parse_json_object::<Value>(reply).and_then(|mut value| {
        let body = value.get_mut("proposal").map(Value::take).unwrap_or(value);
        serde_json::from_value::<DesignProposal>(body).map_err(StudioError::from)
    });

    match parsed {
        Ok(mut proposal) if !proposal.components.is_empty() => {
            if proposal.id.is_empty() {
                proposal.id = new_id("design-proposal");
            }
            for c in proposal.components.iter_mut().filter(|c| c.id.is_empty()) {
                c.id = new_id("component");
            }
            proposal.fallback = false;
            proposal
        }
        Ok(_) => {
            tracing::warn!("design proposal has no components, using fallback");
            fallback_proposal(instruction)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not parse design proposal, using fallback");
            fallback_proposal(instruction)
        }
    }
}

/// Runs the design prompt for the analysed instruction through the fallback
/// chain. Invocation errors propagate; parse failures do not.
pub async fn propose(
    registry: &ModelRegistry,
    model: &str,
    instruction: &str,
    analysis: &InstructionAnalysis,
) -> Result<DesignProposal> {
    let prompt = design_proposal_prompt(&analysis.enhance(instruction));
    let response = registry.try_with_fallback(&prompt, model).await?;
    tracing::info!(model = %response.model, fallback_used = response.fallback_used, "design proposal received");
    Ok(parse_proposal(&response.content, instruction))
}

/// Business and visual direction read from the user's instruction before the
/// design stage. Missing fields keep the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstructionAnalysis {
    pub business_type: String,
    pub visual_style: String,
    pub modern_trends: Vec<String>,
    pub color_scheme: String,
    pub layout_approach: String,
    pub interaction_level: String,
    pub target_audience: String,
    /// Set when the defaults stand in for a model answer.
    #[serde(skip)]
    pub fallback: bool,
}

impl Default for InstructionAnalysis {
    fn default() -> Self {
        Self {
            business_type: "Sitio web general".into(),
            visual_style: "elegante-minimalista".into(),
            modern_trends: vec!["gradientes-dinámicos".into(), "micro-animaciones".into()],
            color_scheme: "minimal-monochrome".into(),
            layout_approach: "hero-focused".into(),
            interaction_level: "subtle-elegant".into(),
            target_audience: "Usuarios generales".into(),
            fallback: true,
        }
    }
}

impl InstructionAnalysis {
    /// The instruction handed to the design stage: the user's text plus the
    /// analysed design direction and the fixed quality requirements.
    pub fn enhance(&self, instruction: &str) -> String {
        format!(
            "CREAR UN SITIO WEB ULTRA-MODERNO Y ATRACTIVO:\n\n\
             INSTRUCCIÓN ORIGINAL: {instruction}\n\n\
             ESPECIFICACIONES DE DISEÑO MODERNO:\n\
             - Tipo de negocio: {}\n\
             - Estilo visual: {}\n\
             - Tendencias a aplicar: {}\n\
             - Esquema de colores: {}\n\
             - Enfoque de layout: {}\n\
             - Nivel de interactividad: {}\n\
             - Audiencia objetivo: {}\n\n\
             REQUISITOS OBLIGATORIOS:\n\
             1. Diseño VISUALMENTE IMPACTANTE con tendencias actuales\n\
             2. Animaciones FLUIDAS y transiciones suaves\n\
             3. Layout INNOVADOR y no genérico\n\
             4. Colores PROFESIONALES con gradientes\n\
             5. Tipografía MODERNA y jerarquía clara\n\
             6. Componentes INTERACTIVOS con hover effects\n\
             7. Responsive AVANZADO y optimizado\n\
             8. Código CSS3 con Grid, Flexbox y animaciones\n\
             9. JavaScript para interactividad moderna\n\
             10. Evitar completamente diseños PLANOS o básicos\n\n\
             El resultado debe ser un sitio web que impresione visualmente y tenga una experiencia de usuario excepcional.",
            self.business_type,
            self.visual_style,
            self.modern_trends.join(", "),
            self.color_scheme,
            self.layout_approach,
            self.interaction_level,
            self.target_audience,
        )
    }

    /// One line for the CLI summary.
    pub fn summary(&self) -> String {
        format!(
            "{} · {} · {} · {}",
            self.business_type,
            self.visual_style,
            self.color_scheme,
            self.modern_trends.join(", ")
        )
    }
}

/// Reads an [`InstructionAnalysis`] out of `reply`, or the defaults.
pub fn parse_analysis(reply: &str) -> InstructionAnalysis {
    match parse_json_object::<InstructionAnalysis>(reply) {
        Ok(analysis) => InstructionAnalysis { fallback: false, ..analysis },
        Err(e) => {
            tracing::warn!(error = %e, "could not parse instruction analysis, using defaults");
            InstructionAnalysis::default()
        }
    }
}

/// Runs the analysis prompt through the fallback chain. Never fails: an
/// invocation error also yields the defaults.
pub async fn analyze_instruction(registry: &ModelRegistry, model: &str, instruction: &str) -> InstructionAnalysis {
    let prompt = instruction_analysis_prompt(instruction);
    match registry.try_with_fallback(&prompt, model).await {
        Ok(response) => {
            tracing::info!(model = %response.model, "instruction analysis received");
            parse_analysis(&response.content)
        }
        Err(e) => {
            tracing::warn!(error = %e, "instruction analysis failed, using defaults");
            InstructionAnalysis::default()
        }
    }
}

fn mentions(proposal: &DesignProposal, kind: &str, name: &str, description: &str) -> bool {
    proposal.components.iter().any(|c| {
        c.kind.to_lowercase().contains(kind)
            || c.name.to_lowercase().contains(name)
            || c.description.to_lowercase().contains(description)
    })
}

/// index.html, styles.css and script.js, plus about/services/contact pages
/// when the proposal's components call for them.
pub fn static_site_plan(proposal: &DesignProposal, context: &str) -> Vec<FileDescription> {
    let shared = ["styles.css", "script.js"];
    let mut files = vec![
        FileDescription::new(
            "index.html",
            format!(
                "Página principal del sitio web estático. Debe incluir: estructura HTML5 semántica, meta tags SEO \
                 optimizados, contenido específico basado en \"{context}\", navegación, secciones principales, y \
                 enlaces a styles.css y script.js. El contenido debe ser completamente personalizado y relevante al \
                 contexto del proyecto."
            ),
        )
        .with_dependencies(shared),
        FileDescription::new(
            "styles.css",
            format!(
                "Hoja de estilos principal para el sitio web estático. Debe incluir: reset CSS, variables CSS para \
                 colores y espaciado, diseño responsive mobile-first, estilos para todos los componentes del HTML, \
                 animaciones suaves, hover effects, tipografía optimizada con Google Fonts, y paleta de colores \
                 coherente con el contexto \"{context}\". Colores base: primario {}, secundario {}, acento {}.",
                proposal.color_palette.primary, proposal.color_palette.secondary, proposal.color_palette.accent
            ),
        ),
        FileDescription::new(
            "script.js",
            format!(
                "Script principal para interactividad del sitio web estático. Debe incluir: JavaScript vanilla \
                 moderno, event listeners para navegación y formularios, animaciones suaves, validación de \
                 formularios (si aplica), efectos visuales, y funcionalidades específicas relevantes al contexto \
                 \"{context}\". Sin dependencias externas."
            ),
        ),
    ];

    if mentions(proposal, "about", "sobre", "historia") {
        files.push(
            FileDescription::new(
                "about.html",
                format!(
                    "Página \"Sobre Nosotros\" del sitio web estático. Debe incluir: estructura HTML5 semántica, \
                     información detallada sobre la empresa/proyecto basada en \"{context}\", historia, misión, \
                     visión, equipo, y navegación consistente con index.html."
                ),
            )
            .with_dependencies(shared),
        );
    }
    if mentions(proposal, "service", "servicio", "producto") {
        files.push(
            FileDescription::new(
                "services.html",
                format!(
                    "Página de servicios/productos del sitio web estático. Debe incluir: estructura HTML5 \
                     semántica, descripción detallada de servicios/productos específicos para \"{context}\", \
                     precios (si aplica), características, beneficios, y navegación consistente."
                ),
            )
            .with_dependencies(shared),
        );
    }
    if mentions(proposal, "contact", "contacto", "formulario") {
        files.push(
            FileDescription::new(
                "contact.html",
                format!(
                    "Página de contacto del sitio web estático. Debe incluir: estructura HTML5 semántica, \
                     formulario de contacto funcional, información de contacto específica para \"{context}\", \
                     redes sociales, y navegación consistente. Formulario con validación JavaScript."
                ),
            )
            .with_dependencies(shared),
        );
    }
    files
}
