use crate::analysis::detector::CodeError;
use crate::corrector::CorrectionOptions;
use crate::wire::{FileDescription, StackCategory, TechnologyStack};

/// File extension (without the dot) of the last path segment, if any.
pub fn extension_of(path: &str) -> Option<&str> {
    let name = crate::wire::file_name(path);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

pub fn language_from_extension(ext: &str) -> String {
    match ext.to_lowercase().as_str() {
        "py" => "python".into(),
        "js" => "javascript".into(),
        "ts" => "typescript".into(),
        "html" => "html".into(),
        "css" => "css".into(),
        "json" => "json".into(),
        "md" => "markdown".into(),
        other => other.to_string(),
    }
}

/// Language label for a path; `unknown` when the path has no extension.
pub fn language_from_path(path: &str) -> String {
    extension_of(path)
        .map(language_from_extension)
        .unwrap_or_else(|| "unknown".to_string())
}

fn dependencies_line(file: &FileDescription) -> String {
    if file.dependencies.is_empty() {
        String::new()
    } else {
        format!("Dependencias: {}", file.dependencies.join(", "))
    }
}

fn answer_format(language: &str) -> String {
    format!(
"Responde ÚNICAMENTE con el código del archivo, sin explicaciones adicionales antes o después.
Usa el formato de bloque de código con el lenguaje apropiado:

```{language}
// Tu código aquí
```
")
}

/// Builds the generation prompt for one file.
///
/// A technology stack selects the stack template. Without one, `.html`,
/// `.css` and `.js` files get the static-website template and everything
/// else the general template.
pub fn build_prompt(
    file: &FileDescription,
    project_context: &str,
    stack: Option<&TechnologyStack>,
) -> String {
    let language = language_from_path(&file.path);

    if let Some(stack) = stack {
        return stack_prompt(file, project_context, &language, stack);
    }

    let ext = extension_of(&file.path).unwrap_or("").to_lowercase();
    if matches!(ext.as_str(), "html" | "css" | "js") {
        static_web_prompt(file, project_context, &language, &ext)
    } else {
        general_prompt(file, project_context, &language)
    }
}

fn stack_prompt(
    file: &FileDescription,
    project_context: &str,
    language: &str,
    stack: &TechnologyStack,
) -> String {
    let technologies = stack.technologies.join(", ");
    let category = stack.category.as_str();
    let features = stack
        .features
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}", i + 1, f))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
"
Actúa como un desarrollador experto especializado en {name} ({category}). Tu especialidad es generar código profesional, optimizado y siguiendo las mejores prácticas para este stack tecnológico específico.

STACK TECNOLÓGICO SELECCIONADO: {name}
CATEGORÍA: {category_upper}
COMPLEJIDAD: {complexity_upper}
TECNOLOGÍAS: {technologies}

CONTEXTO DEL PROYECTO:
{project_context}

ARCHIVO A GENERAR:
Ruta: {path}
Descripción: {description}
Tipo: {language_upper}
{deps}

CARACTERÍSTICAS DEL STACK:
{features}

REQUISITOS ESPECÍFICOS PARA {name}:
{requirements}

INSTRUCCIONES GENERALES:
1. Generar código completo y funcional específico para {name}
2. Seguir las convenciones y mejores prácticas del stack tecnológico
3. Implementar todas las funcionalidades descritas
4. Asegurar compatibilidad con las tecnologías del stack: {technologies}
5. Optimizar para el nivel de complejidad: {complexity}
6. Incluir comentarios explicativos apropiados
7. Manejar errores de forma robusta
8. Seguir patrones de diseño apropiados para el stack

IMPORTANTE:
- El código debe ser completamente funcional y listo para producción
- Usar las tecnologías específicas del stack seleccionado
- Seguir las convenciones de nomenclatura del stack
- Implementar las características mencionadas cuando sea relevante
- No omitir partes importantes del código

{answer}",
        name = stack.name,
        category = category,
        category_upper = category.to_uppercase(),
        complexity = stack.complexity,
        complexity_upper = stack.complexity.to_uppercase(),
        technologies = technologies,
        project_context = project_context,
        path = file.path,
        description = file.description,
        language_upper = language.to_uppercase(),
        deps = dependencies_line(file),
        features = features,
        requirements = stack_requirements(stack),
        answer = answer_format(language),
    )
}

/// Fixed checklist appended for each stack category.
pub fn stack_requirements(stack: &TechnologyStack) -> String {
    let name = &stack.name;
    let tech = stack.technologies.join(", ");
    match stack.category {
        StackCategory::Frontend => format!(
"
REQUISITOS ESPECÍFICOS PARA FRONTEND ({name}):
1. Componentes reutilizables y modulares
2. Estado de aplicación bien gestionado
3. Routing dinámico y navegación fluida
4. Responsive design y mobile-first approach
5. Optimización de rendimiento (lazy loading, code splitting)
6. Accesibilidad (ARIA labels, navegación por teclado)
7. SEO optimizado (meta tags, structured data)
8. Integración con APIs REST/GraphQL
9. Manejo de errores y estados de carga
10. Testing unitario y de integración
11. Uso específico de: {tech}
12. Bundling y optimización de assets"),
        StackCategory::Backend => format!(
"
REQUISITOS ESPECÍFICOS PARA BACKEND ({name}):
1. API RESTful bien estructurada
2. Autenticación y autorización robusta
3. Validación de datos de entrada
4. Manejo de errores y logging
5. Conexión y gestión de base de datos
6. Middleware para funcionalidades transversales
7. Documentación de API (OpenAPI/Swagger)
8. Testing unitario y de integración
9. Configuración por entornos
10. Seguridad (CORS, rate limiting, sanitización)
11. Uso específico de: {tech}
12. Monitoreo y métricas"),
        StackCategory::Fullstack => format!(
"
REQUISITOS ESPECÍFICOS PARA FULLSTACK ({name}):
1. Arquitectura cliente-servidor bien definida
2. API RESTful o GraphQL
3. Autenticación end-to-end
4. Estado compartido entre frontend y backend
5. Routing tanto en cliente como servidor
6. SSR/SSG cuando sea apropiado
7. Optimización de rendimiento full-stack
8. Manejo de errores en ambos extremos
9. Testing integral (E2E, unitario, integración)
10. Deployment y CI/CD
11. Uso específico de: {tech}
12. Monitoreo y analytics"),
        StackCategory::Mobile => format!(
"
REQUISITOS ESPECÍFICOS PARA MOBILE ({name}):
1. Interfaz nativa o híbrida optimizada
2. Navegación móvil intuitiva
3. Gestión de estado local y remoto
4. Integración con APIs nativas del dispositivo
5. Optimización de rendimiento móvil
6. Manejo de conectividad offline
7. Push notifications
8. Almacenamiento local seguro
9. Testing en múltiples dispositivos
10. App store compliance
11. Uso específico de: {tech}
12. Analytics y crash reporting"),
        StackCategory::Desktop => format!(
"
REQUISITOS ESPECÍFICOS PARA DESKTOP ({name}):
1. Interfaz de usuario nativa del SO
2. Menús y shortcuts del sistema
3. Integración con el sistema operativo
4. Manejo de archivos y directorios
5. Configuración y preferencias persistentes
6. Auto-updater y versionado
7. Packaging para múltiples plataformas
8. Optimización de memoria y CPU
9. Testing en diferentes SO
10. Instaladores y distribución
11. Uso específico de: {tech}
12. Logging y debugging"),
        StackCategory::Ai => format!(
"
REQUISITOS ESPECÍFICOS PARA AI ({name}):
1. Integración con modelos de IA/ML
2. Procesamiento de datos de entrada
3. Manejo de respuestas asíncronas
4. Validación y sanitización de prompts
5. Rate limiting y gestión de cuotas
6. Caching de respuestas cuando sea apropiado
7. Manejo de errores de API de IA
8. Logging de interacciones
9. Interfaz conversacional intuitiva
10. Configuración de parámetros de modelo
11. Uso específico de: {tech}
12. Monitoreo de costos y uso"),
        StackCategory::Blockchain => format!(
"
REQUISITOS ESPECÍFICOS PARA BLOCKCHAIN ({name}):
1. Integración con wallets y redes blockchain
2. Smart contracts deployment y interacción
3. Manejo de transacciones y gas fees
4. Validación de direcciones y firmas
5. Interfaz web3 user-friendly
6. Manejo de estados de transacción
7. Seguridad y auditoría de contratos
8. Testing en testnets
9. Integración con proveedores RPC
10. Manejo de múltiples redes
11. Uso específico de: {tech}
12. Monitoreo de eventos blockchain"),
        StackCategory::Other => format!(
"
REQUISITOS GENERALES PARA {name}:
1. Código limpio y bien estructurado
2. Documentación clara y completa
3. Manejo robusto de errores
4. Testing apropiado para el tipo de aplicación
5. Configuración por entornos
6. Logging y debugging
7. Optimización de rendimiento
8. Seguridad apropiada
9. Uso específico de: {tech}
10. Mejores prácticas del stack seleccionado"),
    }
}

fn static_web_prompt(file: &FileDescription, project_context: &str, language: &str, ext: &str) -> String {
    format!(
"
Actúa como un desarrollador web experto especializado en crear SITIOS WEB ESTÁTICOS profesionales usando únicamente HTML5, CSS3 y JavaScript vanilla. Tu especialidad es generar código optimizado, semántico y completamente funcional para hosting estático.

CONTEXTO DEL PROYECTO (SITIO WEB ESTÁTICO):
{project_context}

ARCHIVO A GENERAR:
Ruta: {path}
Descripción: {description}
Tipo: {language_upper} para sitio web estático
{deps}

ESPECIALIZACIÓN EN WEB ESTÁTICA - Tu tarea es generar código que:
{file_requirements}

REQUISITOS OBLIGATORIOS PARA SITIOS WEB ESTÁTICOS:
1. CÓDIGO PURO: Solo HTML5, CSS3 y JavaScript vanilla (sin frameworks)
2. SEMÁNTICA: HTML5 semántico con elementos apropiados (header, nav, main, section, article, aside, footer)
3. SEO OPTIMIZADO: Meta tags completos, títulos descriptivos, alt text, structured data
4. RESPONSIVE: Mobile-first design con breakpoints optimizados
5. ACCESIBILIDAD: ARIA labels, contraste adecuado, navegación por teclado
6. RENDIMIENTO: Código optimizado para carga rápida
7. COMPATIBILIDAD: Funcional en todos los navegadores modernos
8. PERSONALIZACIÓN: Contenido específico basado en el contexto del proyecto
9. SIN PLACEHOLDERS: Evitar contenido genérico como \"Lorem ipsum\"
10. ESTRUCTURA LIMPIA: Código bien organizado y comentado

IMPORTANTE:
- El código debe ser completamente funcional y listo para producción
- Incluye comentarios explicativos donde sea necesario
- Asegúrate de que el código sea eficiente y siga las mejores prácticas web
- No omitas partes importantes del código
- Genera contenido realista y específico para el contexto del proyecto

{answer}",
        project_context = project_context,
        path = file.path,
        description = file.description,
        language_upper = language.to_uppercase(),
        deps = dependencies_line(file),
        file_requirements = file_type_requirements(ext),
        answer = answer_format(language),
    )
}

fn file_type_requirements(ext: &str) -> &'static str {
    match ext {
        "html" => HTML_REQUIREMENTS,
        "css" => CSS_REQUIREMENTS,
        "js" => JS_REQUIREMENTS,
        _ => GENERIC_REQUIREMENTS,
    }
}

const HTML_REQUIREMENTS: &str = "
REQUISITOS ESPECÍFICOS PARA HTML5:
1. Estructura DOCTYPE html5 completa
2. Meta tags SEO optimizados (title, description, keywords, og:tags)
3. Viewport meta tag para responsive design
4. Elementos semánticos apropiados (header, nav, main, section, article, aside, footer)
5. ARIA labels para accesibilidad
6. Alt text descriptivo para todas las imágenes
7. Enlaces a hojas de estilo y scripts externos
8. Structured data (JSON-LD) cuando sea apropiado
9. Contenido específico y realista basado en el contexto del proyecto
10. Formularios accesibles con labels apropiados (si aplica)";

const CSS_REQUIREMENTS: &str = "
REQUISITOS ESPECÍFICOS PARA CSS3:
1. Reset CSS o normalize para consistencia entre navegadores
2. Variables CSS para colores y espaciado
3. Diseño responsive con mobile-first approach
4. Flexbox y/o CSS Grid para layouts modernos
5. Animaciones y transiciones suaves
6. Hover effects y estados interactivos
7. Tipografía optimizada con Google Fonts
8. Colores con buen contraste para accesibilidad
9. Media queries para diferentes dispositivos
10. Optimización para rendimiento (evitar selectores complejos)";

// Generated scripts used to crash on missing elements; the guard rules stay in the prompt.
const JS_REQUIREMENTS: &str = "
REQUISITOS ESPECÍFICOS PARA JAVASCRIPT VANILLA:
1. Código ES6+ moderno pero compatible
2. Event listeners para interactividad con validación de elementos
3. Manipulación del DOM eficiente con verificación de existencia
4. Validación de formularios (si aplica) con manejo de errores
5. Animaciones y efectos visuales suaves
6. Manejo de errores robusto y defensivo
7. Código modular y bien organizado
8. Comentarios explicativos
9. Optimización para rendimiento
10. Funcionalidades específicas del contexto del proyecto

IMPORTANTE PARA EVITAR ERRORES:
- SIEMPRE verificar que los elementos existen antes de manipularlos
- NUNCA usar selectores vacíos como querySelector('#') o querySelector('')
- Usar try-catch para operaciones que pueden fallar
- Validar que los elementos tienen los atributos necesarios antes de usarlos
- Para enlaces con href=\"#\", usar preventDefault() y manejar la navegación apropiadamente

EJEMPLO DE CÓDIGO SEGURO:
// CORRECTO - Verificar existencia antes de usar
const element = document.querySelector('#mi-elemento');
if (element) {
  element.addEventListener('click', function(e) {
    e.preventDefault();
    // Lógica aquí
  });
}

// INCORRECTO - No verificar existencia
document.querySelector('#').addEventListener('click', ...); // Error!";

const GENERIC_REQUIREMENTS: &str = "
REQUISITOS GENERALES:
1. Código limpio y bien estructurado
2. Comentarios explicativos apropiados
3. Manejo de errores
4. Optimización para rendimiento
5. Compatibilidad con el contexto del proyecto";

fn general_prompt(file: &FileDescription, project_context: &str, language: &str) -> String {
    format!(
"
Actúa como un desarrollador de software experto especializado en {language}. Necesito que generes el código para un archivo específico dentro de un proyecto.

CONTEXTO DEL PROYECTO:
{project_context}

ARCHIVO A GENERAR:
Ruta: {path}
Descripción: {description}
{deps}

Tu tarea es:
1. Generar el código completo para este archivo.
2. Asegurarte de que el código sea funcional, bien estructurado y siga las mejores prácticas.
3. Incluir comentarios explicativos donde sea necesario.
4. Asegurarte de que el código sea compatible con las dependencias mencionadas.
5. Implementar todas las funcionalidades descritas en la descripción del archivo.
6. Usar nombres de variables y funciones descriptivos y en español.
7. Seguir las convenciones de estilo estándar para el lenguaje.

IMPORTANTE:
- El código debe ser completo y funcional, no solo un esqueleto o pseudocódigo.
- Incluye manejo de errores apropiado.
- Asegúrate de que el código sea eficiente y siga las mejores prácticas.
- No omitas partes importantes del código.

{answer}",
        language = language,
        project_context = project_context,
        path = file.path,
        description = file.description,
        deps = dependencies_line(file),
        answer = answer_format(language),
    )
}

/// Prompt for the model-assisted correction pass. Security and performance
/// sections are included only when the options ask for them.
pub fn correction_prompt(
    code: &str,
    language: &str,
    issues: &[CodeError],
    options: &CorrectionOptions,
) -> String {
    let mut focus = String::new();
    if options.analyze_security {
        focus.push_str("- Corregir vulnerabilidades de seguridad (eval, innerHTML, document.write, exec)\n");
    }
    if options.analyze_performance {
        focus.push_str("- Aplicar optimizaciones de rendimiento\n");
    }
    focus.push_str("- Errores de sintaxis\n- Problemas de lógica\n- Problemas de estilo y legibilidad\n");

    let issues_text = if issues.is_empty() {
        String::new()
    } else {
        let lines = issues
            .iter()
            .map(|e| format!("- Línea {}: {} ({})", e.line_start, e.message, e.severity.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\n\nPROBLEMAS IDENTIFICADOS:\n{lines}")
    };

    format!(
r#"
Como Agente Generador especializado en {language}, corrige el siguiente código:

```{language}
{code}
```{issues_text}

ENFOQUE DE LA CORRECCIÓN:
{focus}
OPCIONES DE CORRECCIÓN:
{auto_fix}
{formatting}
{explain}

Responde ÚNICAMENTE con un JSON válido:
{{
  "correctedCode": "código corregido completo",
  "changes": [
    {{
      "lineNumber": 1,
      "originalCode": "contenido anterior",
      "correctedCode": "línea corregida",
      "reason": "razón del cambio"
    }}
  ],
  "summary": "Resumen de cambios realizados",
  "confidence": 0
}}"#,
        language = language,
        code = code,
        issues_text = issues_text,
        focus = focus,
        auto_fix = if options.auto_fix { "- Aplicar correcciones automáticas" } else { "- Sugerir correcciones" },
        formatting = if options.preserve_formatting { "- Preservar formato original" } else { "- Optimizar formato" },
        explain = if options.explain_changes { "- Explicar cada cambio" } else { "- Solo aplicar cambios" },
    )
}

/// Prompt asking the design stage for an `{analysis, proposal}` JSON object.
pub fn design_proposal_prompt(instruction: &str) -> String {
    format!(
r#"
Eres un DISEÑADOR WEB SENIOR especializado en crear sitios web modernos, atractivos y profesionales usando HTML5, CSS3 y JavaScript vanilla.

INSTRUCCIÓN DEL USUARIO: {instruction}

Analiza el tipo de negocio, el público objetivo y el tono visual adecuado antes de proponer el diseño.
El contenido debe ser específico para la instrucción, sin textos genéricos.

Responde ÚNICAMENTE con un objeto JSON con la siguiente estructura:

{{
  "analysis": {{
    "businessType": "string",
    "visualStyle": "string",
    "targetAudience": "string"
  }},
  "proposal": {{
    "id": "string",
    "title": "string",
    "description": "string",
    "style": "string",
    "colorPalette": {{
      "primary": "string",
      "secondary": "string",
      "accent": "string",
      "background": "string",
      "text": "string"
    }},
    "components": [
      {{
        "id": "string",
        "name": "string",
        "type": "header|hero|about|services|contact|content|footer",
        "description": "string",
        "properties": {{}}
      }}
    ]
  }}
}}"#
    )
}

/// Asks for the business type and visual direction of a site as JSON.
pub fn instruction_analysis_prompt(instruction: &str) -> String {
    format!(
r#"
Analiza la siguiente instrucción para crear un sitio web ULTRA-MODERNO y ATRACTIVO:

INSTRUCCIÓN: "{instruction}"

Proporciona un análisis detallado en formato JSON para generar el diseño más moderno posible:

{{
  "businessType": "string (tipo específico de negocio identificado)",
  "visualStyle": "string (estilo visual moderno: tech-futurista, elegante-minimalista, creativo-artístico, corporativo-premium)",
  "modernTrends": ["string (tendencias: glassmorphism, neumorphism, gradientes-dinámicos, parallax-scrolling, micro-animaciones)"],
  "colorScheme": "string (esquema de colores moderno: dark-elegant, vibrant-gradient, minimal-monochrome, warm-professional)",
  "layoutApproach": "string (enfoque de layout: asymmetric-grid, hero-focused, card-masonry, split-screen, full-screen-sections)",
  "interactionLevel": "string (nivel de interactividad: subtle-elegant, dynamic-engaging, playful-creative, professional-smooth)",
  "targetAudience": "string (audiencia objetivo identificada)"
}}

Responde ÚNICAMENTE con el JSON válido, sin comentarios.
"#
    )
}

/// System instruction sent with a model, when it has one.
pub fn system_prompt_for(model: &str) -> Option<&'static str> {
    match model {
        "GPT-4O" => Some("Eres un experto desarrollador de Python especializado en arquitectura, diseño de sistemas y algoritmos complejos."),
        "GPT-O3 Mini" => Some("Eres un experto en implementación de código, optimización y depuración."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(category: StackCategory) -> TechnologyStack {
        TechnologyStack {
            name: "Axum API".into(),
            category,
            technologies: vec!["Rust".into(), "Axum".into()],
            features: vec!["REST".into(), "Auth".into()],
            complexity: "advanced".into(),
        }
    }

    #[test]
    fn static_template_for_web_files() {
        let f = FileDescription::new("index.html", "landing page for a bakery");
        let p = build_prompt(&f, "Panadería artesanal", None);
        assert!(p.contains("SITIOS WEB ESTÁTICOS"));
        assert!(p.contains("REQUISITOS ESPECÍFICOS PARA HTML5"));
        assert!(p.contains("```html"));
    }

    #[test]
    fn js_template_carries_element_guard_rules() {
        let f = FileDescription::new("script.js", "interactivity");
        let p = build_prompt(&f, "ctx", None);
        assert!(p.contains("SIEMPRE verificar que los elementos existen"));
        assert!(p.contains("```javascript"));
    }

    #[test]
    fn general_template_for_other_files() {
        let f = FileDescription::new("src/app.py", "entry point").with_dependencies(["utils.py"]);
        let p = build_prompt(&f, "ctx", None);
        assert!(p.contains("especializado en python"));
        assert!(p.contains("Dependencias: utils.py"));
        assert!(!p.contains("SITIOS WEB ESTÁTICOS"));
    }

    #[test]
    fn stack_overrides_static_template() {
        let f = FileDescription::new("index.html", "page");
        let p = build_prompt(&f, "ctx", Some(&stack(StackCategory::Backend)));
        assert!(p.contains("REQUISITOS ESPECÍFICOS PARA BACKEND (Axum API)"));
        assert!(p.contains("CATEGORÍA: BACKEND"));
        assert!(p.contains("1. REST\n2. Auth"));
        assert!(!p.contains("SITIOS WEB ESTÁTICOS"));
    }

    #[test]
    fn every_category_has_its_own_checklist() {
        let cats = [
            StackCategory::Frontend,
            StackCategory::Backend,
            StackCategory::Fullstack,
            StackCategory::Mobile,
            StackCategory::Desktop,
            StackCategory::Ai,
            StackCategory::Blockchain,
            StackCategory::Other,
        ];
        let texts: Vec<String> = cats.iter().map(|c| stack_requirements(&stack(*c))).collect();
        for (i, a) in texts.iter().enumerate() {
            assert!(a.contains("Rust, Axum"));
            for b in texts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn missing_extension_is_unknown_language() {
        assert_eq!(language_from_path("Makefile"), "unknown");
        assert_eq!(language_from_path("dir.v2/README"), "unknown");
        assert_eq!(language_from_path("a/b.TS"), "typescript");
        let p = build_prompt(&FileDescription::new("Dockerfile", "image"), "ctx", None);
        assert!(p.contains("especializado en unknown"));
    }

    #[test]
    fn build_prompt_is_pure() {
        let f = FileDescription::new("styles.css", "theme");
        let s = stack(StackCategory::Frontend);
        assert_eq!(build_prompt(&f, "ctx", None), build_prompt(&f, "ctx", None));
        assert_eq!(build_prompt(&f, "ctx", Some(&s)), build_prompt(&f, "ctx", Some(&s)));
    }

    #[test]
    fn correction_prompt_follows_options() {
        let mut opts = CorrectionOptions::default();
        opts.analyze_security = true;
        opts.analyze_performance = false;
        let p = correction_prompt("var x = 1", "javascript", &[], &opts);
        assert!(p.contains("vulnerabilidades de seguridad"));
        assert!(!p.contains("optimizaciones de rendimiento"));
        assert!(p.contains("\"correctedCode\""));
    }
}
