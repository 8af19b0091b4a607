//! Bodies substituted when a model reply has nothing usable.

const HTML: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>CODESTORM - {title}</title>
  <link rel="stylesheet" href="styles.css">
  <style>
    body {
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      margin: 0;
      background: linear-gradient(135deg, #1e3c72 0%, #2a5298 100%);
      color: white;
      min-height: 100vh;
      display: flex;
      align-items: center;
      justify-content: center;
    }
    .container {
      text-align: center;
      background: rgba(255, 255, 255, 0.1);
      padding: 40px;
      border-radius: 15px;
      max-width: 600px;
    }
  </style>
</head>
<body>
  <div class="container">
    <h1>CODESTORM</h1>
    <p>Tu proyecto está listo para ser desarrollado</p>
    <p>Esta página fue generada automáticamente por el sistema de IA de CODESTORM</p>
  </div>
  <script>
    document.addEventListener('DOMContentLoaded', function() {
      console.log('CODESTORM - Página cargada correctamente');
    });
  </script>
</body>
</html>"#;

const CSS: &str = r#"/* Estilos principales para {path} - Generado por CODESTORM */

* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

body {
  font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
  line-height: 1.6;
  color: #333;
  background: linear-gradient(135deg, #1e3c72 0%, #2a5298 100%);
  min-height: 100vh;
}

.container {
  max-width: 1200px;
  margin: 0 auto;
  padding: 20px;
}

@media (max-width: 768px) {
  .container {
    padding: 10px;
  }
}

/* Tema CODESTORM */
.codestorm-primary {
  background: linear-gradient(135deg, #1e3c72 0%, #2a5298 100%);
}

.codestorm-accent {
  background: linear-gradient(45deg, #42a5f5, #1976d2);
}

.codestorm-dark {
  background: #0d1421;
  color: white;
}

.codestorm-blue {
  color: #42a5f5;
}"#;

const SCRIPT: &str = r#"// Contenido por defecto generado para {path}
// El generador de código no pudo crear contenido válido para este archivo

function init() {
  console.log("Archivo {name} cargado correctamente");
}

// Inicializar cuando el documento esté listo
document.addEventListener('DOMContentLoaded', init);"#;

const GENERIC: &str = "// Contenido por defecto generado para {path}
// El generador de código no pudo crear contenido válido para este archivo
// Tipo de archivo: {ext}";

pub fn default_content(path: &str) -> String {
    let name = crate::wire::file_name(path);
    let ext = crate::prompt::extension_of(path).unwrap_or("").to_lowercase();

    let template = match ext.as_str() {
        "html" => HTML,
        "css" => CSS,
        "js" | "jsx" | "ts" | "tsx" => SCRIPT,
        _ => GENERIC,
    };
    let title = name.strip_suffix(".html").unwrap_or(name);

    template
        .replace("{title}", title)
        .replace("{path}", path)
        .replace("{name}", name)
        .replace("{ext}", &ext)
}
