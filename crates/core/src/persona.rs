//! Persona: the fixed system instruction block sent ahead of every prompt.
//!
//! Loading follows a short hierarchy (first match wins):
//!
//! 1. **Inline override**: `persona.system_prompt_override` in config
//! 2. **Prompt file**: `persona.system_prompt_file` in config
//! 3. **Built-in**: the AYMARA instruction block below
//!
//! A missing or empty prompt file is skipped with a warning.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::REFUSAL_MESSAGE;

/// Label prefixed to the context system message.
pub const CONTEXT_LABEL: &str = "Contexto adicional para responder:";

/// Where a persona may be loaded from.
#[derive(Debug, Clone, Default)]
pub struct PersonaSource {
    /// Inline system prompt (skips file loading)
    pub system_prompt_override: Option<String>,

    /// Path to a file holding the system prompt
    pub system_prompt_file: Option<PathBuf>,
}

/// The assistant persona.
#[derive(Debug, Clone)]
pub struct Persona {
    /// The full system instruction block
    pub system_prompt: String,

    /// Where the prompt came from (for diagnostics)
    pub source: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Persona {
    /// The built-in AYMARA persona.
    pub fn builtin() -> Self {
        Self {
            system_prompt: builtin_system_prompt(REFUSAL_MESSAGE),
            source: "<builtin>".into(),
        }
    }

    /// Resolve the persona from its sources.
    pub fn load(source: &PersonaSource) -> Self {
        if let Some(prompt) = source
            .system_prompt_override
            .as_deref()
            .filter(|p| !p.trim().is_empty())
        {
            debug!("Using system prompt override");
            return Self {
                system_prompt: prompt.trim().to_string(),
                source: "<override>".into(),
            };
        }

        if let Some(path) = &source.system_prompt_file {
            match read_prompt_file(path) {
                Some(prompt) => {
                    debug!(file = %path.display(), "Loaded system prompt file");
                    return Self {
                        system_prompt: prompt,
                        source: path.display().to_string(),
                    };
                }
                None => warn!(file = %path.display(), "System prompt file missing or empty, using built-in persona"),
            }
        }

        Self::builtin()
    }

    /// Render the system message that carries caller context.
    pub fn context_message(context: &str) -> String {
        format!("{CONTEXT_LABEL} {context}")
    }
}

fn read_prompt_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn builtin_system_prompt(refusal: &str) -> String {
    format!(
        "Eres AYMARA, una inteligencia artificial médico-administrativa creada para asistir en temas del sistema de salud colombiano.
Tu conocimiento y capacidades se centran en:

- Normas, leyes, decretos y reglamentaciones del sistema de salud en Colombia.
- Procesos administrativos y clínicos: RIPS, facturación, glosas, auditorías, PQRD, manual tarifario.
- Procedimientos médicos y administrativos, incluyendo scores médicos (como Apache, SOFA, Glasgow, etc.), protocolos clínicos y guías de práctica clínica.
- Cálculos y evaluaciones médicas utilizadas en el contexto clínico colombiano.
- Uso de lenguaje claro, directo y neutro, manteniendo profesionalismo.

Reglas y estilo de respuesta:
1. No responder temas fuera de medicina, administración en salud, leyes o normativas del sector salud colombiano.
   - Si el usuario pregunta algo fuera de tu alcance, responde:
     \"{refusal}\"
2. Prioriza la precisión sobre la extensión: responde de forma breve pero completa.
3. Usa ejemplos prácticos y aplicables a la realidad colombiana.
4. Mantén un tono profesional y neutro.
5. Si no tienes datos suficientes para responder con seguridad, indícalo y sugiere una fuente oficial.

Formato de respuesta:
- Introducción breve (máx. 1 línea).
- Explicación clara y puntual.
- Si aplica, lista numerada o en viñetas para facilitar lectura.
- Referencias o normativa relacionada (cuando sea relevante).

Recuerda: siempre actúas como AYMARA, nunca como otro asistente."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_persona_mentions_refusal_phrase() {
        let persona = Persona::builtin();
        assert_eq!(persona.source, "<builtin>");
        assert!(persona.system_prompt.contains(REFUSAL_MESSAGE));
        assert!(persona.system_prompt.starts_with("Eres AYMARA"));
    }

    #[test]
    fn override_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Prompt desde archivo").unwrap();

        let persona = Persona::load(&PersonaSource {
            system_prompt_override: Some("Prompt en línea".into()),
            system_prompt_file: Some(file.path().to_path_buf()),
        });
        assert_eq!(persona.system_prompt, "Prompt en línea");
        assert_eq!(persona.source, "<override>");
    }

    #[test]
    fn file_prompt_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  Prompt desde archivo  ").unwrap();

        let persona = Persona::load(&PersonaSource {
            system_prompt_override: None,
            system_prompt_file: Some(file.path().to_path_buf()),
        });
        assert_eq!(persona.system_prompt, "Prompt desde archivo");
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let persona = Persona::load(&PersonaSource {
            system_prompt_override: Some("   ".into()),
            system_prompt_file: Some(PathBuf::from("/nonexistent/prompt.md")),
        });
        assert_eq!(persona.source, "<builtin>");
    }

    #[test]
    fn context_message_is_labelled() {
        assert_eq!(
            Persona::context_message("El paciente Ana."),
            "Contexto adicional para responder: El paciente Ana."
        );
    }
}
