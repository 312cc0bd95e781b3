//! Section-labelled rendering for arbitrary context objects.
//!
//! Recognised keys feed fixed sections in a fixed order. Every key that no
//! section used is listed under `INFORMACIÓN ADICIONAL` in the object's own
//! key order, so no data is silently dropped.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::fixed::diagnosis_line;
use super::format::{display_value, format_date, format_datetime, inline_value, scalar_text};
use crate::payload::Diagnosis;

/// Specialty value that means "no specialty".
const NO_SPECIALTY: &str = "NINGUNA";

/// Render a dynamic context.
pub fn render(ctx: &Map<String, Value>) -> String {
    let mut renderer = Renderer {
        ctx,
        consumed: HashSet::new(),
    };

    let blocks = [
        renderer.demographics(),
        renderer.admission(),
        renderer.medical_order(),
        renderer.diagnoses(),
        renderer.stay_history(),
        renderer.technical(),
    ];
    let mut blocks: Vec<String> = blocks.into_iter().flatten().collect();
    blocks.extend(renderer.additional());

    blocks.join("\n\n")
}

struct Renderer<'a> {
    ctx: &'a Map<String, Value>,
    consumed: HashSet<&'static str>,
}

impl Renderer<'_> {
    /// Scalar text of a key, marking it consumed when present.
    fn take_text(&mut self, key: &'static str) -> Option<String> {
        let text = self.ctx.get(key).and_then(scalar_text)?;
        self.consumed.insert(key);
        Some(text)
    }

    fn take_with(
        &mut self,
        key: &'static str,
        format: fn(&Value) -> Option<String>,
    ) -> Option<String> {
        let text = self.ctx.get(key).and_then(format)?;
        self.consumed.insert(key);
        Some(text)
    }

    // ── Sections ──────────────────────────────────────────────────────────

    fn demographics(&mut self) -> Option<String> {
        let nombre = self.take_text("nombrePaciente")?;
        let mut line = format!("El paciente {nombre}");

        if let Some(numero) = self.take_text("numeroDocumento") {
            let tipo = self
                .take_text("tipoDocumento")
                .unwrap_or_else(|| "ID".to_string());
            line.push_str(&format!(" con documento {tipo}: {numero}"));
        }
        if let Some(edad) = self.take_text("edad") {
            line.push_str(&format!(", {edad}"));
        }
        if let Some(genero) = self.take_text("genero") {
            line.push_str(&format!(", género {genero}"));
        }
        if let Some(nacimiento) = self.take_with("fechaNacimiento", format_date) {
            line.push_str(&format!(", nacido el {nacimiento}"));
        }

        line.push('.');
        Some(line)
    }

    fn admission(&mut self) -> Option<String> {
        let id = self.take_text("idIngreso")?;
        let mut lines = vec![
            "**INFORMACIÓN DEL INGRESO:**".to_string(),
            format!("- ID de Ingreso: {id}"),
        ];

        if let Some(fecha) = self.take_with("fechaIngreso", format_datetime) {
            lines.push(format!("- Fecha de Ingreso: {fecha}"));
        }
        if let Some(estado) = self.take_text("estadoIngreso") {
            lines.push(format!("- Estado: {estado}"));
        }
        if let Some(registro) = self.take_text("numeroRegistro") {
            lines.push(format!("- Número de Registro: {registro}"));
        }
        if let Some(modulo) = self.take_text("modulo") {
            lines.push(format!("- Módulo: {}", modulo.to_uppercase()));
        }

        Some(lines.join("\n"))
    }

    fn medical_order(&mut self) -> Option<String> {
        let order = self.ctx.get("ordenMedicaActual")?.as_object()?;
        self.consumed.insert("ordenMedicaActual");

        let mut lines = vec!["**ORDEN MÉDICA ACTUAL:**".to_string()];

        if let Some(id) = order.get("id").and_then(scalar_text) {
            lines.push(format!("- ID de Orden: {id}"));
        }
        if let Some(fecha) = order.get("fecha").and_then(format_datetime) {
            lines.push(format!("- Fecha: {fecha}"));
        }
        if let Some(peso) = order.get("peso").and_then(scalar_text) {
            lines.push(format!("- Peso del paciente: {peso} kg"));
        }
        if let Some(usuario) = order.get("usuario").and_then(Value::as_object) {
            lines.extend(physician_lines(usuario));
        }
        if let Some(medicamentos) = order.get("medicamentos").and_then(Value::as_array) {
            lines.push("- Medicamentos prescritos:".to_string());
            lines.extend(
                medicamentos
                    .iter()
                    .map(|m| format!("  • {}", inline_value(m))),
            );
        }

        Some(lines.join("\n"))
    }

    fn diagnoses(&mut self) -> Option<String> {
        let items: Vec<String> = self
            .ctx
            .get("diagnosticos")?
            .as_array()?
            .iter()
            .filter(|item| !item.is_null())
            .map(dynamic_diagnosis)
            .collect();
        if items.is_empty() {
            return None;
        }
        self.consumed.insert("diagnosticos");

        let mut lines = vec!["**DIAGNÓSTICOS:**".to_string()];
        for (i, item) in items.iter().enumerate() {
            lines.push(format!("{}. {item}", i + 1));
        }
        Some(lines.join("\n"))
    }

    fn stay_history(&mut self) -> Option<String> {
        let days = self.ctx.get("estancia")?.as_array()?;
        if days.is_empty() {
            return None;
        }
        self.consumed.insert("estancia");

        let mut lines = vec!["**HISTORIAL DE ESTANCIA:**".to_string()];
        for (i, day) in days.iter().enumerate() {
            let fecha = day
                .get("diaEstancia")
                .and_then(format_date)
                .unwrap_or_else(|| "Sin fecha".to_string());
            let mut line = format!("{}. {fecha}", i + 1);
            if let Some(descripcion) = day.get("descripcion").and_then(scalar_text) {
                line.push_str(&format!(": {descripcion}"));
            }
            if let Some(justificacion) = day.get("justificacionEstancia").and_then(scalar_text) {
                line.push_str(&format!(" - {justificacion}"));
            }
            lines.push(line);
        }
        Some(lines.join("\n"))
    }

    fn technical(&mut self) -> Option<String> {
        let componente = self.take_text("componente")?;
        let mut lines = vec![
            "**CONTEXTO TÉCNICO:**".to_string(),
            format!("- Componente: {componente}"),
        ];
        if let Some(id) = self.take_text("idEmpleado") {
            lines.push(format!("- ID Empleado: {id}"));
        }
        Some(lines.join("\n"))
    }

    fn additional(&self) -> Option<String> {
        let lines: Vec<String> = self
            .ctx
            .iter()
            .filter(|(key, value)| {
                !self.consumed.contains(key.as_str())
                    && !value.is_null()
                    && value.as_str() != Some("")
            })
            .map(|(key, value)| format!("- {key}: {}", display_value(value)))
            .collect();

        if lines.is_empty() {
            return None;
        }
        Some(format!("**INFORMACIÓN ADICIONAL:**\n{}", lines.join("\n")))
    }
}

fn physician_lines(usuario: &Map<String, Value>) -> Vec<String> {
    let field = |key: &str| usuario.get(key).and_then(scalar_text);
    let mut lines = Vec::new();

    if let Some(nombre) = field("nombreCompleto").or_else(|| field("empleado")) {
        lines.push(format!("- Médico: {nombre}"));
    }
    if let Some(cedula) = field("cedula") {
        lines.push(format!("- Cédula del médico: {cedula}"));
    }
    if let Some(cargo) = field("cargo") {
        lines.push(format!("- Cargo: {cargo}"));
    }
    if let Some(especialidad) = field("especialidad").filter(|e| e != NO_SPECIALTY) {
        lines.push(format!("- Especialidad: {especialidad}"));
    }
    if let Some(empresa) = field("empresa") {
        lines.push(format!("- Institución: {empresa}"));
    }
    lines
}

/// Diagnoses in dynamic payloads are usually strings; coded records are
/// rendered like their fixed-schema counterparts.
fn dynamic_diagnosis(item: &Value) -> String {
    Diagnosis::from_value(item)
        .and_then(|d| diagnosis_line(&d))
        .unwrap_or_else(|| inline_value(item))
}
