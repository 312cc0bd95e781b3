//! Classification of raw context payloads.
//!
//! A payload is inspected exactly once and turned into a [`ContextPayload`];
//! each variant then has its own renderer. Objects that only use the known
//! clinical fields become [`ContextPayload::Fixed`]; any other key sends the
//! whole object down the dynamic path. Only keys decide the mode: a known
//! field with an unusable value is dropped, not promoted to dynamic.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::unwrap::decode_layers;

/// Top-level keys understood by the fixed-schema renderer.
pub const KNOWN_FIELDS: &[&str] = &[
    "vista",
    "paciente",
    "diagnosticos",
    "fechaEvolucion",
    "medicoAtencion",
    "examenFisico",
    "idEmpleado",
];

// ── Payload ───────────────────────────────────────────────────────────────

/// A context payload after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextPayload {
    /// Nothing to render.
    Empty,
    /// Only known clinical fields.
    Fixed(StructuredContext),
    /// Arbitrary object, rendered section by section.
    Dynamic(Map<String, Value>),
    /// Free text supplied as-is.
    Text(String),
}

impl ContextPayload {
    /// Classify a raw payload.
    pub fn classify(raw: Option<&Value>) -> Self {
        match raw {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::Object(map)) => Self::from_object(map),
            Some(Value::String(s)) => Self::from_text(s),
            Some(Value::Array(items)) if items.is_empty() => Self::Empty,
            Some(other) => Self::Text(crate::render::format::display_value(other)),
        }
    }

    fn from_text(raw: &str) -> Self {
        match decode_layers(raw) {
            Value::Object(map) => Self::from_object(&map),
            Value::String(text) if text.is_empty() => Self::Empty,
            Value::String(text) => Self::Text(text),
            _ => Self::Text(raw.trim().to_string()),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        if map.is_empty() {
            return Self::Empty;
        }

        if map.keys().any(|k| !KNOWN_FIELDS.contains(&k.as_str())) {
            return Self::Dynamic(map.clone());
        }

        match serde_json::from_value::<StructuredContext>(Value::Object(map.clone())) {
            Ok(structured) => Self::Fixed(structured),
            Err(e) => {
                tracing::debug!(error = %e, "Known fields unreadable, rendering nothing from them");
                Self::Fixed(StructuredContext::default())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// ── Fixed-schema types ────────────────────────────────────────────────────

/// The known clinical subset of a context object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredContext {
    #[serde(default, deserialize_with = "lenient_text")]
    pub vista: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub paciente: Option<Patient>,
    #[serde(default, deserialize_with = "lenient_diagnoses")]
    pub diagnosticos: Option<Vec<Diagnosis>>,
    /// Kept as a raw value so the renderer can format it as a date.
    #[serde(default)]
    pub fecha_evolucion: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub medico_atencion: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub examen_fisico: Option<PhysicalExam>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub id_empleado: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Patient {
    #[serde(default, deserialize_with = "lenient_text")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub identificacion: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub edad: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sexo: Option<String>,
}

/// A diagnosis is either a bare description or a coded record.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnosis {
    Text(String),
    Record(DiagnosisRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub codigo_evo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub codigo_diagnostico: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub estado: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub observacion: Option<String>,
}

impl Diagnosis {
    /// Read one diagnosis entry. `null`, booleans, arrays and blank text
    /// are not diagnoses.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| Self::Text(trimmed.to_string()))
            }
            Value::Number(n) => Some(Self::Text(n.to_string())),
            Value::Object(_) => serde_json::from_value(value.clone()).ok().map(Self::Record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalExam {
    #[serde(default, deserialize_with = "lenient_text")]
    pub cabeza: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub torax: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub abdomen: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub extremidades: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub genitario_urinario: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cardio_pulmonar: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub s_nerv_central: Option<String>,
}

/// Accept strings, numbers and booleans as text. `null`, blank strings and
/// structured values are absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// A nested record, or absent when the value is not an object.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// A list of diagnoses with unusable entries skipped. A lone string or
/// record counts as a one-item list.
fn lenient_diagnoses<'de, D>(deserializer: D) -> Result<Option<Vec<Diagnosis>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items.iter().filter_map(Diagnosis::from_value).collect()),
        Some(single) => Diagnosis::from_value(&single).map(|d| vec![d]),
    })
}
