//! Narrative rendering for the known clinical fields.
//!
//! Output is a sequence of paragraphs in a fixed order: patient and visit,
//! numbered diagnoses, physical exam, annotations. A missing field drops its
//! clause; a paragraph with nothing in it is not emitted at all.

use serde_json::Value;

use super::format::{clause, format_timestamp};
use crate::payload::{Diagnosis, DiagnosisRecord, Patient, PhysicalExam, StructuredContext};

/// Render a fixed-schema context.
pub fn render(ctx: &StructuredContext) -> String {
    let blocks = [
        visit_paragraph(ctx),
        ctx.diagnosticos.as_deref().and_then(diagnoses_paragraph),
        ctx.examen_fisico.as_ref().and_then(exam_paragraph),
        annotations_paragraph(ctx),
    ];

    blocks.into_iter().flatten().collect::<Vec<_>>().join("\n\n")
}

fn visit_paragraph(ctx: &StructuredContext) -> Option<String> {
    let sentences: Vec<String> = [
        ctx.paciente.as_ref().and_then(patient_sentence),
        attention_sentence(ctx.fecha_evolucion.as_ref(), ctx.medico_atencion.as_deref()),
    ]
    .into_iter()
    .flatten()
    .collect();

    (!sentences.is_empty()).then(|| sentences.join(" "))
}

fn patient_sentence(patient: &Patient) -> Option<String> {
    if patient.nombre.is_none()
        && patient.identificacion.is_none()
        && patient.edad.is_none()
        && patient.sexo.is_none()
    {
        return None;
    }

    let mut sentence = String::from("El paciente");
    if let Some(nombre) = &patient.nombre {
        sentence.push(' ');
        sentence.push_str(nombre);
    }
    if let Some(id) = &patient.identificacion {
        sentence.push_str(&format!(" con identificación {id}"));
    }
    if let Some(edad) = &patient.edad {
        sentence.push_str(&format!(", de {edad} años"));
    }
    if let Some(sexo) = &patient.sexo {
        sentence.push_str(&format!(", de sexo {sexo}"));
    }
    sentence.push('.');
    Some(sentence)
}

fn attention_sentence(fecha: Option<&Value>, medico: Option<&str>) -> Option<String> {
    let fecha = fecha.and_then(format_timestamp);
    if fecha.is_none() && medico.is_none() {
        return None;
    }

    let mut sentence = String::from("Fue atendido");
    if let Some(fecha) = fecha {
        sentence.push_str(&format!(" el {fecha}"));
    }
    if let Some(medico) = medico {
        sentence.push_str(&format!(" por el Dr./Dra. {medico}"));
    }
    sentence.push('.');
    Some(sentence)
}

/// One line for a diagnosis, or `None` when it carries neither a
/// description nor a code.
pub(crate) fn diagnosis_line(diagnosis: &Diagnosis) -> Option<String> {
    match diagnosis {
        Diagnosis::Text(text) if text.is_empty() => None,
        Diagnosis::Text(text) => Some(text.clone()),
        Diagnosis::Record(record) => record_line(record),
    }
}

fn record_line(record: &DiagnosisRecord) -> Option<String> {
    match (&record.descripcion, &record.codigo_diagnostico) {
        (Some(descripcion), codigo) => {
            let mut line = descripcion.clone();
            if let Some(codigo) = codigo {
                line.push_str(&format!(" (código: {codigo})"));
            }
            if let Some(observacion) = &record.observacion {
                line.push_str(&format!(". Observación: {observacion}"));
            }
            Some(line)
        }
        (None, Some(codigo)) => Some(format!("Diagnóstico con código {codigo}")),
        (None, None) => None,
    }
}

fn diagnoses_paragraph(diagnoses: &[Diagnosis]) -> Option<String> {
    let lines: Vec<String> = diagnoses.iter().filter_map(diagnosis_line).collect();
    if lines.is_empty() {
        return None;
    }

    let noun = if lines.len() == 1 { "diagnóstico" } else { "diagnósticos" };
    let mut paragraph = format!("Presenta {} {noun}:", lines.len());
    for (i, line) in lines.iter().enumerate() {
        paragraph.push_str(&format!("\n{}. {line}", i + 1));
    }
    Some(paragraph)
}

fn exam_paragraph(exam: &PhysicalExam) -> Option<String> {
    let findings: Vec<String> = [
        ("Cabeza", &exam.cabeza),
        ("Tórax", &exam.torax),
        ("Abdomen", &exam.abdomen),
        ("Extremidades", &exam.extremidades),
        ("Sistema genitourinario", &exam.genitario_urinario),
        ("Sistema cardiopulmonar", &exam.cardio_pulmonar),
        ("Sistema nervioso central", &exam.s_nerv_central),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        let value = clause(value.as_deref()?);
        (!value.is_empty()).then(|| format!("{label}: {value}."))
    })
    .collect();

    if findings.is_empty() {
        return None;
    }
    Some(format!(
        "En el examen físico se observa: {}",
        findings.join(" ")
    ))
}

fn annotations_paragraph(ctx: &StructuredContext) -> Option<String> {
    let mut sentences = Vec::new();
    if let Some(vista) = &ctx.vista {
        sentences.push(format!("Esta información corresponde a la vista \"{vista}\"."));
    }
    if let Some(id) = &ctx.id_empleado {
        sentences.push(format!("Registrado por el empleado con ID {id}."));
    }
    (!sentences.is_empty()).then(|| sentences.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(raw: Value) -> StructuredContext {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn full_context_renders_in_order() {
        let ctx = structured(json!({
            "vista": "evolucion",
            "paciente": {"nombre": "Juan Pérez", "identificacion": "123", "edad": 45, "sexo": "M"},
            "diagnosticos": [{"codigoDiagnostico": "I10", "descripcion": "Hipertensión", "observacion": "Controlada"}],
            "fechaEvolucion": "2024-03-15T10:30:00",
            "medicoAtencion": "Gómez",
            "examenFisico": {"cabeza": "Normocéfalo.", "torax": "Simétrico"},
            "idEmpleado": 42
        }));

        let expected = "El paciente Juan Pérez con identificación 123, de 45 años, de sexo M. \
Fue atendido el 15/3/2024, 10:30:00 a. m. por el Dr./Dra. Gómez.\n\n\
Presenta 1 diagnóstico:\n1. Hipertensión (código: I10). Observación: Controlada\n\n\
En el examen físico se observa: Cabeza: Normocéfalo. Tórax: Simétrico.\n\n\
Esta información corresponde a la vista \"evolucion\". Registrado por el empleado con ID 42.";
        assert_eq!(render(&ctx), expected);
    }

    #[test]
    fn diagnosis_only_has_no_dangling_sections() {
        let ctx = structured(json!({"diagnosticos": ["Hipertensión", "Asma"]}));
        assert_eq!(
            render(&ctx),
            "Presenta 2 diagnósticos:\n1. Hipertensión\n2. Asma"
        );
    }

    #[test]
    fn code_only_and_empty_records() {
        let ctx = structured(json!({
            "diagnosticos": [{"codigoDiagnostico": "J45"}, {"estado": "activo"}, ""]
        }));
        assert_eq!(
            render(&ctx),
            "Presenta 1 diagnóstico:\n1. Diagnóstico con código J45"
        );
    }

    #[test]
    fn empty_exam_is_omitted() {
        let ctx = structured(json!({"examenFisico": {"cabeza": ""}, "vista": "x"}));
        assert_eq!(
            render(&ctx),
            "Esta información corresponde a la vista \"x\"."
        );
    }

    #[test]
    fn attention_without_patient() {
        let ctx = structured(json!({"medicoAtencion": "Ruiz"}));
        assert_eq!(render(&ctx), "Fue atendido por el Dr./Dra. Ruiz.");
    }

    #[test]
    fn unparseable_visit_date_is_verbatim() {
        let ctx = structured(json!({"fechaEvolucion": "ayer en la tarde"}));
        assert_eq!(render(&ctx), "Fue atendido el ayer en la tarde.");
    }

    #[test]
    fn exam_uses_system_labels() {
        let ctx = structured(json!({
            "examenFisico": {"sNervCentral": "Alerta", "genitarioUrinario": "Normal", "cardioPulmonar": "RsCs rítmicos"}
        }));
        assert_eq!(
            render(&ctx),
            "En el examen físico se observa: Sistema genitourinario: Normal. \
Sistema cardiopulmonar: RsCs rítmicos. Sistema nervioso central: Alerta."
        );
    }
}
