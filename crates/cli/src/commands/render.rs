//! `aymara render`: Print the text a context payload renders to.

use std::io::Read;
use std::path::Path;

use serde_json::Value;

pub fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let from_stdin = file.as_os_str() == "-";
    let raw = if from_stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| format!("Failed to read {}: {e}", file.display()))?
    };

    // Files must hold JSON; stdin may also be plain context text.
    let value = if from_stdin {
        serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
    } else {
        serde_json::from_str::<Value>(&raw).map_err(aymara_core::Error::from)?
    };
    let rendered = aymara_context::normalize(Some(&value));

    if rendered.is_empty() {
        eprintln!("⚠️  Context rendered to nothing");
    } else {
        println!("{rendered}");
    }

    Ok(())
}
