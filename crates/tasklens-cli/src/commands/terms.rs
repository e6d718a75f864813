use anyhow::Result;
use std::path::Path;
use tasklens_core::error::TermError;
use tasklens_core::terms::TermRegistry;
use tasklens_core::types::PropertyKind;

const ALL_PROPERTIES: [PropertyKind; 4] = [
    PropertyKind::Priority,
    PropertyKind::Status,
    PropertyKind::DueDate,
    PropertyKind::TimeContext,
];

pub fn run(property: Option<&str>, config_file: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_file)?;
    let registry = TermRegistry::new(&config.terms);
    let snapshot = registry.snapshot();

    let selected: Vec<PropertyKind> = match property {
        Some(raw) => {
            let kind = PropertyKind::parse_kind(raw).ok_or_else(|| TermError::UnknownProperty {
                property: raw.to_string(),
            })?;
            vec![kind]
        }
        None => ALL_PROPERTIES.to_vec(),
    };

    println!(
        "term snapshot v{} ({})",
        snapshot.version(),
        snapshot.fingerprint()
    );
    for kind in selected {
        println!("\n[{kind}]");
        for (key, entry) in snapshot.table(kind).entries() {
            let mut parts = Vec::new();
            if !entry.aliases.is_empty() {
                parts.push(format!("aliases: {}", entry.aliases.join(", ")));
            }
            if !entry.symbols.is_empty() {
                parts.push(format!("symbols: {}", entry.symbols.join(" ")));
            }
            for (language, synonyms) in &entry.synonyms {
                parts.push(format!("{language}: {}", synonyms.join(", ")));
            }
            println!("  {key:<12} {}", parts.join(" · "));
        }
    }
    Ok(())
}
