//! `portico check`: Strict validation of a page template.

use portico_compose::{END_MARKER, START_MARKER, Template};
use portico_config::AppConfig;
use std::path::PathBuf;

pub async fn run(template_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let (label, template) = match template_path {
        Some(path) => (path.display().to_string(), Template::load(&path)?),
        None => {
            let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
            let label = config
                .ui
                .template_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "embedded index.html".into());
            (label, portico_gateway::load_template(&config.ui)?)
        }
    };

    let offsets = template.validate()?;

    println!("✅ Template OK: {label}");
    println!("   Size:         {} bytes", template.len());
    println!("   Start marker: {START_MARKER} at byte {}", offsets.prefix_end);
    println!("   End marker:   {END_MARKER} ends at byte {}", offsets.suffix_start);
    println!(
        "   Replaced:     {} bytes",
        offsets.suffix_start - offsets.prefix_end
    );

    Ok(())
}
