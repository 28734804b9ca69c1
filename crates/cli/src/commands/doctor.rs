//! `portico doctor`: Diagnose configuration and template.

use portico_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Portico Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — using defaults (run `portico init`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    // Template
    match portico_gateway::load_template(&config.ui) {
        Ok(template) => println!("  ✅ Template valid ({} bytes)", template.len()),
        Err(e) => {
            println!("  ❌ Template invalid: {e}");
            issues += 1;
        }
    }

    if let Some(path) = &config.ui.not_ready_path {
        if path.is_file() {
            println!("  ✅ Not-ready page found");
        } else {
            println!("  ❌ Not-ready page missing: {}", path.display());
            issues += 1;
        }
    }

    // Authentication
    match config.auth.mode.as_str() {
        "basic" if config.auth.users.is_empty() => {
            println!("  ⚠️  Basic auth has no users — every login will fail");
            issues += 1;
        }
        "basic" => println!("  ✅ Basic auth: {} user(s)", config.auth.users.len()),
        _ => println!(
            "  ✅ Trusted header auth via `{}` — make sure a proxy sets it",
            config.auth.header_name
        ),
    }

    // Preferences
    if config.preferences.backend == "file" {
        let dir = config.preferences.dir_or_default();
        if dir.is_dir() {
            println!("  ✅ Preferences directory exists: {}", dir.display());
        } else {
            println!(
                "  ⚠️  Preferences directory missing (created on start): {}",
                dir.display()
            );
        }
    } else {
        println!("  ⚠️  In-memory preferences — lost on restart");
    }

    if config.gateway.allow_public_bind {
        println!("  ⚠️  Public bind allowed on {}", config.gateway.host);
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
