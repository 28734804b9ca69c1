//! `portico init`: First-time setup.

use portico_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🚪 Portico — First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let defaults = AppConfig::default();
    let preferences_dir = defaults.preferences.dir_or_default();
    if !preferences_dir.exists() {
        std::fs::create_dir_all(&preferences_dir)?;
        println!("✅ Created preferences directory: {}", preferences_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Run: portico hash-password <password>");
        println!("   2. Add a user to [auth] in {}:", config_path.display());
        println!("        [[auth.users]]");
        println!("        name = \"admin\"");
        println!("        password_sha256 = \"<digest>\"");
        println!("   3. Run: portico serve\n");
    }

    println!("🎉 Setup complete!\n");

    Ok(())
}
