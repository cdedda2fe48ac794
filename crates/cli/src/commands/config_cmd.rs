//! `icspec config`: configuration management commands.

use icspec_config::AppConfig;

use super::{CommandResult, EXIT_USAGE, exit_for};

pub fn show() -> CommandResult {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(exit_for(true))
}

pub fn path() -> CommandResult {
    println!("{}", AppConfig::config_path().display());
    Ok(exit_for(true))
}

pub fn init(force: bool) -> CommandResult {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    if config_path.exists() && !force {
        eprintln!(
            "Config file already exists at {} (use --force to overwrite)",
            config_path.display()
        );
        return Ok(EXIT_USAGE.into());
    }

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote default config: {}", config_path.display());
    Ok(exit_for(true))
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = icspec_config::AppConfig::config_path();
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn default_toml_parses_back() {
        let text = icspec_config::AppConfig::default_toml();
        let parsed: icspec_config::AppConfig = toml::from_str(&text).unwrap();
        assert!(parsed.validate().is_ok());
    }
}
