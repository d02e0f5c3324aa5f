use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use driftnet::config::load_config;
///
/// let config = load_config(Path::new("driftnet.toml")).unwrap();
/// println!("Politeness delay: {}ms", config.crawler.delay);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
seeds = ["https://example.com/"]

[crawler]
delay = 250
request-timeout = 5000
honor-bot-rules = false
only-follow-sitemap = false

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[filter]
allow = ["*.example.com"]
deny = ["ads.example.com"]

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.seeds, vec!["https://example.com/"]);
        assert_eq!(config.crawler.delay, 250);
        assert_eq!(config.crawler.request_timeout, 5000);
        assert!(!config.crawler.honor_bot_rules);
        assert!(!config.crawler.only_follow_sitemap);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(
            config.user_agent.contact_url.as_deref(),
            Some("https://example.com/about")
        );
        assert_eq!(config.filter.allow, vec!["*.example.com"]);
        assert_eq!(config.filter.deny, vec!["ads.example.com"]);
        assert_eq!(config.output.database_path, "./test.db");
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let config = parse_config(r#"seeds = ["http://localhost:8080/"]"#).unwrap();

        assert_eq!(config.crawler.delay, 100);
        assert_eq!(config.crawler.request_timeout, 3000);
        assert!(config.crawler.honor_bot_rules);
        assert!(config.crawler.only_follow_sitemap);
        assert_eq!(config.user_agent.crawler_name, "driftnet");
        assert_eq!(config.user_agent.contact_url, None);
        assert!(config.filter.allow.is_empty());
        assert_eq!(config.output.database_path, "./driftnet.db");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = parse_config("[crawler]\ndelay = 0\n").unwrap();
        assert_eq!(config.crawler.delay, 0);
        assert_eq!(config.crawler.request_timeout, 3000);
        assert!(config.crawler.honor_bot_rules);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
request-timeout = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }
}
