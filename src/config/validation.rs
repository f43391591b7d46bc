use crate::config::types::{Config, HttpConfig, OutputConfig, ProxyConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_http_config(&config.http)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the catalog origin and category location
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.category_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "category_path cannot be empty".to_string(),
        ));
    }

    base.join(&config.category_path).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid category_path '{}': {}",
            config.category_path, e
        ))
    })?;

    Ok(())
}

/// Validates transport limits
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries == 0 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "proxy host cannot be empty".to_string(),
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation(
            "proxy port must be non-zero".to_string(),
        ));
    }

    if config.password.is_some() && config.username.is_none() {
        return Err(ConfigError::Validation(
            "proxy password given without a username".to_string(),
        ));
    }

    Url::parse(&config.url())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy address: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_file cannot be empty".to_string(),
        ));
    }

    if config.responses_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "responses_dir cannot be empty".to_string(),
        ));
    }

    if config.log_file.is_empty() {
        return Err(ConfigError::Validation(
            "log_file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyKind;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_site_config() {
        let mut site = SiteConfig::default();
        assert!(validate_site_config(&site).is_ok());

        site.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            validate_site_config(&site),
            Err(ConfigError::InvalidUrl(_))
        ));

        site.base_url = "not a url".to_string();
        assert!(validate_site_config(&site).is_err());

        let site = SiteConfig {
            category_path: "  ".to_string(),
            ..SiteConfig::default()
        };
        assert!(validate_site_config(&site).is_err());
    }

    #[test]
    fn test_validate_http_config() {
        let mut http = HttpConfig::default();
        assert!(validate_http_config(&http).is_ok());

        http.max_retries = 0;
        assert!(validate_http_config(&http).is_err());

        let http = HttpConfig {
            max_concurrent_requests: 101,
            ..HttpConfig::default()
        };
        assert!(validate_http_config(&http).is_err());

        let http = HttpConfig {
            timeout_secs: 0,
            ..HttpConfig::default()
        };
        assert!(validate_http_config(&http).is_err());
    }

    #[test]
    fn test_validate_proxy_config() {
        let proxy = ProxyConfig {
            kind: ProxyKind::Http,
            host: "proxy.local".to_string(),
            port: 3128,
            username: None,
            password: None,
        };
        assert!(validate_proxy_config(&proxy).is_ok());

        let empty_host = ProxyConfig {
            host: String::new(),
            ..proxy.clone()
        };
        assert!(validate_proxy_config(&empty_host).is_err());

        let zero_port = ProxyConfig {
            port: 0,
            ..proxy.clone()
        };
        assert!(validate_proxy_config(&zero_port).is_err());

        let orphan_password = ProxyConfig {
            password: Some("secret".to_string()),
            ..proxy
        };
        assert!(validate_proxy_config(&orphan_password).is_err());
    }
}
