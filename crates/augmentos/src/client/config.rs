use secrecy::SecretString;

use super::consts;

pub struct Config {
    base_url: String,
    package_name: String,
    api_key: SecretString,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn with_package_name(mut self, package_name: &str) -> Self {
        self.config.package_name = package_name.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Config {
    /// Defaults: production cloud endpoint, package name and API key taken
    /// from the environment when present.
    pub fn new() -> Self {
        Self {
            base_url: consts::BASE_URL.to_string(),
            package_name: std::env::var(consts::PACKAGE_NAME).unwrap_or_else(|_| "".to_string()),
            api_key: std::env::var(consts::AUGMENTOS_API_KEY)
                .unwrap_or_else(|_| "".to_string())
                .into(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}
