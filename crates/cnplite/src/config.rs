//! Client configuration: endpoint, credentials, protocol version and XML engine

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use crate::error::{Error, Result};
use crate::xml::{AttributePolicy, Backend};

pub const DEFAULT_REPORT_GROUP: &str = "Default Report Group";
pub const DEFAULT_VERSION: &str = "12.0";

const SANDBOX_MERCHANT_ID: &str = "default";
const SANDBOX_CREDENTIAL: &str = "sandbox";

/// First protocol major version of the CNP generation
const CNP_MAJOR_VERSION: u32 = 12;

/// Environment variables read by [`Config::from_env`]
pub mod vars {
    pub const ENV: &str = "CNPLITE_ENV";
    pub const MERCHANT_ID: &str = "CNPLITE_MERCHANT_ID";
    pub const USERNAME: &str = "CNPLITE_USERNAME";
    pub const PASSWORD: &str = "CNPLITE_PASSWORD";
    pub const REPORT_GROUP: &str = "CNPLITE_REPORT_GROUP";
    pub const VERSION: &str = "CNPLITE_VERSION";
    pub const XML_BACKEND: &str = "CNPLITE_XML_BACKEND";
    pub const PROXY_URL: &str = "CNPLITE_PROXY_URL";
    /// Proxy fallbacks when no dedicated proxy is set
    pub const HTTP_PROXY: [&str; 2] = ["HTTP_PROXY", "http_proxy"];
}

/// Remote environment the client talks to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Environment {
    #[default]
    Sandbox,
    Prelive,
    Postlive,
}

impl Environment {
    pub const ALL: [Self; 3] = [Self::Sandbox, Self::Prelive, Self::Postlive];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Prelive => "prelive",
            Self::Postlive => "postlive",
        }
    }

    /// Full endpoint URL
    pub const fn url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://www.testvantivcnp.com/sandbox/communicator/online",
            Self::Prelive => "https://payments.vantivprelive.com/vap/communicator/online",
            Self::Postlive => "https://payments.vantivcnp.com/vap/communicator/online",
        }
    }

    /// Path component of [`Self::url`], where requests are posted
    pub const fn path(self) -> &'static str {
        match self {
            Self::Sandbox => "/sandbox/communicator/online",
            Self::Prelive | Self::Postlive => "/vap/communicator/online",
        }
    }

    pub const fn is_sandbox(self) -> bool {
        matches!(self, Self::Sandbox)
    }
}

impl AsRef<str> for Environment {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|env| env.name() == name)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|env| env.name()).collect();
                Error::config(format!(
                    "environment must be one of: {}, got `{s}`",
                    names.join(", ")
                ))
            })
    }
}

/// Protocol generation, derived from the major version number
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Versions before 12
    Litle,
    /// Version 12 and later
    Cnp,
}

impl Protocol {
    pub fn from_version(version: &str) -> Result<Self> {
        let major = version
            .trim()
            .split('.')
            .next()
            .and_then(|major| major.parse::<u32>().ok())
            .ok_or_else(|| Error::config(format!("invalid protocol version `{version}`")))?;
        Ok(if major < CNP_MAJOR_VERSION {
            Self::Litle
        } else {
            Self::Cnp
        })
    }

    pub const fn request_root(self) -> &'static str {
        match self {
            Self::Litle => "litleOnlineRequest",
            Self::Cnp => "cnpOnlineRequest",
        }
    }

    pub const fn response_root(self) -> &'static str {
        match self {
            Self::Litle => "litleOnlineResponse",
            Self::Cnp => "cnpOnlineResponse",
        }
    }

    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Litle => "http://www.litle.com/schema",
            Self::Cnp => "http://www.vantivcnp.com/schema",
        }
    }

    /// Key a caller-supplied `txnId` is renamed to
    pub const fn txn_id_key(self) -> &'static str {
        match self {
            Self::Litle => "litleTxnId",
            Self::Cnp => "cnpTxnId",
        }
    }
}

/// Resolved, validated client configuration
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    environment: Environment,
    merchant_id: String,
    username: String,
    password: String,
    report_group: String,
    version: String,
    protocol: Protocol,
    backend: Backend,
    proxy_url: Option<String>,
    attributes: AttributePolicy,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reads the `CNPLITE_*` variables, falling back to `HTTP_PROXY` for the proxy
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConfigBuilder {
            environment: lookup(vars::ENV),
            merchant_id: lookup(vars::MERCHANT_ID),
            username: lookup(vars::USERNAME),
            password: lookup(vars::PASSWORD),
            report_group: lookup(vars::REPORT_GROUP),
            version: lookup(vars::VERSION),
            backend: lookup(vars::XML_BACKEND),
            proxy_url: lookup(vars::PROXY_URL),
            attribute_keys: None,
        };
        if builder.proxy_url.is_none() {
            builder.proxy_url = vars::HTTP_PROXY.iter().find_map(|key| lookup(key));
        }
        builder.build()
    }

    /// Builder seeded with this configuration, for deriving a variant
    pub fn with(&self) -> ConfigBuilder {
        ConfigBuilder {
            environment: Some(self.environment.name().to_owned()),
            merchant_id: Some(self.merchant_id.clone()),
            username: Some(self.username.clone()),
            password: Some(self.password.clone()),
            report_group: Some(self.report_group.clone()),
            version: Some(self.version.clone()),
            backend: Some(self.backend.name().to_owned()),
            proxy_url: self.proxy_url.clone(),
            attribute_keys: None,
        }
        .attributes(self.attributes.clone())
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn report_group(&self) -> &str {
        &self.report_group
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    pub fn attributes(&self) -> &AttributePolicy {
        &self.attributes
    }
}

impl Default for Config {
    /// Sandbox configuration with its shared test credentials
    fn default() -> Self {
        Self {
            environment: Environment::Sandbox,
            merchant_id: SANDBOX_MERCHANT_ID.to_owned(),
            username: SANDBOX_CREDENTIAL.to_owned(),
            password: SANDBOX_CREDENTIAL.to_owned(),
            report_group: DEFAULT_REPORT_GROUP.to_owned(),
            version: DEFAULT_VERSION.to_owned(),
            protocol: Protocol::Cnp,
            backend: Backend::default(),
            proxy_url: None,
            attributes: AttributePolicy::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("merchant_id", &self.merchant_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("report_group", &self.report_group)
            .field("version", &self.version)
            .field("backend", &self.backend)
            .field("proxy_url", &self.proxy_url)
            .finish_non_exhaustive()
    }
}

/// Collects raw settings; everything is validated by [`ConfigBuilder::build`]
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    environment: Option<String>,
    merchant_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
    report_group: Option<String>,
    version: Option<String>,
    backend: Option<String>,
    proxy_url: Option<String>,
    attribute_keys: Option<Vec<String>>,
}

impl ConfigBuilder {
    /// Environment by value or by name (`sandbox`, `prelive`, `postlive`)
    #[must_use]
    pub fn environment(mut self, environment: impl AsRef<str>) -> Self {
        self.environment = Some(environment.as_ref().to_owned());
        self
    }

    #[must_use]
    pub fn merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn report_group(mut self, report_group: impl Into<String>) -> Self {
        self.report_group = Some(report_group.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// XML engine by value or by name
    #[must_use]
    pub fn backend(mut self, backend: impl AsRef<str>) -> Self {
        self.backend = Some(backend.as_ref().to_owned());
        self
    }

    #[must_use]
    pub fn proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Replaces the default attribute keys
    #[must_use]
    pub fn attribute_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn attributes(self, policy: AttributePolicy) -> Self {
        let mut keys: Vec<String> = policy.keys().map(str::to_owned).collect();
        keys.sort_unstable();
        self.attribute_keys(keys)
    }

    pub fn build(self) -> Result<Config> {
        let environment = match present(self.environment) {
            Some(name) => name.parse::<Environment>()?,
            None => Environment::default(),
        };

        let (merchant_id, username, password) = if environment.is_sandbox() {
            (
                present(self.merchant_id).unwrap_or_else(|| SANDBOX_MERCHANT_ID.to_owned()),
                present(self.username).unwrap_or_else(|| SANDBOX_CREDENTIAL.to_owned()),
                present(self.password).unwrap_or_else(|| SANDBOX_CREDENTIAL.to_owned()),
            )
        } else {
            (
                required(self.merchant_id, "merchant id", environment)?,
                required(self.username, "username", environment)?,
                required(self.password, "password", environment)?,
            )
        };

        let version = present(self.version).unwrap_or_else(|| DEFAULT_VERSION.to_owned());
        let protocol = Protocol::from_version(&version)?;

        let backend = match present(self.backend) {
            Some(name) => name.parse::<Backend>()?,
            None => Backend::default(),
        };

        let proxy_url = present(self.proxy_url);
        if let Some(url) = &proxy_url {
            Url::parse(url).map_err(|e| Error::config(format!("invalid proxy url: {e}")))?;
        }

        let attributes = match self.attribute_keys {
            Some(keys) => AttributePolicy::new(keys)?,
            None => AttributePolicy::default(),
        };

        Ok(Config {
            environment,
            merchant_id,
            username,
            password,
            report_group: present(self.report_group)
                .unwrap_or_else(|| DEFAULT_REPORT_GROUP.to_owned()),
            version,
            protocol,
            backend,
            proxy_url,
            attributes,
        })
    }
}

/// Blank settings count as unset
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, what: &str, environment: Environment) -> Result<String> {
    present(value).ok_or_else(|| {
        Error::config(format!("{what} is required for the {environment} environment"))
    })
}
