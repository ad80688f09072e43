//! Relay configuration: login endpoint validation, mediator tuning, and loading from JSON files
//! or environment variables.

// std
use std::{path::Path, time::Duration as StdDuration};
// self
use crate::{_prelude::*, auth::Credentials, error::ConfigError};

/// Largest expiry skew accepted from configuration documents (one day).
pub const MAX_EXPIRY_SKEW_SECS: u64 = 86_400;

/// Validated login endpoint.
///
/// HTTPS is required because the login body carries the client secret; plain HTTP is accepted
/// only when the builder was told to allow it (local development, mock servers).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginEndpoint {
	url: Url,
	timeout: Option<StdDuration>,
}
impl LoginEndpoint {
	/// Returns a builder seeded with `url`.
	pub fn builder(url: Url) -> LoginEndpointBuilder {
		LoginEndpointBuilder { url, allow_insecure: false, timeout: None }
	}

	/// Parses and validates an HTTPS endpoint.
	pub fn parse(url: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(url).map_err(|source| ConfigError::InvalidEndpoint { source })?;

		Self::builder(url).build()
	}

	/// Endpoint URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Per-request timeout applied by the HTTP login function, if any.
	pub fn timeout(&self) -> Option<StdDuration> {
		self.timeout
	}
}

/// Builder for [`LoginEndpoint`] values.
#[derive(Debug)]
pub struct LoginEndpointBuilder {
	url: Url,
	allow_insecure: bool,
	timeout: Option<StdDuration>,
}
impl LoginEndpointBuilder {
	/// Accepts `http://` URLs in addition to `https://`.
	pub fn allow_insecure(mut self, allow: bool) -> Self {
		self.allow_insecure = allow;

		self
	}

	/// Bounds each HTTP login request.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the endpoint.
	pub fn build(self) -> Result<LoginEndpoint, ConfigError> {
		validate_endpoint(&self.url, self.allow_insecure)?;

		Ok(LoginEndpoint { url: self.url, timeout: self.timeout })
	}
}

/// Tuning knobs for [`AuthenticatingMediator`](crate::mediator::AuthenticatingMediator).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MediatorConfig {
	/// Margin subtracted from a token's lifetime when deciding whether it is still usable.
	///
	/// Zero keeps the literal `now < expires_at` rule.
	pub expiry_skew: Duration,
	/// Upper bound for a single login call.
	pub login_timeout: Option<StdDuration>,
}
impl MediatorConfig {
	/// Sets [`expiry_skew`](Self::expiry_skew).
	pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
		self.expiry_skew = skew;

		self
	}

	/// Sets [`login_timeout`](Self::login_timeout).
	pub fn with_login_timeout(mut self, timeout: StdDuration) -> Self {
		self.login_timeout = Some(timeout);

		self
	}
}

/// Serializable relay configuration.
///
/// ```json
/// {
/// 	"loginUrl": "https://auth.example.com/api/login",
/// 	"clientId": "web-app-001",
/// 	"clientSecret": "s3cret",
/// 	"loginTimeoutSecs": 10
/// }
/// ```
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelayConfig {
	/// Login endpoint URL.
	pub login_url: Url,
	/// Client identifier sent on every login.
	pub client_id: String,
	/// Client secret sent on every login.
	pub client_secret: String,
	/// Upper bound for a single login call, in seconds.
	#[serde(default)]
	pub login_timeout_secs: Option<u64>,
	/// Expiry safety margin, in seconds.
	#[serde(default)]
	pub expiry_skew_secs: u64,
	/// Accept a plain-HTTP login endpoint.
	#[serde(default)]
	pub allow_insecure: bool,
}
impl RelayConfig {
	/// Parses a JSON document, reporting the offending field on failure.
	pub fn from_json_str(document: &str) -> Result<Self> {
		let mut de = serde_json::Deserializer::from_str(document);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source }.into())
	}

	/// Reads and parses a JSON file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let document = std::fs::read_to_string(path).map_err(ConfigError::from)?;

		Self::from_json_str(&document)
	}

	/// Loads the configuration from `{PREFIX}_*` environment variables.
	pub fn from_env(prefix: &str) -> Result<Self> {
		Self::from_lookup(prefix, |name| std::env::var(name).ok())
	}

	/// Loads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let name = |suffix: &str| format!("{prefix}_{suffix}");
		let required = |suffix: &str| {
			let name = name(suffix);

			lookup(&name).ok_or(ConfigError::MissingVariable { name })
		};
		let login_url_name = name("LOGIN_URL");
		let login_url = Url::parse(&required("LOGIN_URL")?).map_err(|e| {
			ConfigError::InvalidVariable { name: login_url_name, reason: e.to_string() }
		})?;
		let client_id = required("CLIENT_ID")?;
		let client_secret = required("CLIENT_SECRET")?;
		let login_timeout_secs = lookup(&name("LOGIN_TIMEOUT_SECS"))
			.map(|raw| parse_var(&name("LOGIN_TIMEOUT_SECS"), &raw))
			.transpose()?;
		let expiry_skew_secs = lookup(&name("EXPIRY_SKEW_SECS"))
			.map(|raw| parse_var(&name("EXPIRY_SKEW_SECS"), &raw))
			.transpose()?
			.unwrap_or_default();

		if expiry_skew_secs > MAX_EXPIRY_SKEW_SECS {
			return Err(ConfigError::InvalidVariable {
				name: name("EXPIRY_SKEW_SECS"),
				reason: format!("must not exceed {MAX_EXPIRY_SKEW_SECS} seconds"),
			}
			.into());
		}

		let allow_insecure = lookup(&name("ALLOW_INSECURE"))
			.map(|raw| parse_flag(&name("ALLOW_INSECURE"), &raw))
			.transpose()?
			.unwrap_or_default();

		Ok(Self {
			login_url,
			client_id,
			client_secret,
			login_timeout_secs,
			expiry_skew_secs,
			allow_insecure,
		})
	}

	/// Validated client credentials.
	pub fn credentials(&self) -> Result<Credentials> {
		Credentials::new(&self.client_id, self.client_secret.clone())
	}

	/// Validated login endpoint.
	pub fn login_endpoint(&self) -> Result<LoginEndpoint> {
		Ok(LoginEndpoint::builder(self.login_url.clone()).allow_insecure(self.allow_insecure).build()?)
	}

	/// Mediator tuning derived from this document.
	///
	/// Fails when `expirySkewSecs` exceeds [`MAX_EXPIRY_SKEW_SECS`].
	pub fn mediator_config(&self) -> Result<MediatorConfig> {
		if self.expiry_skew_secs > MAX_EXPIRY_SKEW_SECS {
			return Err(ConfigError::ExpirySkewTooLarge {
				secs: self.expiry_skew_secs,
				max: MAX_EXPIRY_SKEW_SECS,
			}
			.into());
		}

		let config = MediatorConfig::default()
			.with_expiry_skew(Duration::seconds(self.expiry_skew_secs as i64));

		Ok(match self.login_timeout_secs {
			Some(secs) => config.with_login_timeout(StdDuration::from_secs(secs)),
			None => config,
		})
	}
}
impl Debug for RelayConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayConfig")
			.field("login_url", &self.login_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("login_timeout_secs", &self.login_timeout_secs)
			.field("expiry_skew_secs", &self.expiry_skew_secs)
			.field("allow_insecure", &self.allow_insecure)
			.finish()
	}
}

fn validate_endpoint(url: &Url, allow_insecure: bool) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if allow_insecure => Ok(()),
		_ => Err(ConfigError::InsecureEndpoint { url: url.to_string() }),
	}
}

fn parse_var(name: &str, raw: &str) -> Result<u64, ConfigError> {
	raw.trim()
		.parse()
		.map_err(|e: std::num::ParseIntError| ConfigError::InvalidVariable {
			name: name.to_owned(),
			reason: e.to_string(),
		})
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" => Ok(true),
		"0" | "false" | "no" | "" => Ok(false),
		other => Err(ConfigError::InvalidVariable {
			name: name.to_owned(),
			reason: format!("expected a boolean, found `{other}`"),
		}),
	}
}
