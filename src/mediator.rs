//! Authenticating request mediator.
//!
//! [`AuthenticatingMediator`] sits between a caller and the transport. For every request it
//! makes sure a usable bearer token exists (cache-aside against its [`TokenStore`], logging in
//! through its [`LoginFunction`] when needed), attaches the token, sends the request, and, when
//! the response says the token was rejected, invalidates it, logs in once more, and re-sends the
//! request exactly once.
//!
//! Concurrent callers needing a fresh token are coalesced through the store's single-flight
//! guard so only one login is in flight per store. No data lock is held while a login or send
//! is awaited.

mod metrics;
mod policy;

pub use metrics::*;
pub use policy::*;

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, SessionId, Token, TokenSecret},
	config::MediatorConfig,
	http::{SignableRequest, StatusResponse},
	login::LoginFunction,
	obs::{self, FlowKind, FlowOutcome},
	pipeline::{Next, Stage, StageFuture},
	store::{SessionStores, TokenStore},
};
#[cfg(feature = "reqwest")]
use crate::{config::RelayConfig, error::TransportError, login::HttpLogin};

/// Attaches bearer tokens to outgoing requests and recovers once from a rejected token.
///
/// Cloning is cheap; clones share the credentials, store, login function, and metrics.
#[derive(Clone)]
pub struct AuthenticatingMediator {
	credentials: Arc<Credentials>,
	store: Arc<dyn TokenStore>,
	login: Arc<dyn LoginFunction>,
	policy: Arc<dyn ResponsePolicy>,
	config: MediatorConfig,
	metrics: Arc<MediatorMetrics>,
}
impl AuthenticatingMediator {
	/// Creates a mediator using the [`DefaultResponsePolicy`] and a default [`MediatorConfig`].
	pub fn new(
		credentials: Credentials,
		store: Arc<dyn TokenStore>,
		login: Arc<dyn LoginFunction>,
	) -> Self {
		Self {
			credentials: Arc::new(credentials),
			store,
			login,
			policy: Arc::new(DefaultResponsePolicy),
			config: MediatorConfig::default(),
			metrics: Default::default(),
		}
	}

	/// Builds an HTTP-backed mediator from a [`RelayConfig`].
	#[cfg(feature = "reqwest")]
	pub fn from_config(config: &RelayConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
		let login = HttpLogin::new(config.login_endpoint()?)?;

		Self::from_config_with_login(config, store, login)
	}

	/// Same as [`from_config`](Self::from_config), logging in through `client`.
	///
	/// Use this to share a connection pool or to trust a private certificate authority.
	#[cfg(feature = "reqwest")]
	pub fn from_config_with_client(
		config: &RelayConfig,
		store: Arc<dyn TokenStore>,
		client: ReqwestClient,
	) -> Result<Self> {
		let login = HttpLogin::with_client(client, config.login_endpoint()?);

		Self::from_config_with_login(config, store, login)
	}

	#[cfg(feature = "reqwest")]
	fn from_config_with_login(
		config: &RelayConfig,
		store: Arc<dyn TokenStore>,
		login: HttpLogin,
	) -> Result<Self> {
		Ok(Self::new(config.credentials()?, store, Arc::new(login))
			.with_config(config.mediator_config()?))
	}

	/// Overrides the response policy.
	pub fn with_policy<P>(mut self, policy: P) -> Self
	where
		P: 'static + ResponsePolicy,
	{
		self.policy = Arc::new(policy);

		self
	}

	/// Overrides the tuning knobs.
	pub fn with_config(mut self, config: MediatorConfig) -> Self {
		self.config = config;

		self
	}

	/// Returns a mediator that shares everything with `self` except the token store.
	pub fn for_store(&self, store: Arc<dyn TokenStore>) -> Self {
		Self { store, ..self.clone() }
	}

	/// Returns a mediator bound to the store of `session`, creating it on first use.
	pub fn for_session(&self, sessions: &SessionStores, session: &SessionId) -> Self {
		self.for_store(sessions.store_for(session))
	}

	/// Credentials presented on every login.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Token store backing this mediator.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		&self.store
	}

	/// Active tuning knobs.
	pub fn config(&self) -> &MediatorConfig {
		&self.config
	}

	/// In-process counters.
	pub fn metrics(&self) -> &MediatorMetrics {
		&self.metrics
	}

	/// Returns a usable token, logging in first when the store holds none.
	pub async fn token(&self) -> Result<Token> {
		self.current_token(None).await
	}

	/// Drops the cached token; the next request logs in again.
	pub fn logout(&self) {
		self.store.clear();
	}

	/// Signs `request`, sends it through `send`, and retries once after a rejected token.
	///
	/// When the retried request is rejected again, that second response is returned as-is; use
	/// [`intercept_checked`](Self::intercept_checked) to turn it into an error instead. A request
	/// that cannot be cloned is never retried.
	///
	/// # Errors
	///
	/// - [`Error::AuthenticationUnavailable`] when a login fails; `send` is not called then.
	/// - [`Error::TimedOut`] when a login exceeds [`MediatorConfig::login_timeout`].
	/// - Whatever `send` returns, unchanged.
	pub async fn intercept<R, S, F, Fut>(&self, request: R, send: F) -> Result<S>
	where
		R: SignableRequest,
		S: StatusResponse,
		F: FnMut(R) -> Fut,
		Fut: Future<Output = Result<S>>,
	{
		obs::observe(FlowKind::Intercept, "intercept", self.exchange(request, send)).await
	}

	/// Same as [`intercept`](Self::intercept), but a final rejected response becomes
	/// [`Error::AuthorizationRejected`].
	pub async fn intercept_checked<R, S, F, Fut>(&self, request: R, send: F) -> Result<S>
	where
		R: SignableRequest,
		S: StatusResponse,
		F: FnMut(R) -> Fut,
		Fut: Future<Output = Result<S>>,
	{
		let response = self.intercept(request, send).await?;

		match self.classify(&response) {
			ResponseClass::TokenRejected =>
				Err(Error::AuthorizationRejected { status: response.status() }),
			_ => Ok(response),
		}
	}

	/// Same as [`intercept`](Self::intercept), abandoned with [`Error::Cancelled`] as soon as
	/// `cancel` resolves.
	///
	/// A login that was already in flight keeps the single-flight guard only until its future is
	/// dropped; the store is left untouched.
	pub async fn intercept_until<R, S, F, Fut, C>(&self, request: R, send: F, cancel: C) -> Result<S>
	where
		R: SignableRequest,
		S: StatusResponse,
		F: FnMut(R) -> Fut,
		Fut: Future<Output = Result<S>>,
		C: Future<Output = ()>,
	{
		tokio::select! {
			biased;
			_ = cancel => {
				obs::flow_event(FlowKind::Intercept, FlowOutcome::Failure, "cancelled by caller");

				Err(Error::Cancelled)
			},
			result = self.intercept(request, send) => result,
		}
	}

	/// Executes a reqwest request through this mediator with `client`.
	#[cfg(feature = "reqwest")]
	pub async fn execute(
		&self,
		client: &ReqwestClient,
		request: reqwest::Request,
	) -> Result<reqwest::Response> {
		self.intercept(request, |req| async move {
			Ok(client.execute(req).await.map_err(TransportError::from)?)
		})
		.await
	}

	async fn exchange<R, S, F, Fut>(&self, mut request: R, mut send: F) -> Result<S>
	where
		R: SignableRequest,
		S: StatusResponse,
		F: FnMut(R) -> Fut,
		Fut: Future<Output = Result<S>>,
	{
		let token = self.current_token(None).await?;
		let replay = request.try_clone();

		request.attach_bearer(token.value())?;

		let response = send(request).await?;
		let class = self.classify(&response);

		if class != ResponseClass::TokenRejected {
			return Ok(response);
		}

		let Some(replay) = replay else {
			obs::flow_event(
				FlowKind::Retry,
				FlowOutcome::Failure,
				"rejected request cannot be replayed",
			);

			return Ok(response);
		};

		drop(response);

		self.metrics.record_retry();

		obs::observe(FlowKind::Retry, "retry", self.retry(replay, token.value(), &mut send)).await
	}

	async fn retry<R, S, F, Fut>(
		&self,
		mut request: R,
		rejected: &TokenSecret,
		send: &mut F,
	) -> Result<S>
	where
		R: SignableRequest,
		S: StatusResponse,
		F: FnMut(R) -> Fut,
		Fut: Future<Output = Result<S>>,
	{
		self.store.clear_if(rejected);

		let token = self.current_token(Some(rejected)).await?;

		request.attach_bearer(token.value())?;

		send(request).await
	}

	async fn current_token(&self, rejected: Option<&TokenSecret>) -> Result<Token> {
		if let Some(token) = self.cached(rejected) {
			self.metrics.record_cache_hit();

			return Ok(token);
		}

		let _guard = self.store.refresh_guard().lock().await;

		// Another caller may have finished a login while this one waited for the guard.
		if let Some(token) = self.cached(rejected) {
			self.metrics.record_cache_hit();
			obs::flow_event(FlowKind::Login, FlowOutcome::Success, "reused concurrent login");

			return Ok(token);
		}

		let token = self.login_once().await?;

		self.store.set(token.clone());

		Ok(token)
	}

	fn cached(&self, rejected: Option<&TokenSecret>) -> Option<Token> {
		// A horizon past the calendar leaves no token usable.
		let horizon = OffsetDateTime::now_utc().checked_add(self.config.expiry_skew)?;

		self.store
			.get_if_valid_at(horizon)
			.filter(|token| rejected.is_none_or(|value| !token.has_value(value)))
	}

	async fn login_once(&self) -> Result<Token> {
		self.metrics.record_login();

		let started = Instant::now();
		let result = obs::observe(FlowKind::Login, "login", async {
			let attempt = self.login.login(&self.credentials);

			match self.config.login_timeout {
				Some(limit) => match tokio::time::timeout(limit, attempt).await {
					Ok(outcome) => outcome.map_err(Error::from),
					Err(_) => Err(Error::TimedOut { operation: "login" }),
				},
				None => attempt.await.map_err(Error::from),
			}
		})
		.await;

		obs::record_login_duration(started.elapsed(), FlowOutcome::of(&result));

		if result.is_err() {
			self.metrics.record_login_failure();
		}

		result
	}

	fn classify<S>(&self, response: &S) -> ResponseClass
	where
		S: StatusResponse,
	{
		self.policy.classify(
			&ResponseContext::new(response.status())
				.with_www_authenticate(response.www_authenticate()),
		)
	}
}
impl Debug for AuthenticatingMediator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatingMediator")
			.field("credentials", &self.credentials)
			.field("config", &self.config)
			.field("metrics", &self.metrics)
			.finish()
	}
}
impl<Req, Resp> Stage<Req, Resp> for AuthenticatingMediator
where
	Req: 'static + SignableRequest,
	Resp: 'static + StatusResponse,
{
	fn handle<'a>(&'a self, request: Req, next: Next<'a, Req, Resp>) -> StageFuture<'a, Resp> {
		Box::pin(self.intercept(request, move |req| next.run(req)))
	}
}
