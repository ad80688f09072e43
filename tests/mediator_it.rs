// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use bearer_relay::{
	auth::{Credentials, SessionId, Token, TokenSecret},
	config::MediatorConfig,
	error::{Error, Result, TransportError},
	http::{SignableRequest, StatusResponse},
	login::{LoginError, LoginFn},
	mediator::AuthenticatingMediator,
	store::{MemoryTokenStore, SessionStores, TokenStore},
};

#[derive(Clone, Debug, Default)]
struct ApiRequest {
	bearer: Option<String>,
}
impl SignableRequest for ApiRequest {
	fn attach_bearer(&mut self, token: &TokenSecret) -> Result<()> {
		self.bearer = Some(format!("Bearer {}", token.expose()));

		Ok(())
	}

	fn try_clone(&self) -> Option<Self> {
		Some(self.clone())
	}
}

#[derive(Debug)]
struct ApiResponse {
	status: u16,
	bearer: Option<String>,
}
impl StatusResponse for ApiResponse {
	fn status(&self) -> u16 {
		self.status
	}
}

struct Harness {
	mediator: AuthenticatingMediator,
	store: Arc<MemoryTokenStore>,
	logins: Arc<AtomicUsize>,
}

fn credentials() -> Credentials {
	Credentials::new("web-app-001", "s3cret").expect("Credentials fixture should be valid.")
}

fn token(value: &str, expires_at: OffsetDateTime) -> Token {
	Token::builder()
		.value(value)
		.issued_at(expires_at - Duration::minutes(20))
		.expires_at(expires_at)
		.build()
		.expect("Token fixture should build.")
}

fn harness(store: Arc<MemoryTokenStore>, login_delay: Option<StdDuration>) -> Harness {
	let logins = Arc::new(AtomicUsize::new(0));
	let counter = logins.clone();
	let login = LoginFn::new(move |_credentials: Credentials| {
		let n = counter.fetch_add(1, Ordering::SeqCst) + 1;

		async move {
			if let Some(delay) = login_delay {
				tokio::time::sleep(delay).await;
			}

			Token::builder()
				.value(format!("login-token-{n}"))
				.issued_now()
				.expires_in(Duration::seconds(1200))
				.build()
				.map_err(LoginError::from)
		}
	});
	let mediator = AuthenticatingMediator::new(credentials(), store.clone(), Arc::new(login));

	Harness { mediator, store, logins }
}

fn seeded(value: &str, expires_at: OffsetDateTime) -> Arc<MemoryTokenStore> {
	Arc::new(MemoryTokenStore::with_token(token(value, expires_at)))
}

fn cached_value(store: &MemoryTokenStore) -> Option<String> {
	store.get().map(|t| t.value().expose().to_owned())
}

#[tokio::test]
async fn valid_cached_token_is_attached_without_login() {
	let h = harness(seeded("cached-token", OffsetDateTime::now_utc() + Duration::minutes(10)), None);
	let response = h
		.mediator
		.intercept(ApiRequest::default(), |req: ApiRequest| async move {
			Ok(ApiResponse { status: 200, bearer: req.bearer })
		})
		.await
		.expect("Cached token should be attached.");

	assert_eq!(response.status, 200);
	assert_eq!(response.bearer.as_deref(), Some("Bearer cached-token"));
	assert_eq!(h.logins.load(Ordering::SeqCst), 0);
	assert_eq!(h.mediator.metrics().cache_hits(), 1);
}

#[tokio::test]
async fn empty_store_logs_in_with_the_configured_credentials() {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let recorder = seen.clone();
	let login = LoginFn::new(move |credentials: Credentials| {
		recorder.lock().push((
			credentials.client_id().to_string(),
			credentials.client_secret().expose().to_owned(),
		));

		async move {
			Token::builder()
				.value("abc.def.ghi")
				.issued_now()
				.expires_in(Duration::seconds(1200))
				.build()
				.map_err(LoginError::from)
		}
	});
	let store = Arc::new(MemoryTokenStore::default());
	let mediator = AuthenticatingMediator::new(credentials(), store.clone(), Arc::new(login));
	let before = OffsetDateTime::now_utc();
	let response = mediator
		.intercept(ApiRequest::default(), |req: ApiRequest| async move {
			Ok(ApiResponse { status: 200, bearer: req.bearer })
		})
		.await
		.expect("Login and send should succeed.");

	assert_eq!(response.bearer.as_deref(), Some("Bearer abc.def.ghi"));
	assert_eq!(*seen.lock(), [("web-app-001".to_owned(), "s3cret".to_owned())]);

	let cached = store.get().expect("The login result should be cached.");

	assert_eq!(cached.value().expose(), "abc.def.ghi");
	assert!(cached.expires_at() >= before + Duration::seconds(1200));
	assert!(cached.expires_at() <= OffsetDateTime::now_utc() + Duration::seconds(1200));
}

#[tokio::test]
async fn expired_token_is_replaced_before_sending() {
	let h = harness(seeded("stale-token", OffsetDateTime::now_utc() - Duration::seconds(1)), None);
	let sent = Arc::new(Mutex::new(Vec::new()));
	let log = sent.clone();
	let response = h
		.mediator
		.intercept(ApiRequest::default(), move |req: ApiRequest| {
			log.lock().push(req.bearer.clone());

			async move { Ok(ApiResponse { status: 200, bearer: req.bearer }) }
		})
		.await
		.expect("Refreshed token should be attached.");

	assert_eq!(response.bearer.as_deref(), Some("Bearer login-token-1"));
	assert_eq!(*sent.lock(), [Some("Bearer login-token-1".to_owned())]);
	assert_eq!(h.logins.load(Ordering::SeqCst), 1);
	assert_eq!(cached_value(&h.store).as_deref(), Some("login-token-1"));
}

#[tokio::test]
async fn unauthorized_response_triggers_exactly_one_refresh_and_retry() {
	let h = harness(seeded("revoked-token", OffsetDateTime::now_utc() + Duration::minutes(10)), None);
	let sent = Arc::new(Mutex::new(Vec::new()));
	let log = sent.clone();
	let response = h
		.mediator
		.intercept(ApiRequest::default(), move |req: ApiRequest| {
			log.lock().push(req.bearer.clone());

			let status = if req.bearer.as_deref() == Some("Bearer revoked-token") { 401 } else { 200 };

			async move { Ok(ApiResponse { status, bearer: req.bearer }) }
		})
		.await
		.expect("Retry should succeed.");

	assert_eq!(response.status, 200);
	assert_eq!(
		*sent.lock(),
		[Some("Bearer revoked-token".to_owned()), Some("Bearer login-token-1".to_owned())]
	);
	assert_eq!(h.logins.load(Ordering::SeqCst), 1);
	assert_eq!(h.mediator.metrics().retries(), 1);
	assert_eq!(cached_value(&h.store).as_deref(), Some("login-token-1"));
}

#[tokio::test]
async fn second_unauthorized_response_is_returned_without_another_retry() {
	let h = harness(seeded("cached-token", OffsetDateTime::now_utc() + Duration::minutes(10)), None);
	let sends = Arc::new(AtomicUsize::new(0));
	let counter = sends.clone();
	let response = h
		.mediator
		.intercept(ApiRequest::default(), move |req: ApiRequest| {
			counter.fetch_add(1, Ordering::SeqCst);

			async move { Ok(ApiResponse { status: 401, bearer: req.bearer }) }
		})
		.await
		.expect("The second 401 is returned as a response.");

	assert_eq!(response.status, 401);
	assert_eq!(response.bearer.as_deref(), Some("Bearer login-token-1"));
	assert_eq!(sends.load(Ordering::SeqCst), 2);
	assert_eq!(h.logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn forbidden_response_never_refreshes() {
	let h = harness(seeded("cached-token", OffsetDateTime::now_utc() + Duration::minutes(10)), None);
	let sends = Arc::new(AtomicUsize::new(0));
	let counter = sends.clone();
	let response = h
		.mediator
		.intercept(ApiRequest::default(), move |req: ApiRequest| {
			counter.fetch_add(1, Ordering::SeqCst);

			async move { Ok(ApiResponse { status: 403, bearer: req.bearer }) }
		})
		.await
		.expect("Forbidden responses pass through.");

	assert_eq!(response.status, 403);
	assert_eq!(sends.load(Ordering::SeqCst), 1);
	assert_eq!(h.logins.load(Ordering::SeqCst), 0);
	assert_eq!(cached_value(&h.store).as_deref(), Some("cached-token"));
}

#[tokio::test]
async fn login_failure_is_reported_and_nothing_is_sent() {
	let login = LoginFn::new(|_credentials: Credentials| async {
		Err::<Token, _>(LoginError::Rejected { status: 401, body_preview: Some("bad secret".into()) })
	});
	let store = Arc::new(MemoryTokenStore::default());
	let mediator = AuthenticatingMediator::new(credentials(), store.clone(), Arc::new(login));
	let sends = Arc::new(AtomicUsize::new(0));
	let counter = sends.clone();
	let err = mediator
		.intercept(ApiRequest::default(), move |req: ApiRequest| {
			counter.fetch_add(1, Ordering::SeqCst);

			async move { Ok(ApiResponse { status: 200, bearer: req.bearer }) }
		})
		.await
		.expect_err("Login failure must surface.");

	assert!(matches!(
		err,
		Error::AuthenticationUnavailable(LoginError::Rejected { status: 401, .. })
	));
	assert_eq!(sends.load(Ordering::SeqCst), 0);
	assert!(store.get().is_none());
	assert_eq!(mediator.metrics().login_failures(), 1);
}

#[tokio::test]
async fn transport_failures_pass_through_without_retry() {
	let h = harness(seeded("cached-token", OffsetDateTime::now_utc() + Duration::minutes(10)), None);
	let sends = Arc::new(AtomicUsize::new(0));
	let counter = sends.clone();
	let err = h
		.mediator
		.intercept(ApiRequest::default(), move |_req: ApiRequest| {
			counter.fetch_add(1, Ordering::SeqCst);

			async {
				Err::<ApiResponse, _>(Error::from(TransportError::network(std::io::Error::new(
					std::io::ErrorKind::ConnectionRefused,
					"connection refused",
				))))
			}
		})
		.await
		.expect_err("Transport failures must surface.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert_eq!(sends.load(Ordering::SeqCst), 1);
	assert_eq!(h.logins.load(Ordering::SeqCst), 0);
	assert_eq!(cached_value(&h.store).as_deref(), Some("cached-token"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_on_an_empty_store_share_one_login() {
	let h = harness(Arc::new(MemoryTokenStore::default()), Some(StdDuration::from_millis(50)));
	let mut handles = Vec::new();

	for _ in 0..16 {
		let mediator = h.mediator.clone();

		handles.push(tokio::spawn(async move {
			mediator
				.intercept(ApiRequest::default(), |req: ApiRequest| async move {
					Ok(ApiResponse { status: 200, bearer: req.bearer })
				})
				.await
		}));
	}

	for handle in handles {
		let response = handle
			.await
			.expect("Task should not panic.")
			.expect("Every concurrent request should succeed.");

		assert_eq!(response.bearer.as_deref(), Some("Bearer login-token-1"));
	}

	assert_eq!(h.logins.load(Ordering::SeqCst), 1);
	assert_eq!(cached_value(&h.store).as_deref(), Some("login-token-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rejections_coalesce_into_one_login() {
	let h = harness(
		seeded("revoked-token", OffsetDateTime::now_utc() + Duration::minutes(10)),
		Some(StdDuration::from_millis(50)),
	);
	let mut handles = Vec::new();

	for _ in 0..8 {
		let mediator = h.mediator.clone();

		handles.push(tokio::spawn(async move {
			mediator
				.intercept(ApiRequest::default(), |req: ApiRequest| async move {
					let status =
						if req.bearer.as_deref() == Some("Bearer revoked-token") { 401 } else { 200 };

					Ok(ApiResponse { status, bearer: req.bearer })
				})
				.await
		}));
	}

	for handle in handles {
		let response = handle
			.await
			.expect("Task should not panic.")
			.expect("Every retried request should succeed.");

		assert_eq!(response.status, 200);
	}

	assert_eq!(h.logins.load(Ordering::SeqCst), 1);
	assert!(h.mediator.metrics().retries() >= 1);
}

#[tokio::test]
async fn slow_login_times_out_without_sending() {
	let h = harness(Arc::new(MemoryTokenStore::default()), Some(StdDuration::from_millis(500)));
	let mediator = h
		.mediator
		.clone()
		.with_config(MediatorConfig::default().with_login_timeout(StdDuration::from_millis(20)));
	let sends = Arc::new(AtomicUsize::new(0));
	let counter = sends.clone();
	let err = mediator
		.intercept(ApiRequest::default(), move |req: ApiRequest| {
			counter.fetch_add(1, Ordering::SeqCst);

			async move { Ok(ApiResponse { status: 200, bearer: req.bearer }) }
		})
		.await
		.expect_err("The login should time out.");

	assert!(matches!(err, Error::TimedOut { operation: "login" }));
	assert_eq!(sends.load(Ordering::SeqCst), 0);
	assert!(h.store.get().is_none());
	assert_eq!(mediator.metrics().login_failures(), 1);
}

#[tokio::test]
async fn cancellation_abandons_the_request() {
	let h = harness(seeded("cached-token", OffsetDateTime::now_utc() + Duration::minutes(10)), None);
	let err = h
		.mediator
		.intercept_until(
			ApiRequest::default(),
			|req: ApiRequest| async move {
				tokio::time::sleep(StdDuration::from_secs(5)).await;

				Ok(ApiResponse { status: 200, bearer: req.bearer })
			},
			tokio::time::sleep(StdDuration::from_millis(20)),
		)
		.await
		.expect_err("The request should be cancelled.");

	assert!(matches!(err, Error::Cancelled));
	assert_eq!(h.logins.load(Ordering::SeqCst), 0);
	assert_eq!(cached_value(&h.store).as_deref(), Some("cached-token"));
}

#[tokio::test]
async fn sessions_never_share_tokens() {
	let h = harness(Arc::new(MemoryTokenStore::default()), None);
	let sessions = SessionStores::new(Duration::minutes(30));
	let alice = SessionId::new("alice").expect("Session fixture should be valid.");
	let bob = SessionId::new("bob").expect("Session fixture should be valid.");
	let send =
		|req: ApiRequest| async move { Ok::<_, Error>(ApiResponse { status: 200, bearer: req.bearer }) };
	let first = h
		.mediator
		.for_session(&sessions, &alice)
		.intercept(ApiRequest::default(), send)
		.await
		.expect("Alice's request should succeed.");
	let second = h
		.mediator
		.for_session(&sessions, &bob)
		.intercept(ApiRequest::default(), send)
		.await
		.expect("Bob's request should succeed.");

	assert_ne!(first.bearer, second.bearer);
	assert_eq!(h.logins.load(Ordering::SeqCst), 2);
	assert!(h.store.get().is_none(), "Session-bound mediators leave the shared store alone.");
	assert_eq!(
		sessions.store_for(&alice).get().map(|t| t.value().expose().to_owned()).as_deref(),
		Some("login-token-1")
	);
}
