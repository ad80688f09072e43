//! Bearer-token relay for outbound HTTP pipelines.
//!
//! Requests pass through an [`AuthenticatingMediator`](mediator::AuthenticatingMediator) that
//! logs in on a cache miss, coalesces concurrent refreshes into one login, and replays a request
//! once after `401 Unauthorized`. The transport stays pluggable through the [`http`] traits.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod login;
pub mod mediator;
pub mod obs;
pub mod pipeline;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Credentials,
		config::LoginEndpoint,
		login::HttpLogin,
		mediator::AuthenticatingMediator,
		store::{MemoryTokenStore, TokenStore},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds a login endpoint that tolerates the plain-HTTP URLs handed out by `httpmock`.
	pub fn test_login_endpoint(url: &str) -> LoginEndpoint {
		LoginEndpoint::builder(Url::parse(url).expect("Mock login URL should parse successfully."))
			.allow_insecure(true)
			.build()
			.expect("Mock login endpoint should pass validation.")
	}

	/// Constructs an [`AuthenticatingMediator`] backed by an in-memory store and the reqwest
	/// login function used across integration tests.
	pub fn build_reqwest_test_mediator(
		login_url: &str,
		client_id: &str,
		client_secret: &str,
	) -> (AuthenticatingMediator, Arc<MemoryTokenStore>) {
		let store_backend = Arc::new(MemoryTokenStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let credentials = Credentials::new(client_id, client_secret)
			.expect("Test credentials should pass validation.");
		let login =
			HttpLogin::with_client(test_reqwest_client(), test_login_endpoint(login_url));
		let mediator = AuthenticatingMediator::new(credentials, store, Arc::new(login));

		(mediator, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
