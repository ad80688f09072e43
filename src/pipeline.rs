//! Explicit request pipeline: an ordered list of stages in front of a terminal endpoint.
//!
//! Each [`Stage`] receives the request together with a [`Next`] handle and decides whether, how
//! often, and with which request to call further down the chain. The mediator is one such stage;
//! it calls `next` a second time after a rejected token.

// self
use crate::_prelude::*;

/// Boxed future returned by stages and endpoints.
pub type StageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Terminal element of a [`Pipeline`] that actually sends the request.
pub trait Endpoint<Req, Resp>
where
	Self: Send + Sync,
{
	/// Sends `request` and resolves to the response.
	fn call(&self, request: Req) -> StageFuture<'_, Resp>;
}

/// Intermediate element of a [`Pipeline`].
pub trait Stage<Req, Resp>
where
	Self: Send + Sync,
{
	/// Handles `request`, delegating to `next` zero or more times.
	fn handle<'a>(&'a self, request: Req, next: Next<'a, Req, Resp>) -> StageFuture<'a, Resp>;
}

/// Handle to the remainder of the pipeline after the current stage.
pub struct Next<'a, Req, Resp> {
	stages: &'a [Arc<dyn Stage<Req, Resp>>],
	endpoint: &'a dyn Endpoint<Req, Resp>,
}
impl<'a, Req, Resp> Next<'a, Req, Resp> {
	/// Runs the remaining stages and the endpoint.
	pub fn run(self, request: Req) -> StageFuture<'a, Resp> {
		match self.stages.split_first() {
			Some((stage, rest)) =>
				stage.handle(request, Next { stages: rest, endpoint: self.endpoint }),
			None => self.endpoint.call(request),
		}
	}
}
impl<Req, Resp> Clone for Next<'_, Req, Resp> {
	fn clone(&self) -> Self {
		*self
	}
}
impl<Req, Resp> Copy for Next<'_, Req, Resp> {}
impl<Req, Resp> Debug for Next<'_, Req, Resp> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Next").field("remaining_stages", &self.stages.len()).finish()
	}
}

/// Ordered stages in front of an endpoint.
///
/// Stages run in insertion order: the first stage added sees the request first and the response
/// last.
pub struct Pipeline<Req, Resp> {
	stages: Vec<Arc<dyn Stage<Req, Resp>>>,
	endpoint: Arc<dyn Endpoint<Req, Resp>>,
}
impl<Req, Resp> Pipeline<Req, Resp>
where
	Req: 'static,
	Resp: 'static,
{
	/// Creates a pipeline with no stages.
	pub fn new<E>(endpoint: E) -> Self
	where
		E: 'static + Endpoint<Req, Resp>,
	{
		Self { stages: Vec::new(), endpoint: Arc::new(endpoint) }
	}

	/// Appends a stage after the existing ones.
	pub fn with<S>(mut self, stage: S) -> Self
	where
		S: 'static + Stage<Req, Resp>,
	{
		self.stages.push(Arc::new(stage));

		self
	}

	/// Appends an already shared stage.
	pub fn with_shared(mut self, stage: Arc<dyn Stage<Req, Resp>>) -> Self {
		self.stages.push(stage);

		self
	}

	/// Number of stages in front of the endpoint.
	pub fn len(&self) -> usize {
		self.stages.len()
	}

	/// Returns `true` when requests go straight to the endpoint.
	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	/// Sends `request` through every stage and the endpoint.
	pub async fn send(&self, request: Req) -> Result<Resp> {
		Next { stages: &self.stages, endpoint: self.endpoint.as_ref() }.run(request).await
	}
}
impl<Req, Resp> Clone for Pipeline<Req, Resp> {
	fn clone(&self) -> Self {
		Self { stages: self.stages.clone(), endpoint: self.endpoint.clone() }
	}
}
impl<Req, Resp> Debug for Pipeline<Req, Resp> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline").field("stages", &self.stages.len()).finish()
	}
}

/// Adapter turning an async closure into an [`Endpoint`].
pub struct FnEndpoint<F>(F);
impl<F> FnEndpoint<F> {
	/// Wraps `f`.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}
impl<F, Fut, Req, Resp> Endpoint<Req, Resp> for FnEndpoint<F>
where
	F: Send + Sync + Fn(Req) -> Fut,
	Fut: 'static + Send + Future<Output = Result<Resp>>,
{
	fn call(&self, request: Req) -> StageFuture<'_, Resp> {
		Box::pin((self.0)(request))
	}
}
impl<F> Debug for FnEndpoint<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnEndpoint(..)")
	}
}
