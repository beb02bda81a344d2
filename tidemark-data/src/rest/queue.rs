use crate::{
    error::DataError,
    rest::{BinanceRestClient, RestRequest},
};
use futures::future::BoxFuture;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::{mpsc, mpsc::error::TrySendError, oneshot};
use tracing::debug;

/// Default number of queued requests held before submissions are rejected.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

type Job = Box<dyn FnOnce(BinanceRestClient) -> BoxFuture<'static, ()> + Send>;

/// Bounded FIFO queue executing REST requests on a single background worker.
///
/// [`submit`](Self::submit) returns a [`PendingResponse`] handle immediately;
/// the request runs later, in submission order, and its outcome travels
/// through the handle as a first-class `Result`. Dropping the handle turns
/// the call into fire-and-forget without cancelling it.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    work_tx: mpsc::Sender<Job>,
}

impl RequestQueue {
    /// Spawn a queue whose worker drains requests against `client`.
    pub fn new(client: BinanceRestClient) -> Self {
        Self::with_capacity(client, DEFAULT_QUEUE_CAPACITY)
    }

    /// Spawn a queue holding at most `capacity` undrained requests.
    pub fn with_capacity(client: BinanceRestClient, capacity: usize) -> Self {
        let (work_tx, work_rx) = mpsc::channel(capacity);
        tokio::spawn(worker_task(client, work_rx));
        Self { work_tx }
    }

    /// Queue a typed request for execution.
    ///
    /// Fails with [`DataError::QueueFull`] when the queue is at capacity and
    /// [`DataError::QueueClosed`] when the worker has shut down.
    pub fn submit<Request>(
        &self,
        request: Request,
    ) -> Result<PendingResponse<Request::Response>, DataError>
    where
        Request: RestRequest + Send + Sync + 'static,
        Request::Response: Send + 'static,
    {
        self.submit_map(request, |response| response)
    }

    /// Queue a typed request and apply `transform` to its successful response
    /// on the worker, before the result is forwarded through the handle.
    ///
    /// Because `transform` runs as part of the queued job, anything it records
    /// lands even when the handle is dropped. Errors bypass it. Fails like
    /// [`submit`](Self::submit) when the queue is full or closed.
    pub fn submit_map<Request, Mapped>(
        &self,
        request: Request,
        transform: impl FnOnce(Request::Response) -> Mapped + Send + 'static,
    ) -> Result<PendingResponse<Mapped>, DataError>
    where
        Request: RestRequest + Send + Sync + 'static,
        Request::Response: Send + 'static,
        Mapped: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();

        let job: Job = Box::new(move |client| {
            Box::pin(async move {
                let result = client.execute_with_retry(&request).await.map(transform);
                // A dropped receiver means the caller chose fire-and-forget.
                let _ = result_tx.send(result);
            })
        });

        self.work_tx.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => DataError::QueueFull,
            TrySendError::Closed(_) => DataError::QueueClosed,
        })?;

        Ok(PendingResponse { result_rx })
    }
}

async fn worker_task(client: BinanceRestClient, mut work_rx: mpsc::Receiver<Job>) {
    while let Some(job) = work_rx.recv().await {
        job(client.clone()).await;
    }
    debug!("request queue worker stopped");
}

/// Handle to a queued request's eventual result.
pub struct PendingResponse<T> {
    result_rx: oneshot::Receiver<Result<T, DataError>>,
}

impl<T> Future for PendingResponse<T> {
    type Output = Result<T, DataError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.result_rx)
            .poll(cx)
            .map(|received| match received {
                Ok(result) => result,
                Err(_) => Err(DataError::QueueClosed),
            })
    }
}
