//! Rate-limited dispatcher
//!
//! One task owns the [`RateBudget`], the queue of deferred sends and the two
//! timers. HTTP requests run on their own tasks and report back through a
//! completion channel, so the budget is only ever touched by the owner.

use crate::budget::RateBudget;
use crate::error::DispatchError;
use crate::transport::{OutboundMessage, RestResponse, RestTransport, TransportError};
use herald_common::Timer;
use herald_core::ChannelId;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

const REQUEST_BUFFER_SIZE: usize = 64;

/// A delivered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
}

/// Budget as the dispatcher currently sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSnapshot {
    pub budget: RateBudget,
    /// Sends waiting for the window to reset
    pub deferred: usize,
}

type Reply = oneshot::Sender<Result<Delivery, DispatchError>>;

enum Request {
    Send {
        target: Option<ChannelId>,
        content: String,
        reply: Reply,
    },
    Budget(oneshot::Sender<BudgetSnapshot>),
}

struct PendingSend {
    message: OutboundMessage,
    reply: Reply,
    due: Instant,
}

struct Completion {
    channel_id: ChannelId,
    result: Result<RestResponse, TransportError>,
    reply: Reply,
}

/// Builder for the dispatcher task
pub struct Dispatcher<T> {
    transport: Arc<T>,
    budget: RateBudget,
}

impl<T: RestTransport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            budget: RateBudget::default(),
        }
    }

    /// Start from this budget instead of the defaults
    #[must_use]
    pub fn with_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Spawn the dispatcher task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> DispatcherHandle {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER_SIZE);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            transport: self.transport,
            budget: self.budget,
            queue: VecDeque::new(),
            reset: Timer::new(),
            retry: Timer::new(),
            requests: request_rx,
            completion_tx,
            completions: completion_rx,
        };
        tokio::spawn(worker.run());

        DispatcherHandle {
            requests: request_tx,
        }
    }
}

/// Handle to a running dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    requests: mpsc::Sender<Request>,
}

impl DispatcherHandle {
    /// Deliver `content` to `target`
    ///
    /// Resolves once the message was delivered or definitely failed; a send
    /// deferred by the budget resolves after its eventual attempt.
    pub async fn send(
        &self,
        target: Option<ChannelId>,
        content: impl Into<String>,
    ) -> Result<Delivery, DispatchError> {
        self.enqueue(target, content).await?.await
    }

    /// Queue `content` for `target` without waiting for the outcome
    ///
    /// Messages enqueued one after another keep that order. The returned
    /// future resolves to the same outcome [`send`](Self::send) would.
    pub async fn enqueue(
        &self,
        target: Option<ChannelId>,
        content: impl Into<String>,
    ) -> Result<impl Future<Output = Result<Delivery, DispatchError>> + Send + 'static, DispatchError>
    {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Send {
                target,
                content: content.into(),
                reply,
            })
            .await
            .map_err(|_| DispatchError::DispatcherStopped)?;

        Ok(async move { response.await.map_err(|_| DispatchError::DispatcherStopped)? })
    }

    /// Current budget and queue length
    pub async fn budget(&self) -> Result<BudgetSnapshot, DispatchError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Budget(reply))
            .await
            .map_err(|_| DispatchError::DispatcherStopped)?;

        response.await.map_err(|_| DispatchError::DispatcherStopped)
    }
}

struct Worker<T> {
    transport: Arc<T>,
    budget: RateBudget,
    queue: VecDeque<PendingSend>,
    /// Opens a new window
    reset: Timer<()>,
    /// Re-enters the send path for the head of the queue
    retry: Timer<()>,
    requests: mpsc::Receiver<Request>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
}

impl<T: RestTransport> Worker<T> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                // A reset due at the same instant as a retry resets first
                () = self.reset.fired() => {
                    tracing::trace!(consumed = self.budget.consumed(), "Rate window reset");
                    self.budget.reset();
                }

                Some(completion) = self.completions.recv() => self.handle_completion(completion),

                () = self.retry.fired() => self.retry_deferred(),

                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
            }
        }

        tracing::debug!(deferred = self.queue.len(), "Dispatcher stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Send {
                target,
                content,
                reply,
            } => {
                let Some(channel_id) = target else {
                    tracing::warn!("Dropping message without a target channel");
                    let _ = reply.send(Err(DispatchError::MissingTarget));
                    return;
                };
                let pending = PendingSend {
                    message: OutboundMessage {
                        channel_id,
                        content,
                    },
                    reply,
                    due: Instant::now(),
                };

                // Anything already waiting goes first
                if self.queue.is_empty() && self.budget.has_capacity() {
                    self.dispatch(pending);
                } else {
                    self.defer(pending);
                }
            }
            Request::Budget(reply) => {
                let _ = reply.send(BudgetSnapshot {
                    budget: self.budget,
                    deferred: self.queue.len(),
                });
            }
        }
    }

    fn dispatch(&mut self, pending: PendingSend) {
        if !self.budget.try_consume() {
            self.defer(pending);
            return;
        }
        self.reset.schedule(self.budget.reset_delay(), ());

        let PendingSend { message, reply, .. } = pending;
        tracing::debug!(
            channel_id = %message.channel_id,
            consumed = self.budget.consumed(),
            capacity = self.budget.capacity(),
            "Sending message"
        );

        let transport = Arc::clone(&self.transport);
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = transport.post_message(&message).await;
            let _ = completions.send(Completion {
                channel_id: message.channel_id,
                result,
                reply,
            });
        });
    }

    fn defer(&mut self, mut pending: PendingSend) {
        let delay = self.budget.reset_delay();
        pending.due = Instant::now() + delay;
        tracing::debug!(
            channel_id = %pending.message.channel_id,
            delay_ms = delay.as_millis() as u64,
            queued = self.queue.len() + 1,
            "Rate budget exhausted, deferring message"
        );
        self.queue.push_back(pending);
        self.arm_retry();
    }

    /// Send every due message the budget allows, oldest first
    fn retry_deferred(&mut self) {
        let now = Instant::now();
        while let Some(head) = self.queue.front_mut() {
            if head.due > now {
                break;
            }
            if !self.budget.has_capacity() {
                // Still exhausted: wait another window without losing its place
                head.due = now + self.budget.reset_delay();
                break;
            }
            if let Some(pending) = self.queue.pop_front() {
                self.dispatch(pending);
            }
        }
        self.arm_retry();
    }

    fn arm_retry(&mut self) {
        match self.queue.front() {
            Some(head) => self.retry.schedule_at(head.due, ()),
            None => {
                self.retry.cancel();
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion {
            channel_id,
            result,
            reply,
        } = completion;

        let outcome = match result {
            Ok(response) => self.apply_response(channel_id, response),
            Err(e) => {
                // The request never reached the server, so give the slot back
                self.budget.release();
                tracing::warn!(channel_id = %channel_id, error = %e, "Message send failed");
                Err(DispatchError::Transport(e))
            }
        };

        if reply.send(outcome).is_err() {
            tracing::trace!(channel_id = %channel_id, "Sender is no longer waiting");
        }
    }

    fn apply_response(
        &mut self,
        channel_id: ChannelId,
        response: RestResponse,
    ) -> Result<Delivery, DispatchError> {
        if let Some(limit) = response.rate_limit.limit {
            self.budget.set_capacity(limit);
        }
        if let Some(reset_after) = response.rate_limit.reset_after {
            self.budget.set_reset_delay(reset_after);
            self.reset.schedule(reset_after, ());
        }

        match response.status {
            status if response.is_success() => {
                tracing::trace!(channel_id = %channel_id, status, "Message delivered");
                Ok(Delivery { status })
            }
            429 => {
                let reset_after = self.budget.reset_delay();
                tracing::warn!(
                    channel_id = %channel_id,
                    reset_after_ms = reset_after.as_millis() as u64,
                    "Rate limited by server"
                );
                Err(DispatchError::RateLimited { reset_after })
            }
            status => {
                tracing::warn!(channel_id = %channel_id, status, body = %response.body, "Message rejected");
                Err(DispatchError::Rejected {
                    status,
                    body: response.body,
                })
            }
        }
    }
}
