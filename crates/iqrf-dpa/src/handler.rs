// crates/iqrf-dpa/src/handler.rs
//! Transaction dispatcher owning one serial link.
//!
//! A single worker thread executes transactions one at a time; submissions
//! queue up behind it. The transport receive callback classifies inbound
//! frames and routes them either to the transaction in flight or to the
//! registered asynchronous message handler. The async-sink mutex and a
//! transaction mutex are never held at the same time.

use crate::channel::{DpaChannel, DpaError};
use crate::frame::{self, Direction, DpaFrame};
use crate::timing::{self, FrcResponseTime, RfMode, TimingParams, MINIMAL_TIMEOUT_MS};
use crate::transaction::{DpaTransactionHandle, ErrorCode, Transaction};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{debug, error, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};

/// Upper bound on transactions waiting behind the one in flight.
pub const TRANSACTION_QUEUE_CAPACITY: usize = 16;

/// Handler invoked for every asynchronous DPA message.
pub type AsyncMessageHandler = Box<dyn Fn(&DpaFrame) + Send>;

struct EngineConfig {
    default_timeout_ms: u32,
    rf_mode: RfMode,
    timing: TimingParams,
}

struct HandlerShared {
    config: Mutex<EngineConfig>,
    /// The transaction popped from the queue and not yet finished.
    pending: Mutex<Option<Arc<Transaction>>>,
    /// At most one asynchronous message sink, keyed by a service id.
    async_sink: Mutex<Option<(String, AsyncMessageHandler)>>,
}

impl HandlerShared {
    /// Entry point of the transport receive callback.
    fn on_receive(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let message = match DpaFrame::from_bytes(data) {
            Ok(message) => message,
            Err(err) => {
                warn!("dropping inbound buffer: {}", err);
                return;
            }
        };
        trace!("received from IQRF interface: {:?}", message);

        match message.direction() {
            // Unsolicited requests and flagged responses never touch the
            // transaction in flight.
            Direction::Request | Direction::AsyncNotification => {
                self.process_asynchronous_message(&message);
            }
            Direction::Confirmation | Direction::Response => {
                let pending = self.pending.lock().unwrap().clone();
                match pending {
                    Some(transaction) => {
                        if let Err(mismatch) = transaction.process_received(&message) {
                            warn!(
                                "transaction {}: dropping {:?}: {}",
                                transaction.id(),
                                message,
                                mismatch
                            );
                        }
                    }
                    None => {
                        warn!("no transaction in flight, dropping {:?}", message);
                    }
                }
            }
        }
    }

    fn process_asynchronous_message(&self, message: &DpaFrame) {
        let sink = self.async_sink.lock().unwrap();
        match sink.as_ref() {
            Some((service_id, handler)) => {
                trace!("asynchronous message for '{}': {:?}", service_id, message);
                handler(message);
            }
            None => debug!("asynchronous message dropped, no handler: {:?}", message),
        }
    }
}

/// The DPA engine: one channel, one worker, one transaction in flight.
pub struct DpaHandler {
    channel: Arc<dyn DpaChannel>,
    shared: Arc<HandlerShared>,
    queue: Option<Sender<Arc<Transaction>>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DpaHandler {
    /// Builds the engine around an injected channel and starts the worker.
    pub fn new(channel: Arc<dyn DpaChannel>) -> Self {
        let shared = Arc::new(HandlerShared {
            config: Mutex::new(EngineConfig {
                default_timeout_ms: timing::DEFAULT_TIMEOUT_MS,
                rf_mode: RfMode::Std,
                timing: TimingParams::default(),
            }),
            pending: Mutex::new(None),
            async_sink: Mutex::new(None),
        });

        // The channel outlives the handler only through this weak reference;
        // callbacks arriving after drop fall through harmlessly.
        let receiver_shared: Weak<HandlerShared> = Arc::downgrade(&shared);
        channel.register_receiver(Box::new(move |data| {
            if let Some(shared) = receiver_shared.upgrade() {
                shared.on_receive(data);
            }
        }));

        let (queue, worker_queue) = crossbeam_channel::bounded(TRANSACTION_QUEUE_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = thread::spawn({
            let channel = Arc::clone(&channel);
            let shared = Arc::clone(&shared);
            let shutdown = Arc::clone(&shutdown);
            move || Self::worker_loop(&worker_queue, &channel, &shared, &shutdown)
        });

        Self {
            channel,
            shared,
            queue: Some(queue),
            shutdown,
            worker: Some(worker),
        }
    }

    fn worker_loop(
        queue: &Receiver<Arc<Transaction>>,
        channel: &Arc<dyn DpaChannel>,
        shared: &Arc<HandlerShared>,
        shutdown: &AtomicBool,
    ) {
        while let Ok(transaction) = queue.recv() {
            if shutdown.load(Ordering::SeqCst) {
                // Drained during shutdown; finish without touching the link.
                transaction.abort();
            }
            *shared.pending.lock().unwrap() = Some(Arc::clone(&transaction));
            transaction.execute(|request| {
                trace!("sent to IQRF interface: {:?}", request);
                channel.send(request.as_bytes())
            });
            *shared.pending.lock().unwrap() = None;
        }
    }

    /// Submits a request for execution.
    ///
    /// `timeout_ms < 0` selects the engine default, `0` requests an infinite
    /// wait (granted to whitelisted coordinator commands only). A non-`Ok`
    /// `default_error` makes the transaction fail with that code without
    /// touching the channel, for upstream-enforced failures.
    ///
    /// An empty request is a caller error and is rejected up front; a full
    /// queue is reported through the returned handle (`ERROR_IFACE_QUEUE_FULL`).
    pub fn submit(
        &self,
        request: DpaFrame,
        timeout_ms: i32,
        default_error: ErrorCode,
    ) -> Result<DpaTransactionHandle, DpaError> {
        if request.len() < frame::HEADER_SIZE {
            return Err(DpaError::RequestTooShort(request.len()));
        }

        let (default_timeout_ms, rf_mode, params) = {
            let config = self.config();
            (
                config.default_timeout_ms,
                config.rf_mode,
                config.timing.clone(),
            )
        };
        let transaction = Arc::new(Transaction::new(
            request,
            rf_mode,
            params,
            default_timeout_ms,
            timeout_ms,
            default_error,
        ));

        let queue = self.queue.as_ref().ok_or(DpaError::EngineStopped)?;
        match queue.try_send(Arc::clone(&transaction)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                error!(
                    "transaction {}: queue overload ({} pending)",
                    transaction.id(),
                    TRANSACTION_QUEUE_CAPACITY
                );
                transaction.reject(ErrorCode::IfaceQueueFull);
            }
            Err(TrySendError::Disconnected(_)) => return Err(DpaError::EngineStopped),
        }
        Ok(DpaTransactionHandle::new(transaction))
    }

    /// Engine-wide default timeout in milliseconds.
    pub fn timeout(&self) -> u32 {
        self.config().default_timeout_ms
    }

    /// Sets the engine-wide default timeout, clamped to the minimum.
    pub fn set_timeout(&self, timeout_ms: u32) {
        let timeout_ms = if timeout_ms < MINIMAL_TIMEOUT_MS {
            warn!(
                "default timeout {} ms is too low, forced to {} ms",
                timeout_ms, MINIMAL_TIMEOUT_MS
            );
            MINIMAL_TIMEOUT_MS
        } else {
            timeout_ms
        };
        self.config().default_timeout_ms = timeout_ms;
    }

    pub fn rf_mode(&self) -> RfMode {
        self.config().rf_mode
    }

    pub fn set_rf_mode(&self, rf_mode: RfMode) {
        self.config().rf_mode = rf_mode;
    }

    pub fn timing_params(&self) -> TimingParams {
        self.config().timing.clone()
    }

    pub fn set_timing_params(&self, params: TimingParams) {
        self.config().timing = params;
    }

    pub fn frc_response_time(&self) -> FrcResponseTime {
        self.config().timing.frc_response_time
    }

    pub fn set_frc_response_time(&self, frc_response_time: FrcResponseTime) {
        self.config().timing.frc_response_time = frc_response_time;
    }

    /// Worst-case duration of an advanced FRC round under the current
    /// configuration. Diagnostic only; `submit` never applies it.
    pub fn frc_timeout_ms(&self) -> u32 {
        let config = self.config();
        timing::frc_timeout_ms(config.rf_mode, &config.timing)
    }

    /// State of the underlying channel.
    pub fn channel_state(&self) -> crate::channel::ChannelState {
        self.channel.state()
    }

    /// Installs the asynchronous message handler, replacing any previous one.
    pub fn register_async_handler(&self, service_id: &str, handler: AsyncMessageHandler) {
        let mut sink = self.shared.async_sink.lock().unwrap();
        if let Some((previous, _)) = sink.as_ref() {
            debug!(
                "async handler '{}' replaced by '{}'",
                previous, service_id
            );
        }
        *sink = Some((service_id.to_string(), handler));
    }

    /// Removes the asynchronous message handler registered under the id.
    pub fn unregister_async_handler(&self, service_id: &str) {
        let mut sink = self.shared.async_sink.lock().unwrap();
        match sink.as_ref() {
            Some((registered, _)) if registered == service_id => *sink = None,
            Some((registered, _)) => warn!(
                "async handler '{}' not removed, '{}' is registered",
                service_id, registered
            ),
            None => {}
        }
    }

    fn config(&self) -> std::sync::MutexGuard<'_, EngineConfig> {
        self.shared.config.lock().unwrap()
    }
}

impl Drop for DpaHandler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(transaction) = self.shared.pending.lock().unwrap().clone() {
            transaction.abort();
        }
        // Closing the queue lets the worker drain the backlog (each entry
        // finishes as aborted) and exit.
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
