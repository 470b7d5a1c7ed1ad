// crates/iqrf-dpa/tests/simulator/mod.rs
//! In-memory channel double that plays back scripted replies.

use iqrf_dpa::{ChannelState, DpaChannel, DpaError, ReceiveHandler};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type SharedReceiver = Arc<Mutex<Option<Arc<dyn Fn(&[u8]) + Send + Sync>>>>;

/// A reply played back after a send: delay in milliseconds, then the frame.
pub type Reply = (u64, Vec<u8>);

/// Simulated serial link to a coordinator module.
///
/// Each `send` consumes one script entry and delivers its replies on a
/// separate thread, mimicking the transport reader. `inject` delivers
/// unsolicited traffic at any time.
pub struct SimulatedChannel {
    receiver: SharedReceiver,
    sent: Mutex<Vec<Vec<u8>>>,
    script: Mutex<VecDeque<Vec<Reply>>>,
    /// Milliseconds each send blocks, simulating a slow link.
    send_delay_ms: AtomicU64,
    fail_sends: AtomicBool,
}

impl SimulatedChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            receiver: Arc::new(Mutex::new(None)),
            sent: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            send_delay_ms: AtomicU64::new(0),
            fail_sends: AtomicBool::new(false),
        })
    }

    /// Queues the replies for the next unscripted send.
    pub fn enqueue_replies(&self, replies: Vec<Reply>) {
        self.script.lock().unwrap().push_back(replies);
    }

    pub fn set_send_delay(&self, delay_ms: u64) {
        self.send_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Frames the engine handed to the link so far.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivers an unsolicited frame after the given delay.
    pub fn inject(&self, delay_ms: u64, frame: Vec<u8>) {
        self.deliver(delay_ms, frame);
    }

    fn deliver(&self, delay_ms: u64, frame: Vec<u8>) {
        let receiver = Arc::clone(&self.receiver);
        thread::spawn(move || {
            if delay_ms > 0 {
                thread::sleep(Duration::from_millis(delay_ms));
            }
            let handler = receiver.lock().unwrap().clone();
            if let Some(handler) = handler {
                handler(&frame);
            }
        });
    }
}

impl DpaChannel for SimulatedChannel {
    fn send(&self, data: &[u8]) -> Result<(), DpaError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(DpaError::ChannelIo("simulated send failure"));
        }
        self.sent.lock().unwrap().push(data.to_vec());

        let delay_ms = self.send_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            thread::sleep(Duration::from_millis(delay_ms));
        }

        let replies = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        for (after_ms, frame) in replies {
            self.deliver(after_ms, frame);
        }
        Ok(())
    }

    fn register_receiver(&self, handler: ReceiveHandler) {
        *self.receiver.lock().unwrap() = Some(Arc::from(handler));
    }

    fn state(&self) -> ChannelState {
        ChannelState::ReadyComm
    }
}
