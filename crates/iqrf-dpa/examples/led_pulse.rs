//! Pulses the coordinator LED against a loopback channel.
//!
//! The loopback stands in for a real CDC or SPI transport: it answers every
//! request with a success response, which is enough to watch the transaction
//! engine run. Swap it for a real `DpaChannel` implementation to talk to
//! hardware.

use iqrf_dpa::peripheral::{DpaTask, Led, LedColour};
use iqrf_dpa::types::COORDINATOR_ADDRESS;
use iqrf_dpa::{
    ChannelState, DpaChannel, DpaError, DpaFrame, DpaHandler, ErrorCode, ReceiveHandler,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Answers every request with an empty success response.
struct LoopbackChannel {
    receiver: Mutex<Option<Arc<dyn Fn(&[u8]) + Send + Sync>>>,
}

impl LoopbackChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            receiver: Mutex::new(None),
        })
    }
}

impl DpaChannel for LoopbackChannel {
    fn send(&self, data: &[u8]) -> Result<(), DpaError> {
        let request = DpaFrame::from_bytes(data)?;
        let mut response = data[..6].to_vec();
        response[3] = request.pcmd() | 0x80;
        response.extend_from_slice(&[0x00, 0x00]);

        let receiver = self.receiver.lock().unwrap().clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            if let Some(receiver) = receiver {
                receiver(&response);
            }
        });
        Ok(())
    }

    fn register_receiver(&self, handler: ReceiveHandler) {
        *self.receiver.lock().unwrap() = Some(Arc::from(handler));
    }

    fn state(&self) -> ChannelState {
        ChannelState::ReadyComm
    }
}

fn main() {
    env_logger::init();

    let channel = LoopbackChannel::new();
    let handler = DpaHandler::new(channel);

    let task = Led::pulse(LedColour::Red, COORDINATOR_ADDRESS);
    let request = task.request().expect("LED pulse request");

    let transaction = handler
        .submit(request, -1, ErrorCode::Ok)
        .expect("submit LED pulse");
    let result = transaction.get();

    println!("LED pulse finished: {}", result.error_string());
    if let Some(response) = result.response() {
        println!("response: {:?}", response);
    }
}
