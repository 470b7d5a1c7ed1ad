// crates/iqrf-dpa/src/peripheral/raw.rs

use super::DpaTask;
use crate::channel::DpaError;
use crate::frame::DpaFrame;

/// Pass-through task wrapping an arbitrary prepared frame.
///
/// Useful for commands no typed task covers yet, or for replaying captured
/// traffic.
#[derive(Debug, Clone)]
pub struct Raw {
    request: DpaFrame,
    response: Option<DpaFrame>,
}

impl Raw {
    pub fn new(request: DpaFrame) -> Self {
        Self {
            request,
            response: None,
        }
    }

    /// The response captured by the last `parse_response`.
    pub fn response(&self) -> Option<&DpaFrame> {
        self.response.as_ref()
    }
}

impl DpaTask for Raw {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        Ok(self.request.clone())
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        self.response = Some(response.clone());
        Ok(())
    }
}
