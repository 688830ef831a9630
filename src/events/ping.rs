use crate::events::EventResult;
use crate::models::frames::OutboundFrame;

pub fn handle() -> EventResult {
    Ok(Some(OutboundFrame::pong()))
}
