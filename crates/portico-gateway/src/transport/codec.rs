//! Frame classification for the session loop.
//!
//! - Text and binary frames carry envelopes and go to the endpoint decoder
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;

#[derive(Debug, PartialEq, Eq)]
pub enum Inbound<'a> {
    Frame(&'a [u8]),
    Ping,
    Pong,
    Close,
}

pub fn classify(msg: &Message) -> Inbound<'_> {
    match msg {
        Message::Text(s) => Inbound::Frame(s.as_bytes()),
        Message::Binary(b) => Inbound::Frame(b),
        Message::Ping(_) => Inbound::Ping,
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_binary_are_envelope_frames() {
        let text = Message::Text("{\"OpCode\":1}".into());
        assert_eq!(classify(&text), Inbound::Frame(b"{\"OpCode\":1}"));
        let bin = Message::Binary(vec![1, 2]);
        assert_eq!(classify(&bin), Inbound::Frame(&[1, 2]));
        assert_eq!(classify(&Message::Close(None)), Inbound::Close);
    }
}
