use std::borrow::Cow;

/// A single delivery from the broker, handled once and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl IncomingMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        IncomingMessage {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_detect_empty_payload() {
        assert!(IncomingMessage::new("test/topic", Vec::new()).is_empty());
        assert!(!IncomingMessage::new("test/topic", "{}").is_empty());
    }

    #[test]
    fn should_render_invalid_utf8_lossily() {
        let message = IncomingMessage::new("test/topic", vec![b'o', b'k', 0xFF]);
        assert_eq!(message.payload_lossy(), "ok\u{FFFD}");
    }
}
