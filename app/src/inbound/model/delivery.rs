use internal::domain::message::IncomingMessage;
use rumqttc::{Publish, QoS};

/// A publish as it came off the wire, before it is handed to the dispatcher.
#[derive(Debug, PartialEq)]
pub struct Delivery {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl From<Publish> for Delivery {
    fn from(publish: Publish) -> Self {
        Delivery {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
            qos: publish.qos,
            retain: publish.retain,
        }
    }
}

impl Delivery {
    pub fn to_domain(self) -> IncomingMessage {
        IncomingMessage::new(self.topic, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_publish_to_domain_message() {
        let mut publish = Publish::new("test/topic", QoS::AtMostOnce, r#"{"int_msg":42}"#);
        publish.retain = true;
        let delivery = Delivery::from(publish);
        assert!(delivery.retain);
        assert_eq!(delivery.qos, QoS::AtMostOnce);
        assert_eq!(
            delivery.to_domain(),
            IncomingMessage::new("test/topic", r#"{"int_msg":42}"#)
        );
    }

    #[test]
    fn should_keep_empty_payload_empty() {
        let delivery = Delivery::from(Publish::new("test/topic", QoS::AtMostOnce, Vec::new()));
        assert!(delivery.to_domain().is_empty());
    }
}
