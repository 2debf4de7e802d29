use crate::domain::{error::DispatchError, message::IncomingMessage, render::Outcome};

pub trait MessageDriverPort {
    fn handle(&self, message: IncomingMessage) -> impl Future<Output = Result<Outcome, DispatchError>>;
}
