use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

/// Cancellation shared by every worker thread.
///
/// Nothing is ever sent on the channel: the signal fires when the
/// [`ShutdownTrigger`] is fired or dropped, which disconnects every receiver.
#[derive(Clone)]
pub struct Shutdown {
    rx: Receiver<()>,
}

pub struct ShutdownTrigger {
    tx: Option<Sender<()>>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = channel::bounded(0);
    (ShutdownTrigger { tx: Some(tx) }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn fire(&mut self) {
        if self.tx.take().is_some() {
            log::info!("shutdown requested");
        }
    }
}

impl Shutdown {
    pub fn is_requested(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}
