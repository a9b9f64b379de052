use std::{io, sync::Arc, thread};

use crate::{
    capture::{ArpFrame, Capture, CaptureHandle},
    error::Error,
    metrics::Metrics,
    shutdown::Shutdown,
    sink::{Discovery, Publisher},
    store::Store,
};

/// Why a worker stopped running.
#[derive(Debug)]
pub enum WorkerExit {
    Cancelled,
    SinkClosed,
    CaptureFailed(Error),
}

/// Reads ARP frames from one interface and reports senders the store has never seen.
pub struct DiscoveryWorker {
    interface: String,
    capture: Box<dyn Capture>,
    store: Arc<Store>,
    publisher: Publisher,
    metrics: Metrics,
    shutdown: Shutdown,
}

impl DiscoveryWorker {
    pub fn new(handle: CaptureHandle, store: Arc<Store>, publisher: Publisher, metrics: Metrics, shutdown: Shutdown) -> Self {
        Self { interface: handle.interface, capture: handle.capture, store, publisher, metrics, shutdown }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn spawn(self) -> io::Result<thread::JoinHandle<WorkerExit>> {
        thread::Builder::new().name(format!("arp-{}", self.interface)).spawn(move || self.run())
    }

    /// Runs until the capture fails, the sink goes away, or shutdown is requested.
    /// The capture handle is closed on return.
    pub fn run(mut self) -> WorkerExit {
        log::info!("starting reader thread for {}", self.interface);
        self.metrics.worker_started();

        let exit = loop {
            if self.shutdown.is_requested() {
                break WorkerExit::Cancelled;
            }
            match self.capture.receive() {
                Ok(Some(frame)) => {
                    self.metrics.frame(&self.interface);
                    if !self.process(frame) {
                        break WorkerExit::SinkClosed;
                    }
                }
                Ok(None) => {}
                Err(e) => break WorkerExit::CaptureFailed(e),
            }
        };

        match &exit {
            WorkerExit::Cancelled => log::info!("reader thread for {} stopped", self.interface),
            WorkerExit::SinkClosed => log::warn!("reader thread for {} stopped: notification sink closed", self.interface),
            WorkerExit::CaptureFailed(e) => log::error!("reader thread for {} terminated: {}", self.interface, e),
        }
        self.metrics.worker_terminated(&self.interface);
        exit
    }

    // Returns false only when the sink is gone.
    fn process(&self, frame: ArpFrame) -> bool {
        let hw_addr = frame.sender_hw_addr.to_string();
        let proto_addr = frame.sender_proto_addr.to_string();

        match self.store.exists(&hw_addr) {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) if e.is_validation() => {
                self.reject(&e);
                return true;
            }
            // an unreadable store must not hide new hosts: report as unknown
            Err(e) => self.reject(&e),
        }

        // Published before it is persisted: a crash in between logs the host
        // again after restart instead of never logging it.
        let discovery = Discovery { interface: self.interface.clone(), hw_addr: hw_addr.clone(), proto_addr: proto_addr.clone() };
        if !self.publisher.publish(discovery) {
            return false;
        }
        self.metrics.discovery(&self.interface);

        if let Err(e) = self.store.add(&hw_addr, &proto_addr) {
            self.reject(&e);
        }
        true
    }

    fn reject(&self, e: &Error) {
        if e.is_validation() {
            log::debug!("{}: dropping ARP event: {}", self.interface, e);
            self.metrics.dropped(&self.interface, "invalid_address");
        } else {
            log::error!("{}: {}", self.interface, e);
            self.metrics.store_error(&self.interface);
        }
    }
}
