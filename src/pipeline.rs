use std::{io, sync::Arc, thread};

use crate::{
    capture::CaptureHandle,
    metrics::Metrics,
    shutdown::{self, ShutdownTrigger},
    sink::{self, Notifier, QueueBound},
    store::Store,
    worker::{DiscoveryWorker, WorkerExit},
};

/// One reader thread per capture plus the notification thread.
pub struct Pipeline {
    workers: Vec<(String, thread::JoinHandle<WorkerExit>)>,
    sink: thread::JoinHandle<()>,
    trigger: ShutdownTrigger,
}

impl Pipeline {
    pub fn start<N>(handles: Vec<CaptureHandle>, store: Arc<Store>, bound: QueueBound, metrics: Metrics, notifier: N) -> io::Result<Self>
    where
        N: Notifier + 'static,
    {
        let (mut trigger, shutdown) = shutdown::channel();
        let (publisher, notification_sink) = sink::queue(bound, metrics.clone());

        let sink = thread::Builder::new().name("notifications".to_string()).spawn(move || notification_sink.run(notifier))?;

        let mut workers = Vec::with_capacity(handles.len());
        for handle in handles {
            let worker = DiscoveryWorker::new(handle, store.clone(), publisher.clone(), metrics.clone(), shutdown.clone());
            let interface = worker.interface().to_string();
            match worker.spawn() {
                Ok(thread) => workers.push((interface, thread)),
                Err(e) => {
                    trigger.fire();
                    drop(publisher);
                    join_all(workers, sink);
                    return Err(e);
                }
            }
        }

        Ok(Self { workers, sink, trigger })
    }

    /// True once every reader thread has stopped on its own.
    pub fn workers_finished(&self) -> bool {
        self.workers.iter().all(|(_, thread)| thread.is_finished())
    }

    /// Signals the reader threads to stop and waits for them, then waits for
    /// the sink to write out everything they published.
    pub fn shutdown(mut self) -> Vec<(String, WorkerExit)> {
        self.trigger.fire();
        join_all(self.workers, self.sink)
    }
}

// Workers first: the sink only ends once their publishers are dropped.
fn join_all(workers: Vec<(String, thread::JoinHandle<WorkerExit>)>, sink: thread::JoinHandle<()>) -> Vec<(String, WorkerExit)> {
    let mut exits = Vec::with_capacity(workers.len());
    for (interface, thread) in workers {
        match thread.join() {
            Ok(exit) => exits.push((interface, exit)),
            Err(_) => log::error!("reader thread for {} panicked", interface),
        }
    }
    if sink.join().is_err() {
        log::error!("notification thread panicked");
    }
    exits
}
