use std::{fmt, io};

use crossbeam::channel::{self, Receiver, Sender};

use crate::metrics::Metrics;

/// A host seen for the first time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovery {
    pub interface: String,
    pub hw_addr: String,
    pub proto_addr: String,
}

impl fmt::Display for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "New host discovered on {}: {} ({})", self.interface, self.hw_addr, self.proto_addr)
    }
}

/// Capacity policy of the queue between the workers and the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueBound {
    /// Never drops or delays a discovery; pending items grow without limit
    /// while the destination is slow.
    #[default]
    Unbounded,
    /// Workers block in [`Publisher::publish`] while `n` items are pending.
    Bounded(usize),
}

/// Where discoveries end up.
pub trait Notifier: Send {
    fn notify(&mut self, discovery: &Discovery) -> io::Result<()>;
}

/// Writes each discovery to the log destination.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, discovery: &Discovery) -> io::Result<()> {
        log::info!("{}", discovery);
        Ok(())
    }
}

impl<F> Notifier for F
where
    F: FnMut(&Discovery) -> io::Result<()> + Send,
{
    fn notify(&mut self, discovery: &Discovery) -> io::Result<()> {
        self(discovery)
    }
}

/// Producer side, one clone per worker.
#[derive(Clone)]
pub struct Publisher {
    tx: Sender<Discovery>,
}

impl Publisher {
    /// Enqueues `discovery`. Returns false once the sink has stopped.
    pub fn publish(&self, discovery: Discovery) -> bool {
        self.tx.send(discovery).is_ok()
    }
}

/// Single consumer draining the queue in arrival order.
pub struct NotificationSink {
    rx: Receiver<Discovery>,
    metrics: Metrics,
}

pub fn queue(bound: QueueBound, metrics: Metrics) -> (Publisher, NotificationSink) {
    let (tx, rx) = match bound {
        QueueBound::Unbounded => channel::unbounded(),
        QueueBound::Bounded(n) => channel::bounded(n),
    };
    (Publisher { tx }, NotificationSink { rx, metrics })
}

impl NotificationSink {
    /// Runs until every [`Publisher`] is gone, delivering everything they queued.
    ///
    /// Shutdown reaches the sink through its producers: cancelled workers drop
    /// their publishers, the channel disconnects, and the loop ends only after
    /// the last accepted item was written.
    pub fn run<N: Notifier>(self, mut notifier: N) {
        log::debug!("notification sink started");
        for discovery in self.rx.iter() {
            self.deliver(&mut notifier, &discovery);
        }
        log::debug!("notification sink stopped");
    }

    fn deliver<N: Notifier>(&self, notifier: &mut N, discovery: &Discovery) {
        match notifier.notify(discovery) {
            Ok(()) => self.metrics.notification(),
            Err(e) => log::error!("failed to write notification ({}): {}", discovery, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
        time::Duration,
    };

    use super::*;

    fn discovery(n: u8) -> Discovery {
        Discovery { interface: "eth0".into(), hw_addr: format!("00:00:00:00:00:{:02x}", n), proto_addr: format!("10.0.0.{}", n) }
    }

    fn collector() -> (Arc<Mutex<Vec<Discovery>>>, impl Notifier) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        (seen, move |d: &Discovery| -> io::Result<()> {
            sink_seen.lock().unwrap().push(d.clone());
            Ok(())
        })
    }

    #[test]
    fn display_line() {
        let d = Discovery { interface: "eth0".into(), hw_addr: "00:11:22:33:44:55".into(), proto_addr: "1.2.3.4".into() };
        assert_eq!(d.to_string(), "New host discovered on eth0: 00:11:22:33:44:55 (1.2.3.4)");
    }

    #[test]
    fn delivers_in_fifo_order_until_publishers_gone() {
        let metrics = Metrics::new();
        let (publisher, sink) = queue(QueueBound::Unbounded, metrics.clone());
        let (seen, notifier) = collector();

        for n in 0..50 {
            assert!(publisher.publish(discovery(n)));
        }
        drop(publisher);
        sink.run(notifier);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, (0..50).map(discovery).collect::<Vec<_>>());
        assert_eq!(metrics.notifications(), 50);
    }

    #[test]
    fn every_accepted_item_is_delivered_while_producers_wind_down() {
        let (publisher, sink) = queue(QueueBound::Unbounded, Metrics::new());
        let (seen, notifier) = collector();
        let consumer = thread::spawn(move || sink.run(notifier));

        // late producer, still sending after the others are gone
        let late = publisher.clone();
        drop(publisher);
        let producer = thread::spawn(move || {
            let mut accepted = 0;
            for n in 0..100 {
                if late.publish(discovery(n)) {
                    accepted += 1;
                }
                if n % 10 == 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            accepted
        });
        let accepted = producer.join().unwrap();
        consumer.join().unwrap();

        assert_eq!(accepted, 100);
        assert_eq!(seen.lock().unwrap().len(), accepted);
    }

    #[test]
    fn publish_fails_once_sink_is_gone() {
        let (publisher, sink) = queue(QueueBound::Bounded(8), Metrics::new());
        drop(sink);
        assert!(!publisher.publish(discovery(1)));
    }

    #[test]
    fn bounded_queue_applies_backpressure() {
        let (publisher, sink) = queue(QueueBound::Bounded(1), Metrics::new());
        let (seen, notifier) = collector();

        let producer = thread::spawn(move || {
            for n in 0..20 {
                assert!(publisher.publish(discovery(n)));
            }
        });
        let consumer = thread::spawn(move || sink.run(notifier));
        producer.join().unwrap();
        consumer.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..20).map(discovery).collect::<Vec<_>>());
    }

    #[test]
    fn failed_write_is_not_counted() {
        let metrics = Metrics::new();
        let (publisher, sink) = queue(QueueBound::Unbounded, metrics.clone());
        publisher.publish(discovery(1));
        drop(publisher);
        sink.run(|_: &Discovery| -> io::Result<()> { Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")) });
        assert_eq!(metrics.notifications(), 0);
    }
}
