//! Shared test support utilities for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use unicall_core::{
    Completion, Demand, ReqwestTransport, Subscriber, Subscription, TimeoutConfig, Transport,
    TransportFuture, TransportRequest,
};

/// Everything a subscriber observed, in order
#[derive(Debug)]
pub enum Event {
    Value(Bytes),
    Completion(Completion),
}

/// Subscriber forwarding every signal to a channel
pub struct Recorder {
    demand: Option<Demand>,
    events: mpsc::UnboundedSender<Event>,
}

impl Subscriber for Recorder {
    fn receive_subscription(&mut self, subscription: &Subscription) {
        if let Some(demand) = self.demand {
            subscription.request(demand);
        }
    }

    fn receive(&mut self, value: Bytes) -> Demand {
        let _ = self.events.send(Event::Value(value));
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion) {
        let _ = self.events.send(Event::Completion(completion));
    }
}

/// Recorder that requests `demand` as soon as it is attached
pub fn recorder(demand: Option<Demand>) -> (Recorder, mpsc::UnboundedReceiver<Event>) {
    let (events, rx) = mpsc::unbounded_channel();
    (Recorder { demand, events }, rx)
}

/// Drain events until a completion arrives or `wait` passes without one
pub async fn collect(rx: &mut mpsc::UnboundedReceiver<Event>, wait: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(wait, rx.recv()).await {
        let done = matches!(event, Event::Completion(_));
        events.push(event);
        if done {
            // Give a second emission the chance to show up
            while let Ok(Some(extra)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
                events.push(extra);
            }
            break;
        }
    }
    events
}

/// Transport wrapper counting how many calls were issued
#[derive(Debug)]
pub struct CountingTransport {
    inner: ReqwestTransport,
    calls: AtomicUsize,
}

impl CountingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: ReqwestTransport::new(TimeoutConfig::fast()).expect("reqwest transport"),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn execute(&self, request: TransportRequest) -> TransportFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(request)
    }
}

/// TCP server that accepts connections and never answers
pub async fn silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}
