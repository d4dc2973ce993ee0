//! In-process ACL transport for exercising the link layer

use crate::common::Handler;
use crate::hci::{
    AclConnection, AclManager, ConnectionCallbacks, DisconnectCallback, DisconnectReason,
    ErrorCode, PeerAddress,
};
use crate::l2cap::constants::L2CAP_SIGNALING_CID;
use crate::l2cap::signaling::SignalingMessage;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Install a logger once for the whole test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Wait until every task posted to `handler` so far has run
pub fn sync_handler(handler: &Handler) {
    let (tx, rx) = mpsc::channel();
    handler.post(move || {
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(5))
        .expect("handler did not drain");
}

/// Drain the stack handler and the handlers it posts to, in that order
pub fn settle(handlers: &[&Handler]) {
    for _ in 0..2 {
        for handler in handlers {
            sync_handler(handler);
        }
    }
}

#[derive(Default)]
struct ConnectionRecord {
    disconnect_requests: Vec<DisconnectReason>,
    sent: Vec<(u16, Vec<u8>)>,
    disconnect_callback: Option<(Handler, DisconnectCallback)>,
}

/// Test-side view of a connection handed to the link layer
#[derive(Clone)]
pub struct FakeConnectionHandle {
    record: Arc<Mutex<ConnectionRecord>>,
}

impl FakeConnectionHandle {
    pub fn disconnect_requests(&self) -> Vec<DisconnectReason> {
        self.record.lock().unwrap().disconnect_requests.clone()
    }

    /// Signalling commands sent so far, in order
    pub fn sent_signals(&self) -> Vec<SignalingMessage> {
        self.record
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(cid, _)| *cid == L2CAP_SIGNALING_CID)
            .flat_map(|(_, payload)| SignalingMessage::parse_frame(payload))
            .map(|command| command.expect("link sent a malformed command"))
            .collect()
    }

    pub fn last_signal(&self) -> Option<SignalingMessage> {
        self.sent_signals().pop()
    }

    pub fn has_disconnect_callback(&self) -> bool {
        self.record.lock().unwrap().disconnect_callback.is_some()
    }

    /// Report the connection closed, as the transport would
    pub fn inject_disconnect(&self, reason: ErrorCode) {
        let (handler, callback) = self
            .record
            .lock()
            .unwrap()
            .disconnect_callback
            .take()
            .expect("no disconnect callback registered");
        handler.post(move || callback(reason));
    }
}

pub struct FakeAclConnection {
    peer: PeerAddress,
    record: Arc<Mutex<ConnectionRecord>>,
}

impl AclConnection for FakeAclConnection {
    fn peer(&self) -> PeerAddress {
        self.peer
    }

    fn disconnect(&mut self, reason: DisconnectReason) {
        self.record.lock().unwrap().disconnect_requests.push(reason);
    }

    fn register_disconnect_callback(&mut self, handler: Handler, callback: DisconnectCallback) {
        self.record.lock().unwrap().disconnect_callback = Some((handler, callback));
    }

    fn send_pdu(&mut self, cid: u16, payload: Vec<u8>) {
        self.record.lock().unwrap().sent.push((cid, payload));
    }
}

#[derive(Default)]
struct AclManagerRecord {
    callbacks: Option<(Arc<dyn ConnectionCallbacks>, Handler)>,
    create_connection_calls: Vec<PeerAddress>,
    cancel_connect_calls: Vec<PeerAddress>,
}

/// Records connection requests; outcomes are injected by the test
#[derive(Default)]
pub struct FakeAclManager {
    record: Mutex<AclManagerRecord>,
}

impl FakeAclManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create_connection_calls(&self) -> Vec<PeerAddress> {
        self.record.lock().unwrap().create_connection_calls.clone()
    }

    pub fn cancel_connect_calls(&self) -> Vec<PeerAddress> {
        self.record.lock().unwrap().cancel_connect_calls.clone()
    }

    fn callbacks(&self) -> (Arc<dyn ConnectionCallbacks>, Handler) {
        self.record
            .lock()
            .unwrap()
            .callbacks
            .clone()
            .expect("no connection callbacks registered")
    }

    /// Report a successful connection to `peer`
    pub fn inject_connect_success(&self, peer: PeerAddress) -> FakeConnectionHandle {
        let record = Arc::new(Mutex::new(ConnectionRecord::default()));
        let connection = FakeAclConnection {
            peer,
            record: record.clone(),
        };
        let (callbacks, handler) = self.callbacks();
        handler.post(move || callbacks.on_connect_success(peer, Box::new(connection)));
        FakeConnectionHandle { record }
    }

    pub fn inject_connect_fail(&self, peer: PeerAddress, reason: ErrorCode) {
        let (callbacks, handler) = self.callbacks();
        handler.post(move || callbacks.on_connect_fail(peer, reason));
    }
}

impl AclManager for FakeAclManager {
    fn register_callbacks(&self, callbacks: Arc<dyn ConnectionCallbacks>, handler: Handler) {
        self.record.lock().unwrap().callbacks = Some((callbacks, handler));
    }

    fn create_connection(&self, peer: PeerAddress) {
        self.record
            .lock()
            .unwrap()
            .create_connection_calls
            .push(peer);
    }

    fn cancel_connect(&self, peer: PeerAddress) {
        self.record.lock().unwrap().cancel_connect_calls.push(peer);
    }
}
