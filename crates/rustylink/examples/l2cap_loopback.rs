/// Example demonstrating fixed channel services over an in-memory ACL link
use rustylink::hci::{DisconnectCallback, DisconnectReason};
use rustylink::l2cap::constants::L2CAP_BR_EDR_SECURITY_MANAGER_CID;
use rustylink::*;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// ACL connection that prints what the link layer does with it
struct LoopbackConnection {
    peer: PeerAddress,
    on_disconnect: Option<(Handler, DisconnectCallback)>,
}

impl AclConnection for LoopbackConnection {
    fn peer(&self) -> PeerAddress {
        self.peer
    }

    fn disconnect(&mut self, reason: DisconnectReason) {
        println!("ACL disconnect requested: {}", reason);
        if let Some((handler, callback)) = self.on_disconnect.take() {
            let reason = ErrorCode::from(reason);
            handler.post(move || callback(reason));
        }
    }

    fn register_disconnect_callback(&mut self, handler: Handler, callback: DisconnectCallback) {
        self.on_disconnect = Some((handler, callback));
    }

    fn send_pdu(&mut self, cid: u16, payload: Vec<u8>) {
        println!("Sending on CID 0x{:04X}: {}", cid, hex::encode(payload));
    }
}

/// ACL manager whose connections always succeed right away
#[derive(Default)]
struct LoopbackAclManager {
    callbacks: Mutex<Option<(Arc<dyn ConnectionCallbacks>, Handler)>>,
}

impl AclManager for LoopbackAclManager {
    fn register_callbacks(&self, callbacks: Arc<dyn ConnectionCallbacks>, handler: Handler) {
        *self.callbacks.lock().unwrap() = Some((callbacks, handler));
    }

    fn create_connection(&self, peer: PeerAddress) {
        println!("Creating ACL connection to {}", peer);
        if let Some((callbacks, handler)) = self.callbacks.lock().unwrap().clone() {
            let connection = LoopbackConnection {
                peer,
                on_disconnect: None,
            };
            handler.post(move || callbacks.on_connect_success(peer, Box::new(connection)));
        }
    }

    fn cancel_connect(&self, peer: PeerAddress) {
        println!("Cancelling ACL connection to {}", peer);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("L2CAP Loopback Example");
    println!("----------------------");

    let stack = Handler::new("l2cap")?;
    let app = Handler::new("app")?;

    let fixed_services = Arc::new(FixedChannelServiceManager::new());
    let (channel_tx, channel_rx) = mpsc::channel();
    let channel_tx = Mutex::new(channel_tx);
    fixed_services.register(
        L2CAP_BR_EDR_SECURITY_MANAGER_CID,
        SecurityPolicy::None,
        app.clone(),
        move |channel| {
            println!("Fixed channel created: CID=0x{:04X}", channel.cid());
            let _ = channel_tx.lock().unwrap().send(channel);
        },
    )?;

    let config = L2capConfig {
        classic_idle_timeout: Duration::from_secs(1),
        ..L2capConfig::default()
    };
    let manager = LinkManager::new(
        stack.clone(),
        Arc::new(LoopbackAclManager::default()),
        fixed_services,
        Arc::new(DynamicChannelServiceManager::new()),
        Arc::new(config),
    );

    let peer = PeerAddress::public([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);
    manager.connect_fixed_channel_services(
        peer,
        PendingFixedChannelConnection::new(
            app.clone(),
            |peer| println!("Connected to {}", peer),
            |error| eprintln!("Connection failed: {}", error),
        ),
    );

    let channel: FixedChannel = channel_rx.recv_timeout(Duration::from_secs(5))?;
    let (closed_tx, closed_rx) = mpsc::channel();
    channel.register_on_close_callback(app.clone(), move |reason| {
        println!("Channel closed: {}", reason);
        let _ = closed_tx.send(());
    });

    println!("Holding the channel for two seconds");
    channel.acquire();
    std::thread::sleep(Duration::from_secs(2));
    channel.release();

    println!("Channel released, waiting for the idle timeout");
    closed_rx.recv_timeout(Duration::from_secs(5))?;
    println!("Links left: {}", manager.link_count());

    stack.stop();
    app.stop();
    Ok(())
}
