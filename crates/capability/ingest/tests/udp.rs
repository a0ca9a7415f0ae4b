use domain::InstanceState;
use i104m_ingest::{PeerAllowList, UdpReceiver, bind, datagram_queue};
use i104m_redundancy::{ActivityHandle, RedundancyConfig, RedundancyController};
use i104m_storage::InMemoryInstanceStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn activity(active: bool) -> (RedundancyController, ActivityHandle) {
    let store = Arc::new(InMemoryInstanceStore::new());
    store
        .put_instance(InstanceState {
            driver: "I104M".to_string(),
            instance_number: 1,
            enabled: true,
            log_level: 0,
            node_names: vec!["mainNode".to_string()],
            active_node_name: if active { "mainNode" } else { "otherNode" }.to_string(),
            active_node_keep_alive_ms: 0,
        })
        .expect("instance");
    let mut controller =
        RedundancyController::new(store, RedundancyConfig::new("I104M", 1, "mainNode"));
    controller.poll(1).await.expect("poll");
    let handle = controller.handle();
    assert_eq!(handle.is_active(), active);
    (controller, handle)
}

async fn start(
    peers: &[&str],
    handle: ActivityHandle,
) -> (
    std::net::SocketAddr,
    tokio::sync::mpsc::Receiver<i104m_ingest::Datagram>,
) {
    let socket = Arc::new(bind("127.0.0.1:0").await.expect("bind"));
    let local = socket.local_addr().expect("local");
    let peers: Vec<String> = peers.iter().map(|peer| peer.to_string()).collect();
    let (queue, receiver) = datagram_queue(8);
    let receiver_task = UdpReceiver::new(socket, PeerAllowList::new(&peers), queue, handle);
    tokio::spawn(receiver_task.run());
    (local, receiver)
}

#[tokio::test]
async fn active_receiver_queues_allowed_datagrams() {
    let (_controller, handle) = activity(true).await;
    let (local, mut queue) = start(&["127.0.0.1"], handle).await;
    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");

    sender.send_to(&[1, 2, 3], local).await.expect("short");
    sender
        .send_to(&[0x53, 0x53, 0x53, 0x53, 9], local)
        .await
        .expect("frame");

    let datagram = timeout(Duration::from_secs(2), queue.recv())
        .await
        .expect("in time")
        .expect("datagram");
    assert_eq!(datagram.bytes, vec![0x53, 0x53, 0x53, 0x53, 9]);
    assert_eq!(datagram.source, sender.local_addr().expect("addr"));
    assert!(datagram.received_at_ms > 0);
}

#[tokio::test]
async fn standby_receiver_reads_but_does_not_queue() {
    let (_controller, handle) = activity(false).await;
    let (local, mut queue) = start(&["127.0.0.1"], handle).await;
    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");

    sender.send_to(&[0x64; 12], local).await.expect("send");
    assert!(
        timeout(Duration::from_millis(300), queue.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn unknown_source_is_rejected() {
    let (_controller, handle) = activity(true).await;
    let (local, mut queue) = start(&["10.255.255.1"], handle).await;
    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");

    sender.send_to(&[0x64; 12], local).await.expect("send");
    assert!(
        timeout(Duration::from_millis(300), queue.recv())
            .await
            .is_err()
    );
}
