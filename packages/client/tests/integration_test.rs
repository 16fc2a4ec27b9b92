//! Integration tests running the dashboard engine against an in-process server.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use arrboard_client::{
    domain::{Identity, MessageGateway},
    error::FeedError,
    infrastructure::{ConnectionStatus, HttpGateway, RealtimeClient, realtime_url},
    usecase::{FeedController, FeedKind, PresenceTracker, SignalBus},
};
use arrboard_server::{
    infrastructure::{dto::realtime::channel, repository::InMemoryDashboardRepository},
    ui::{Server, state::AppState},
};
use arrboard_shared::time::SystemClock;
use tokio::{net::TcpListener, task::JoinHandle};

/// Server serving on an ephemeral port until dropped
struct TestServer {
    base_url: String,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let repository = Arc::new(InMemoryDashboardRepository::seeded(
            BTreeMap::new(),
            Vec::new(),
        ));
        let state = AppState::new(repository, Arc::new(SystemClock), Default::default());
        let task = tokio::spawn(async move {
            Server::new(state)
                .serve(listener, std::future::pending())
                .await
                .expect("Server failed");
        });

        TestServer {
            base_url: format!("http://{}", addr),
            task,
        }
    }

    fn gateway(&self, identity: &Identity) -> Arc<HttpGateway> {
        Arc::new(HttpGateway::new(self.base_url.clone(), identity.clone()))
    }

    fn realtime(&self) -> RealtimeClient {
        RealtimeClient::connect(realtime_url(&self.base_url))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn wait_connected(client: &RealtimeClient) {
    let mut status = client.status();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| *s == ConnectionStatus::Connected),
    )
    .await
    .expect("Timed out waiting for connection")
    .expect("Status channel closed");
    // Let the server process the join frames
    tokio::time::sleep(Duration::from_millis(100)).await;
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

fn feed(server: &TestServer, identity: &Identity) -> FeedController {
    FeedController::new(
        server.gateway(identity),
        identity.clone(),
        SignalBus::new(),
        50,
        FeedKind::Chat,
    )
}

#[tokio::test]
async fn test_message_reaches_other_client_exactly_once() {
    // テスト項目: 送信したメッセージが他のクライアントに一度だけ届く
    // given (前提条件):
    let server = TestServer::start().await;
    let alice = Identity::new("u-alice", "Alice");
    let bob = Identity::new("u-bob", "Bob");

    let alice_feed = feed(&server, &alice);
    let bob_feed = feed(&server, &bob);
    let alice_client = server.realtime();
    let bob_client = server.realtime();
    alice_feed.bind(alice_client.open_channel(channel::CHAT));
    bob_feed.bind(bob_client.open_channel(channel::CHAT));
    alice_feed.load_initial().await.unwrap();
    bob_feed.load_initial().await.unwrap();
    wait_connected(&alice_client).await;
    wait_connected(&bob_client).await;

    // when (操作):
    let sent = alice_feed.send("hello from Alice", false).await.unwrap();
    let delivered = wait_until(|| bob_feed.messages().iter().any(|m| m.id == sent.id)).await;
    bob_feed.refresh().await.unwrap();

    // then (期待する結果):
    assert!(delivered);
    let copies = bob_feed
        .messages()
        .iter()
        .filter(|m| m.id == sent.id)
        .count();
    assert_eq!(copies, 1);
    assert_eq!(alice_feed.messages().len(), 1);
    assert_eq!(bob_feed.messages()[0].author_name, "Alice");
}

#[tokio::test]
async fn test_delete_propagates_and_foreign_delete_is_forbidden() {
    // テスト項目: 作者の削除は他クライアントへ伝わり、他人の削除は拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let alice = Identity::new("u-alice", "Alice");
    let bob = Identity::new("u-bob", "Bob");

    let alice_feed = feed(&server, &alice);
    let bob_feed = feed(&server, &bob);
    let alice_client = server.realtime();
    let bob_client = server.realtime();
    alice_feed.bind(alice_client.open_channel(channel::CHAT));
    bob_feed.bind(bob_client.open_channel(channel::CHAT));
    alice_feed.load_initial().await.unwrap();
    bob_feed.load_initial().await.unwrap();
    wait_connected(&alice_client).await;
    wait_connected(&bob_client).await;

    let first = alice_feed.send("first", false).await.unwrap();
    let second = alice_feed.send("second", false).await.unwrap();
    assert!(wait_until(|| bob_feed.messages().len() == 2).await);

    // when (操作):
    let local_denied = bob_feed.delete(&first.id).await;
    let server_denied = server.gateway(&bob).delete_message(second.id.clone()).await;
    alice_feed.delete(&first.id).await.unwrap();
    let removed = wait_until(|| bob_feed.messages().len() == 1).await;

    // then (期待する結果):
    assert_eq!(local_denied, Err(FeedError::Forbidden));
    assert_eq!(server_denied.unwrap_err().status(), Some(403));
    assert!(removed);
    assert_eq!(bob_feed.messages()[0].id, second.id);
}

#[tokio::test]
async fn test_presence_lists_both_users() {
    // テスト項目: 二人のクライアントが互いをオンラインとして認識する
    // given (前提条件):
    let server = TestServer::start().await;
    let alice_client = server.realtime();
    let bob_client = server.realtime();
    let alice_presence = PresenceTracker::new(alice_client.clone());
    let bob_presence = PresenceTracker::new(bob_client.clone());

    // when (操作):
    alice_presence.init_presence(&Identity::new("u-alice", "Alice"));
    bob_presence.init_presence(&Identity::new("u-bob", "Bob"));
    wait_connected(&alice_client).await;
    wait_connected(&bob_client).await;

    // then (期待する結果):
    let expected = BTreeSet::from(["Alice".to_string(), "Bob".to_string()]);
    assert!(wait_until(|| alice_presence.online_users() == expected).await);
    assert!(wait_until(|| bob_presence.online_users() == expected).await);

    bob_presence.cleanup_presence();
    bob_client.close();
    assert!(
        wait_until(|| alice_presence.online_users() == BTreeSet::from(["Alice".to_string()]))
            .await
    );
}
