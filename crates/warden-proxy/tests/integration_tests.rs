//! End-to-end tests for the Warden proxy.
//!
//! Each test runs the proxy against an in-process fake backend that records
//! the bytes it receives, with a stub executor standing in for Postgres.
//!
//! Run with: cargo test --package warden-proxy --test integration_tests

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;
use warden_core::{
    ApprovalsConfig, ClientInfo, ProxyConfig, QueryRecord, QueryStatus, StatusTransition,
    UpstreamConfig,
};
use warden_proxy::{
    ExecutionOutcome, ExecutorError, RuleSet, StatementExecutor, WardenProxy,
};
use warden_store::{MemoryStore, QueryRecordStore, StatusChange, StoreError};

const TIMEOUT: Duration = Duration::from_secs(5);

/// AuthenticationOk followed by ReadyForQuery(idle).
const BACKEND_GREETING: &[u8] = &[b'R', 0, 0, 0, 8, 0, 0, 0, 0, b'Z', 0, 0, 0, 5, b'I'];

// ============================================================================
// Harness
// ============================================================================

#[derive(Default)]
struct RecordingExecutor {
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl StatementExecutor for RecordingExecutor {
    async fn execute(&self, query: &str) -> Result<ExecutionOutcome, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if query.contains("missing_table") {
            return Err(ExecutorError::Statement(
                "relation \"missing_table\" does not exist".into(),
            ));
        }
        Ok(ExecutionOutcome { rows_affected: 7 })
    }
}

/// Store whose writes always fail.
struct FailingStore {
    changes: broadcast::Sender<StatusChange>,
}

impl FailingStore {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(4);
        Self { changes }
    }
}

#[async_trait]
impl QueryRecordStore for FailingStore {
    async fn create(
        &self,
        _id: Uuid,
        _query: &str,
        _submitter: &str,
        _client_info: ClientInfo,
    ) -> Result<QueryRecord, StoreError> {
        Err(StoreError::LockPoisoned)
    }

    async fn get(&self, _id: Uuid) -> Result<Option<QueryRecord>, StoreError> {
        Ok(None)
    }

    async fn list_by_status(&self, _status: QueryStatus) -> Result<Vec<QueryRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn transition(
        &self,
        id: Uuid,
        _transition: StatusTransition,
    ) -> Result<QueryRecord, StoreError> {
        Err(StoreError::NotFound(id))
    }

    async fn list_all(&self) -> Result<Vec<QueryRecord>, StoreError> {
        Ok(Vec::new())
    }

    fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }
}

/// Fake Postgres: reports every chunk it reads, greets after the first one,
/// and hangs up on Terminate.
async fn spawn_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut greeted = false;
                let mut buf = vec![0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    let chunk = buf[..n].to_vec();
                    let terminate = chunk.ends_with(&[b'X', 0, 0, 0, 4]);
                    let _ = tx.send(chunk);
                    if terminate {
                        return;
                    }
                    if !greeted {
                        greeted = true;
                        socket.write_all(BACKEND_GREETING).await.unwrap();
                    }
                }
            });
        }
    });

    (addr, rx)
}

struct Harness {
    proxy_addr: SocketAddr,
    backend_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    shutdown: watch::Sender<bool>,
    executor: Arc<RecordingExecutor>,
}

impl Harness {
    async fn start(store: Arc<dyn QueryRecordStore>) -> Self {
        Self::start_with(store, ApprovalsConfig {
            poll_interval_ms: 50,
            ..Default::default()
        })
        .await
    }

    async fn start_with(store: Arc<dyn QueryRecordStore>, approvals: ApprovalsConfig) -> Self {
        let (backend_addr, backend_rx) = spawn_backend().await;
        let executor = Arc::new(RecordingExecutor::default());

        let upstream = UpstreamConfig {
            host: backend_addr.ip().to_string(),
            port: backend_addr.port(),
        };
        let proxy = WardenProxy::new(
            ProxyConfig::default(),
            upstream,
            approvals,
            RuleSet::builtin(),
            store,
            executor.clone(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(proxy.serve(listener, shutdown_rx));

        Self {
            proxy_addr,
            backend_rx,
            shutdown,
            executor,
        }
    }

    /// Connect and complete the startup exchange.
    async fn connect(&mut self) -> TcpStream {
        let mut client = TcpStream::connect(self.proxy_addr).await.unwrap();
        client.write_all(&startup_message()).await.unwrap();

        let mut greeting = vec![0u8; BACKEND_GREETING.len()];
        tokio::time::timeout(TIMEOUT, client.read_exact(&mut greeting))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(greeting, BACKEND_GREETING);

        assert_eq!(self.backend_bytes(startup_message().len()).await, startup_message());
        client
    }

    /// Collect exactly `len` bytes from the backend.
    async fn backend_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut received = Vec::new();
        while received.len() < len {
            let chunk = tokio::time::timeout(TIMEOUT, self.backend_rx.recv())
                .await
                .expect("backend received too few bytes")
                .expect("backend channel closed");
            received.extend(chunk);
        }
        assert_eq!(received.len(), len, "backend received unexpected bytes");
        received
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

// ============================================================================
// Wire helpers
// ============================================================================

fn startup_message() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&196608i32.to_be_bytes());
    body.extend_from_slice(b"user\0developer\0database\0app\0\0");
    let mut msg = ((body.len() + 4) as i32).to_be_bytes().to_vec();
    msg.extend(body);
    msg
}

fn query_message(sql: &str) -> Vec<u8> {
    let mut msg = vec![b'Q'];
    msg.extend_from_slice(&((4 + sql.len() + 1) as i32).to_be_bytes());
    msg.extend_from_slice(sql.as_bytes());
    msg.push(0);
    msg
}

/// Read one backend-style message and return its tag and message field.
async fn read_response(client: &mut TcpStream) -> (u8, String) {
    let mut header = [0u8; 5];
    tokio::time::timeout(TIMEOUT, client.read_exact(&mut header))
        .await
        .expect("no response from proxy")
        .unwrap();
    let length = i32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    let mut body = vec![0u8; length - 4];
    client.read_exact(&mut body).await.unwrap();

    assert_eq!(body[0], b'M');
    assert_eq!(&body[body.len() - 2..], &[0, 0]);
    let text = String::from_utf8(body[1..body.len() - 2].to_vec()).unwrap();
    (header[0], text)
}

fn query_id_from_notice(text: &str) -> Uuid {
    let id = text
        .split("Query ID: ")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .expect("notice carries a query id");
    Uuid::parse_str(id).unwrap()
}

/// Queue a dangerous statement and return its ID.
async fn queue(client: &mut TcpStream, sql: &str) -> Uuid {
    client.write_all(&query_message(sql)).await.unwrap();
    let (tag, text) = read_response(client).await;
    assert_eq!(tag, b'N');
    assert!(text.starts_with("Query queued for approval. Query ID: "), "{}", text);
    query_id_from_notice(&text)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_startup_is_forwarded_verbatim() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;

    let _client = harness.connect().await;

    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_safe_query_is_forwarded() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let query = query_message("SELECT 1");
    client.write_all(&query).await.unwrap();

    assert_eq!(harness.backend_bytes(query.len()).await, query);
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dangerous_query_is_withheld() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let id = queue(&mut client, "DELETE FROM users").await;

    let records = store.list_by_status(QueryStatus::Pending).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].query, "DELETE FROM users");
    assert_eq!(records[0].submitter, "developer");
    assert_eq!(records[0].client_info.remote_address.as_deref(), Some("127.0.0.1"));

    // The next safe query is the only thing the backend sees.
    let select = query_message("SELECT 1");
    client.write_all(&select).await.unwrap();
    assert_eq!(harness.backend_bytes(select.len()).await, select);
}

#[tokio::test]
async fn test_each_dangerous_query_gets_a_fresh_id() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let first = queue(&mut client, "DROP TABLE a").await;
    let second = queue(&mut client, "DROP TABLE a").await;

    assert_ne!(first, second);
    assert_eq!(store.list_by_status(QueryStatus::Pending).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_approval_runs_statement_and_notifies_client() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let id = queue(&mut client, "DELETE FROM users").await;
    store.approve(id).await.unwrap();

    let (tag, text) = read_response(&mut client).await;
    assert_eq!(tag, b'N');
    assert_eq!(text, "Query executed successfully. Rows affected: 7");
    assert_eq!(
        *harness.executor.queries.lock().unwrap(),
        vec!["DELETE FROM users".to_string()]
    );
}

#[tokio::test]
async fn test_execution_failure_is_reported() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let id = queue(&mut client, "DELETE FROM missing_table").await;
    store.approve(id).await.unwrap();

    let (tag, text) = read_response(&mut client).await;
    assert_eq!(tag, b'E');
    assert_eq!(
        text,
        "Query execution failed: relation \"missing_table\" does not exist"
    );
    // Execution failure is not a status of its own.
    assert_eq!(
        store.get(id).await.unwrap().unwrap().status,
        QueryStatus::Approved
    );
}

#[tokio::test]
async fn test_approval_executes_at_most_once() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let id = queue(&mut client, "TRUNCATE logs").await;
    store.approve(id).await.unwrap();
    assert!(matches!(
        store.approve(id).await,
        Err(StoreError::AlreadyResolved { .. })
    ));

    read_response(&mut client).await;
    // Several more poll intervals still see the approved record.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(harness.executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejection_notifies_client() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let id = queue(&mut client, "DROP DATABASE prod").await;
    store.reject(id, "too risky").await.unwrap();

    let (tag, text) = read_response(&mut client).await;
    assert_eq!(tag, b'E');
    assert_eq!(text, "Query rejected: too risky");
    assert!(store.list_by_status(QueryStatus::Pending).await.unwrap().is_empty());
    assert_eq!(harness.executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fragmented_messages_are_reassembled() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let query = query_message("SELECT * FROM users WHERE id = 42");
    let (head, tail) = query.split_at(7);
    client.write_all(head).await.unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.write_all(tail).await.unwrap();

    assert_eq!(harness.backend_bytes(query.len()).await, query);

    // A dangerous statement split across writes is still caught.
    let dangerous = query_message("UPDATE users SET admin = true");
    let (head, tail) = dangerous.split_at(12);
    client.write_all(head).await.unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.write_all(tail).await.unwrap();

    let (tag, _) = read_response(&mut client).await;
    assert_eq!(tag, b'N');
    assert_eq!(store.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_input_fails_closed() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    // Query payload without its null terminator.
    client
        .write_all(&[b'Q', 0, 0, 0, 8, b'D', b'R', b'O', b'P'])
        .await
        .unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let select = query_message("SELECT 1");
    client.write_all(&select).await.unwrap();
    assert_eq!(harness.backend_bytes(select.len()).await, select);
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_failure_reports_error_and_keeps_connection() {
    let mut harness = Harness::start(Arc::new(FailingStore::new())).await;
    let mut client = harness.connect().await;

    client
        .write_all(&query_message("DELETE FROM users"))
        .await
        .unwrap();
    let (tag, text) = read_response(&mut client).await;
    assert_eq!(tag, b'E');
    assert_eq!(text, "Failed to queue query for approval");

    let select = query_message("SELECT 1");
    client.write_all(&select).await.unwrap();
    assert_eq!(harness.backend_bytes(select.len()).await, select);
}

#[tokio::test]
async fn test_backend_close_tears_down_client() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store).await;
    let mut client = harness.connect().await;

    let terminate = [b'X', 0, 0, 0, 4];
    client.write_all(&terminate).await.unwrap();
    harness.backend_bytes(terminate.len()).await;

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(TIMEOUT, client.read(&mut buf))
        .await
        .expect("client was not disconnected")
        .unwrap_or(0);
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_result_for_departed_client_is_discarded() {
    let store = Arc::new(MemoryStore::new());
    let mut harness = Harness::start(store.clone()).await;
    let mut client = harness.connect().await;

    let id = queue(&mut client, "DELETE FROM users").await;
    drop(client);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Records outlive the connection and approval still runs the statement.
    store.approve(id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(harness.executor.calls.load(Ordering::SeqCst), 1);

    // The proxy keeps serving other clients.
    let mut other = harness.connect().await;
    let select = query_message("SELECT 1");
    other.write_all(&select).await.unwrap();
    assert_eq!(harness.backend_bytes(select.len()).await, select);
}
