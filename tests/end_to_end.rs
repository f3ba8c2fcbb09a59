//! End-to-end scenarios driving two real `Coordinator`s over a real gRPC connection: happy-path
//! replication, async callback completion, and resumption from a persisted offset after restart.

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tonic::transport::Server;

use synclogd::config::CoordinatorConfig;
use synclogd::rpc::proto::append_log_server::AppendLogServer;
use synclogd::rpc::AppendLogService;
use synclogd::Coordinator;

fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

async fn spawn_follower(addr: String, log_dir: std::path::PathBuf) -> Arc<Coordinator> {
    let config = CoordinatorConfig::follower(log_dir, addr.clone());
    let coordinator = tokio::task::spawn_blocking(move || Coordinator::init(config).unwrap())
        .await
        .unwrap();

    let service = AppendLogService::new(coordinator.clone());
    let bind_addr = addr.parse().unwrap();
    tokio::spawn(async move {
        Server::builder()
            .add_service(AppendLogServer::new(service))
            .serve(bind_addr)
            .await
            .unwrap();
    });

    // give the listener a moment to come up before the leader dials it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    coordinator
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn happy_path_replicates_and_applies() {
    let follower_dir = tempfile::tempdir().unwrap();
    let leader_dir = tempfile::tempdir().unwrap();
    let follower_addr = free_addr();

    let applied = Arc::new(Mutex::new(Vec::new()));
    let applied2 = applied.clone();
    let follower = spawn_follower(follower_addr.clone(), follower_dir.path().to_path_buf()).await;
    follower.register_apply_callback(move |entry| {
        applied2.lock().unwrap().push(entry.to_vec());
    });

    let leader_config = CoordinatorConfig::leader(
        leader_dir.path().to_path_buf(),
        free_addr(),
        follower_addr,
    );
    let leader = tokio::task::spawn_blocking(move || Coordinator::init(leader_config).unwrap())
        .await
        .unwrap();

    assert!(leader.is_leader());

    let leader_for_blocking = leader.clone();
    let ok = tokio::task::spawn_blocking(move || {
        leader_for_blocking.log(b"first entry", Duration::from_secs(2))
    })
    .await
    .unwrap();
    assert!(ok);

    // give the follower's apply callback a moment to run; `log`'s return only guarantees the
    // follower acked the RPC, not that this process observed the side effect yet.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(applied.lock().unwrap().as_slice(), &[b"first entry".to_vec()]);

    let leader_for_shutdown = leader.clone();
    tokio::task::spawn_blocking(move || leader_for_shutdown.shutdown())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_submit_fires_callback_after_replication() {
    let follower_dir = tempfile::tempdir().unwrap();
    let leader_dir = tempfile::tempdir().unwrap();
    let follower_addr = free_addr();

    let _follower = spawn_follower(follower_addr.clone(), follower_dir.path().to_path_buf()).await;

    let leader_config = CoordinatorConfig::leader(
        leader_dir.path().to_path_buf(),
        free_addr(),
        follower_addr,
    );
    let leader = tokio::task::spawn_blocking(move || Coordinator::init(leader_config).unwrap())
        .await
        .unwrap();

    let fired = Arc::new(AtomicBool::new(false));
    let fired2 = fired.clone();
    let leader_for_submit = leader.clone();
    tokio::task::spawn_blocking(move || {
        leader_for_submit.log_async(
            b"async entry",
            Box::new(move |ok| {
                assert!(ok);
                fired2.store(true, Ordering::SeqCst);
            }),
        );
    })
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(fired.load(Ordering::SeqCst));

    let leader_for_shutdown = leader.clone();
    tokio::task::spawn_blocking(move || leader_for_shutdown.shutdown())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_resumes_replication_from_persisted_offset() {
    let follower_dir = tempfile::tempdir().unwrap();
    let leader_dir = tempfile::tempdir().unwrap();
    let follower_addr = free_addr();

    let follower = spawn_follower(follower_addr.clone(), follower_dir.path().to_path_buf()).await;

    let leader_config = CoordinatorConfig::leader(
        leader_dir.path().to_path_buf(),
        free_addr(),
        follower_addr.clone(),
    );
    let leader = tokio::task::spawn_blocking(move || Coordinator::init(leader_config).unwrap())
        .await
        .unwrap();

    let leader_for_submit = leader.clone();
    let ok = tokio::task::spawn_blocking(move || {
        leader_for_submit.log(b"before restart", Duration::from_secs(2))
    })
    .await
    .unwrap();
    assert!(ok);

    let leader_for_shutdown = leader.clone();
    tokio::task::spawn_blocking(move || leader_for_shutdown.shutdown())
        .await
        .unwrap();

    // a fresh Coordinator over the same log_dir should see sync_offset already at current_offset
    // and have nothing left to replicate.
    let leader_dir_path = leader_dir.path().to_path_buf();
    let reopened_config = CoordinatorConfig::leader(leader_dir_path, free_addr(), follower_addr);
    let reopened = tokio::task::spawn_blocking(move || Coordinator::init(reopened_config).unwrap())
        .await
        .unwrap();

    let reopened_for_submit = reopened.clone();
    let ok = tokio::task::spawn_blocking(move || {
        reopened_for_submit.log(b"after restart", Duration::from_secs(2))
    })
    .await
    .unwrap();
    assert!(ok);

    let reopened_for_shutdown = reopened.clone();
    tokio::task::spawn_blocking(move || reopened_for_shutdown.shutdown())
        .await
        .unwrap();

    let _ = follower;
}
