//! Admission behavior observed through the running proxy.

mod common;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::time::{sleep, timeout};

use revproxy::http::ServerOptions;

const SHORT_DEADLINE: Duration = Duration::from_millis(300);

fn short_deadline() -> ServerOptions {
    ServerOptions {
        request_timeout: SHORT_DEADLINE,
    }
}

/// Backend that reports each arrival and then waits until `hold` gets permits.
async fn start_held_backend(
    hold: Arc<Semaphore>,
) -> (std::net::SocketAddr, mpsc::UnboundedReceiver<String>) {
    let (arrived_tx, arrived_rx) = mpsc::unbounded_channel();
    let addr = common::start_backend(move |head| {
        let arrived = arrived_tx.clone();
        let hold = hold.clone();
        async move {
            let _ = arrived.send(head);
            let _ = hold.acquire().await;
            (200, "slow".to_string())
        }
    })
    .await;
    (addr, arrived_rx)
}

async fn arrival(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("backend never saw the request")
        .expect("backend stopped")
}

#[tokio::test]
async fn busy_backend_rejects_while_unknown_host_is_bad_gateway() {
    let hold = Arc::new(Semaphore::new(0));
    let (backend, mut arrived) = start_held_backend(hold.clone()).await;
    let config = common::config(1, &[("a.test", format!("http://{backend}"))]);
    let (proxy, shutdown) = common::start_proxy(config, 64).await;
    let client = common::client();

    let first = tokio::spawn({
        let client = client.clone();
        async move { common::get(&client, proxy, "a.test", "/").await }
    });
    arrival(&mut arrived).await;

    let second = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);

    let unknown = common::get(&client, proxy, "b.test", "/").await;
    assert_eq!(unknown.status(), StatusCode::BAD_GATEWAY);

    hold.add_permits(1);
    let first = first.await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.text().await.unwrap(), "slow");

    // Slot is back once the first response has been relayed.
    sleep(Duration::from_millis(100)).await;
    let again = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(again.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn admits_exactly_capacity_concurrent_requests() {
    const CAPACITY: usize = 3;

    let hold = Arc::new(Semaphore::new(0));
    let (backend, mut arrived) = start_held_backend(hold.clone()).await;
    let config = common::config(CAPACITY, &[("a.test", format!("http://{backend}"))]);
    let (proxy, shutdown) = common::start_proxy(config, 64).await;
    let client = common::client();

    let mut admitted = Vec::new();
    for _ in 0..CAPACITY {
        let client = client.clone();
        admitted.push(tokio::spawn(async move {
            common::get(&client, proxy, "a.test", "/").await.status()
        }));
    }
    for _ in 0..CAPACITY {
        arrival(&mut arrived).await;
    }

    let overflow = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(overflow.status(), StatusCode::SERVICE_UNAVAILABLE);

    hold.add_permits(CAPACITY);
    for handle in admitted {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn sequential_requests_never_exhaust_the_gate() {
    let backend = common::start_mock_backend("ok").await;
    let config = common::config(1, &[("a.test", format!("http://{backend}"))]);
    let (proxy, shutdown) = common::start_proxy(config, 64).await;
    let client = common::client();

    for _ in 0..20 {
        let res = common::get(&client, proxy, "a.test", "/").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "ok");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_is_bad_gateway_and_frees_the_slot() {
    let dead = common::closed_addr().await;
    let config = common::config(1, &[("a.test", format!("http://{dead}"))]);
    let (proxy, shutdown) = common::start_proxy(config, 64).await;
    let client = common::client();

    // With one slot, a leak would turn the second request into a 503.
    for _ in 0..5 {
        let res = common::get(&client, proxy, "a.test", "/").await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn keys_sharing_a_destination_have_independent_gates() {
    let hold = Arc::new(Semaphore::new(0));
    let (backend, mut arrived) = start_held_backend(hold.clone()).await;
    let destination = format!("http://{backend}");
    let config = common::config(
        1,
        &[("a.test", destination.clone()), ("b.test", destination)],
    );
    let (proxy, shutdown) = common::start_proxy(config, 64).await;
    let client = common::client();

    let a = tokio::spawn({
        let client = client.clone();
        async move { common::get(&client, proxy, "a.test", "/").await.status() }
    });
    arrival(&mut arrived).await;

    // a.test is full, b.test still has its own slot.
    let b = tokio::spawn({
        let client = client.clone();
        async move { common::get(&client, proxy, "b.test", "/").await.status() }
    });
    arrival(&mut arrived).await;

    let rejected = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(rejected.status(), StatusCode::SERVICE_UNAVAILABLE);

    hold.add_permits(2);
    assert_eq!(a.await.unwrap(), StatusCode::OK);
    assert_eq!(b.await.unwrap(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn connections_over_the_global_limit_wait_instead_of_failing() {
    let backend = common::start_mock_backend("ok").await;
    let config = common::config(10, &[("a.test", format!("http://{backend}"))]);
    let (proxy, shutdown) = common::start_proxy(config, 1).await;

    // An idle connection occupies the only slot.
    let mut idle = TcpStream::connect(proxy).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    let (done_tx, mut done_rx) = oneshot::channel();
    tokio::spawn(async move {
        let client = common::client();
        let res = common::get(&client, proxy, "a.test", "/").await;
        let _ = done_tx.send(res.status());
    });

    assert!(timeout(Duration::from_millis(300), &mut done_rx)
        .await
        .is_err());

    let _ = idle.shutdown().await;
    drop(idle);

    let status = timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("waiting connection was never served")
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn deadline_before_response_head_is_gateway_timeout_and_frees_the_slot() {
    let hold = Arc::new(Semaphore::new(0));
    let (backend, mut arrived) = start_held_backend(hold.clone()).await;
    let config = common::config(1, &[("a.test", format!("http://{backend}"))]);
    let (proxy, shutdown) = common::start_proxy_with(config, 64, short_deadline()).await;
    let client = common::client();

    let first = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(first.status(), StatusCode::GATEWAY_TIMEOUT);
    arrival(&mut arrived).await;

    // Had the slot leaked this would be a 503.
    let second = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(second.status(), StatusCode::GATEWAY_TIMEOUT);

    hold.add_permits(2);
    shutdown.trigger();
}

#[tokio::test]
async fn deadline_cuts_off_a_stalled_body_and_frees_the_slot() {
    let backend = common::start_stalling_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial",
    )
    .await;
    let config = common::config(1, &[("a.test", format!("http://{backend}"))]);
    let (proxy, shutdown) = common::start_proxy_with(config, 64, short_deadline()).await;
    let client = common::client();

    let first = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(first.status(), StatusCode::OK);
    let body = timeout(SHORT_DEADLINE * 10, first.bytes())
        .await
        .expect("body was never cut off");
    assert!(body.is_err());

    sleep(Duration::from_millis(100)).await;
    let second = common::get(&client, proxy, "a.test", "/").await;
    assert_eq!(second.status(), StatusCode::OK);

    shutdown.trigger();
}
