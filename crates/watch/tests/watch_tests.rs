//! End-to-end behaviour of [`watcher::watch`] over an in-memory stream.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use vistral_stream::{EventStreamConsumer, CONNECTION_LOST};
use vistral_watch::watcher::{self, Outcome};

type Chunk = Result<Bytes, std::io::Error>;

const WAIT: Duration = Duration::from_secs(5);

fn sse(json: &str) -> Chunk {
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

fn channel_consumer() -> (mpsc::Sender<Chunk>, EventStreamConsumer) {
    let (tx, rx) = mpsc::channel(16);
    (tx, EventStreamConsumer::from_stream(ReceiverStream::new(rx)))
}

async fn watch_until_done(consumer: &EventStreamConsumer) -> Outcome {
    tokio::time::timeout(WAIT, watcher::watch(consumer, std::future::pending()))
        .await
        .expect("watch should end in time")
}

#[tokio::test]
async fn completes_on_complete_event() {
    let (tx, consumer) = channel_consumer();
    for frame in [
        r#"{"step":"audio","progress":10,"message":"Extracting audio"}"#,
        r#"{"step":"frames","progress":30,"message":"frame 4/20","ticker":true}"#,
        r#"{"heartbeat":true}"#,
        r#"{"step":"complete","progress":100,"message":"Done"}"#,
    ] {
        tx.send(sse(frame)).await.unwrap();
    }

    assert_eq!(watch_until_done(&consumer).await, Outcome::Complete);
    assert_eq!(consumer.events().len(), 2);
}

#[tokio::test]
async fn pipeline_error_fails_with_its_message() {
    let (tx, consumer) = channel_consumer();
    tx.send(sse(r#"{"step":"audio","progress":10,"message":""}"#)).await.unwrap();
    tx.send(sse(r#"{"step":"error","progress":0,"message":"ffmpeg exited with 1"}"#))
        .await
        .unwrap();

    let outcome = watch_until_done(&consumer).await;
    assert_eq!(outcome, Outcome::Failed("ffmpeg exited with 1".into()));
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn dropped_transport_fails_with_connection_lost() {
    let (tx, consumer) = channel_consumer();
    tx.send(sse(r#"{"step":"vision","progress":55,"message":""}"#)).await.unwrap();
    drop(tx);

    assert_eq!(
        watch_until_done(&consumer).await,
        Outcome::Failed(CONNECTION_LOST.into())
    );
}

#[tokio::test]
async fn shutdown_closes_the_stream() {
    let (tx, consumer) = channel_consumer();
    tx.send(sse(r#"{"step":"graph","progress":70,"message":""}"#)).await.unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let watching = watcher::watch(&consumer, async {
        stop_rx.await.ok();
    });
    stop_tx.send(()).unwrap();

    let outcome = tokio::time::timeout(WAIT, watching).await.unwrap();
    assert_eq!(outcome, Outcome::Interrupted);

    tokio::time::timeout(WAIT, consumer.closed()).await.unwrap();
    tokio::time::timeout(WAIT, tx.closed()).await.unwrap();
    assert_eq!(consumer.error(), None);
}

#[tokio::test]
async fn already_terminal_state_returns_immediately() {
    let (tx, consumer) = channel_consumer();
    tx.send(sse(r#"{"step":"complete","progress":100,"message":""}"#)).await.unwrap();
    tokio::time::timeout(WAIT, consumer.closed()).await.unwrap();

    assert_eq!(watch_until_done(&consumer).await, Outcome::Complete);
}
