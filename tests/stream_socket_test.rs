//! A download served over a real TCP socket.
//!
//! hyper stops polling the body once `Content-Length` bytes are out, so the
//! in-process tests cannot show which cleanup path ran. This file captures
//! `log` records to tell them apart; it holds a single test because the
//! logger is process-global.

mod common;

use common::{large_payload, list_dir, FakeRunner, Scenario};
use nulldl::core::config::Config;
use nulldl::core::web_server::{router, AppState};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());
static LOGGER: CaptureLogger = CaptureLogger;

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            LINES.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

fn logged(prefix: &str) -> bool {
    LINES.lock().unwrap().iter().any(|line| line.starts_with(prefix))
}

/// Read one HTTP/1.1 response with a `Content-Length` body, leaving the
/// connection open.
async fn read_response(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut raw = Vec::new();
    let mut buf = [0u8; 8192];

    let head_end = loop {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before the headers");
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8(raw[..head_end].to_vec()).unwrap();
    let length = head
        .lines()
        .find_map(|line| {
            line.to_ascii_lowercase()
                .strip_prefix("content-length:")
                .map(|v| v.trim().parse::<usize>().unwrap())
        })
        .unwrap();

    let mut body = raw.split_off(head_end);
    while body.len() < length {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed after {} of {} bytes", body.len(), length);
        body.extend_from_slice(&buf[..n]);
    }
    (head, body)
}

#[tokio::test]
async fn test_complete_transfer_deletes_file_before_last_byte() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(log::LevelFilter::Info);

    let scratch = tempfile::tempdir().unwrap();
    let public = tempfile::tempdir().unwrap();
    let config = Config {
        temp_dir: scratch.path().to_path_buf(),
        static_dir: public.path().to_path_buf(),
        ..Config::default()
    };
    let state = AppState::build(&config, Arc::new(FakeRunner::new(Scenario::LargeComplete))).unwrap();
    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    // Keep-alive, so the end of the transfer is not signalled by a close.
    let payload = r#"{"url":"https://youtu.be/test","title":"Big"}"#;
    let request = format!(
        "POST /download HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        addr,
        payload.len(),
        payload
    );
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let (head, body) = read_response(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200"), "{}", head);
    assert_eq!(body.len(), large_payload().len());
    assert!(body == large_payload());

    // The last chunk is only released once the delete is done.
    assert!(list_dir(scratch.path()).is_empty());
    assert!(logged("[Stream] Complete"));
    assert!(logged("[Cleanup] Success"));
    assert!(!logged("[Cleanup] Swept"));
}
