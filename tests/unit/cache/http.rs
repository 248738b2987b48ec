use std::{
    io::{Read, Write},
    net::TcpListener,
    thread,
};

use super::*;
use crate::cache::models::FETCH_CHUNK;

/// Serve one canned response on a local port and return its base URL.
fn serve_once(head: impl Into<String>, body: Vec<u8>) -> (String, thread::JoinHandle<()>) {
    let head = head.into();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        while !request.ends_with(b"\r\n\r\n") {
            if stream.read(&mut byte).unwrap() == 0 {
                break;
            }
            request.push(byte[0]);
        }
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
    });
    (format!("http://{addr}"), handle)
}

fn local_fetcher() -> HttpFetcher {
    HttpFetcher::with_client(Client::builder().no_proxy().build().unwrap())
}

#[test]
fn streams_body_and_reports_fraction() {
    let body: Vec<u8> = (0..3 * FETCH_CHUNK).map(|i| (i % 251) as u8).collect();
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let (base, server) = serve_once(head, body.clone());

    let mut fractions = Vec::new();
    let got = local_fetcher()
        .fetch(&format!("{base}/model.onnx"), &mut |p| fractions.push(p))
        .unwrap();
    server.join().unwrap();

    assert_eq!(got, body);
    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fractions.last().copied(), Some(1.0));
}

#[test]
fn missing_length_skips_progress() {
    let (base, server) = serve_once(
        "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n",
        b"weights".to_vec(),
    );

    let mut calls = 0;
    let got = local_fetcher()
        .fetch(&format!("{base}/model.onnx"), &mut |_| calls += 1)
        .unwrap();
    server.join().unwrap();

    assert_eq!(got, b"weights");
    assert_eq!(calls, 0);
}

#[test]
fn not_found_is_resource_missing() {
    let (base, server) = serve_once(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        Vec::new(),
    );

    let err = local_fetcher()
        .fetch(&format!("{base}/lama_fp32.onnx"), &mut |_| {})
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, DepthFlowError::ResourceMissing(_)), "{err:?}");
}

#[test]
fn server_error_fails_with_status() {
    let (base, server) = serve_once(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        Vec::new(),
    );

    let err = local_fetcher()
        .fetch(&format!("{base}/model.onnx"), &mut |_| {})
        .unwrap_err();
    server.join().unwrap();

    assert!(err.to_string().contains("503"), "{err}");
}

#[test]
fn default_fetcher_builds() {
    HttpFetcher::new().unwrap();
}
