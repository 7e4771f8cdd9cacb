//! 图片探测集成测试
//!
//! 覆盖成功、失败、超时三种结局以及结算唯一性

use image::{ImageFormat, RgbImage};
use image_probe::config::ProbeConfig;
use image_probe::error::ProbeError;
use image_probe::probe::{HttpImageProber, ImageChecker, ProbeOutcome, ProbeTarget};
use std::io::Cursor;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

fn png_bytes() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    RgbImage::new(4, 3)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// 启动一个延迟响应的HTTP服务，返回图片URL
async fn spawn_slow_server(delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = png_bytes();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.flush().await;
            });
        }
    });

    format!("http://{addr}/big.png")
}

fn prober() -> HttpImageProber {
    HttpImageProber::with_defaults().unwrap()
}

#[tokio::test]
async fn test_check_exists_reports_true_once_for_valid_image() {
    let url = spawn_slow_server(Duration::from_millis(200)).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let start = Instant::now();

    prober().check_exists_default(url, move |loaded| {
        let _ = tx.send(loaded);
    });

    let loaded = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap();
    assert_eq!(loaded, Some(true));
    assert!(start.elapsed() >= Duration::from_millis(200));
    // 回调只会被调用一次，发送端随之释放
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_preload_fulfills_with_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/img.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(png_bytes())
        .create_async()
        .await;

    let url = format!("{}/img.png", server.url());
    let result = prober().preload(&url, Duration::from_secs(5)).await;

    assert_eq!(result, Ok(url));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_image_reports_false_and_rejects() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/none.png")
        .with_status(404)
        .expect_at_least(1)
        .create_async()
        .await;
    let url = format!("{}/none.png", server.url());
    let prober = prober();

    let (tx, mut rx) = mpsc::unbounded_channel();
    prober.check_exists(
        url.clone(),
        move |loaded| {
            let _ = tx.send(loaded);
        },
        Duration::from_secs(5),
    );
    assert_eq!(rx.recv().await, Some(false));
    assert!(rx.recv().await.is_none());

    let result = prober.preload(&url, Duration::from_secs(5)).await;
    match result {
        Err(ProbeError::LoadFailed { reason, .. }) => assert!(reason.contains("HTTP 404")),
        other => panic!("unexpected result: {other:?}"),
    }

    let report = prober.inspect(&url, Duration::from_secs(5)).await;
    assert_eq!(report.outcome, ProbeOutcome::Failed);
    assert_eq!(report.status_code, Some(404));
}

#[tokio::test]
async fn test_slow_image_times_out_and_late_load_is_ignored() {
    let delay = Duration::from_millis(600);
    let url = spawn_slow_server(delay).await;
    let prober = prober();

    let start = Instant::now();
    let result = prober.preload(&url, Duration::from_millis(100)).await;
    let elapsed = start.elapsed();

    match &result {
        Err(error) => {
            assert!(error.is_timeout());
            assert_eq!(error.reason_tag(), "timeout");
            assert!(error.to_string().contains("timeout"));
        }
        Ok(url) => panic!("expected timeout, got {url}"),
    }
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < delay);

    // 回调形式：超时后迟到的加载不会再次回调
    let (tx, mut rx) = mpsc::unbounded_channel();
    prober.check_exists(
        url,
        move |loaded| {
            let _ = tx.send(loaded);
        },
        Duration::from_millis(100),
    );
    assert_eq!(rx.recv().await, Some(false));

    tokio::time::sleep(delay + Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_repeated_probes_are_independent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/same.png")
        .with_status(200)
        .with_body(png_bytes())
        .expect(2)
        .create_async()
        .await;

    let url = format!("{}/same.png", server.url());
    let prober = prober();

    let first = prober.preload(&url, Duration::from_secs(5)).await;
    let second = prober.preload(&url, Duration::from_secs(5)).await;

    assert!(first.is_ok());
    assert!(second.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_image_body_fails_to_load() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/page.png")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>soft 404</html>")
        .create_async()
        .await;

    let url = format!("{}/page.png", server.url());
    let report = prober().inspect(&url, Duration::from_secs(5)).await;

    assert_eq!(report.outcome, ProbeOutcome::Failed);
    assert_eq!(report.status_code, Some(200));
    assert_eq!(report.content_type.as_deref(), Some("text/html"));
}

#[tokio::test]
async fn test_cors_origin_is_enforced() {
    let mut server = mockito::Server::new_async().await;
    let _blocked = server
        .mock("GET", "/blocked.png")
        .match_header("origin", "https://app.example")
        .match_header("cookie", mockito::Matcher::Missing)
        .with_status(200)
        .with_body(png_bytes())
        .create_async()
        .await;
    let _allowed = server
        .mock("GET", "/allowed.png")
        .match_header("origin", "https://app.example")
        .with_status(200)
        .with_header("access-control-allow-origin", "*")
        .with_body(png_bytes())
        .create_async()
        .await;

    let prober = HttpImageProber::new(ProbeConfig {
        origin: Some("https://app.example".to_string()),
        ..Default::default()
    })
    .unwrap();

    let blocked = prober
        .preload(&format!("{}/blocked.png", server.url()), Duration::from_secs(5))
        .await;
    match blocked {
        Err(ProbeError::LoadFailed { reason, .. }) => assert!(reason.contains("CORS")),
        other => panic!("unexpected result: {other:?}"),
    }

    let allowed = prober
        .preload(&format!("{}/allowed.png", server.url()), Duration::from_secs(5))
        .await;
    assert!(allowed.is_ok());
}

#[tokio::test]
async fn test_url_credentials_are_never_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/private.png")
        .match_header("authorization", mockito::Matcher::Missing)
        .with_status(200)
        .with_body(png_bytes())
        .expect(0)
        .create_async()
        .await;

    let host = server.host_with_port();
    let url = format!("http://user:secret@{host}/private.png");
    let report = prober().inspect(&url, Duration::from_secs(5)).await;

    assert_eq!(report.outcome, ProbeOutcome::Failed);
    assert_eq!(report.status_code, None);
    assert!(report
        .error_message
        .as_deref()
        .is_some_and(|message| message.contains("credentials")));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused_is_a_load_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = prober()
        .preload(&format!("http://127.0.0.1:{port}/a.png"), Duration::from_secs(5))
        .await;

    assert!(matches!(result, Err(ProbeError::LoadFailed { .. })));
}

#[tokio::test]
async fn test_check_batch_keeps_order_and_names() {
    let mut server = mockito::Server::new_async().await;
    let _ok = server
        .mock("GET", "/ok.png")
        .with_status(200)
        .with_body(png_bytes())
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/missing.png")
        .with_status(404)
        .create_async()
        .await;

    let timeout = Duration::from_secs(5);
    let targets = vec![
        ProbeTarget::new(format!("{}/ok.png", server.url()), timeout).with_name("hero"),
        ProbeTarget::new(format!("{}/missing.png", server.url()), timeout),
        ProbeTarget::new("", timeout),
    ];

    let reports = prober().check_batch(&targets).await;

    assert_eq!(reports.len(), 3);
    assert!(reports[0].is_available());
    assert_eq!(reports[0].name.as_deref(), Some("hero"));
    let image = reports[0].image.as_ref().unwrap();
    assert_eq!((image.width, image.height), (4, 3));
    assert_eq!(reports[1].outcome, ProbeOutcome::Failed);
    assert_eq!(reports[2].outcome, ProbeOutcome::Failed);
}
