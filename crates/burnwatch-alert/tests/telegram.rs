//! Telegram delivery against a local HTTP stub.

use std::time::Duration;

use burnwatch_alert::{Notifier, NotifyError, TelegramConfig, TelegramNotifier};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one request with `status` and `body`; yields the raw request.
async fn stub(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = sock.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + length || n == 0 {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&raw).to_string()
    });
    (url, handle)
}

fn notifier(api_url: String) -> TelegramNotifier {
    TelegramNotifier::new(TelegramConfig {
        api_url,
        bot_token: "123:abc".into(),
        chat_id: "-1001".into(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn posts_html_form_to_send_message() {
    let (url, server) = stub("200 OK", r#"{"ok":true}"#).await;

    notifier(url).notify("<b>burn</b> & more").await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /bot123:abc/sendMessage HTTP/1.1"));
    assert!(request.contains("application/x-www-form-urlencoded"));
    assert!(request.contains("chat_id=-1001"));
    assert!(request.contains("text=%3Cb%3Eburn%3C%2Fb%3E+%26+more"));
    assert!(request.contains("parse_mode=HTML"));
    assert!(request.contains("disable_web_page_preview=true"));
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let (url, server) = stub(
        "400 Bad Request",
        r#"{"ok":false,"description":"Bad Request: chat not found"}"#,
    )
    .await;

    let err = notifier(url).notify("hello").await.unwrap_err();
    server.await.unwrap();
    match err {
        NotifyError::Api { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("chat not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
