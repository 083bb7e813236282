//! Metadata-only length lookup for remote resources.

use std::time::Duration;

use tracing::debug;
use url::Url;

/// Whether `value` names a remote resource this crate can size with `HEAD`.
pub fn is_remote_reference(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Issue a `HEAD` request for `c_url` and return its `Content-Length`.
///
/// Redirects are followed. A non-2xx final status, a missing header or any
/// transport failure gives `None`.
pub fn head_content_length(c_url: &str, duration_timeout: Duration) -> Option<u64> {
    if !is_remote_reference(c_url) {
        debug!(url = c_url, "remote length skipped: not an http(s) url");
        return None;
    }

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(duration_timeout)
        .timeout_read(duration_timeout)
        .timeout_write(duration_timeout)
        .user_agent("filekit")
        .build();
    let response = match agent.head(c_url).call() {
        Ok(v) => v,
        Err(ureq::Error::Status(n_status, _)) => {
            debug!(url = c_url, status = n_status, "remote length rejected");
            return None;
        }
        Err(e) => {
            debug!(url = c_url, error = %e, "remote length request failed");
            return None;
        }
    };
    if !(200..300).contains(&response.status()) {
        debug!(url = c_url, status = response.status(), "remote length rejected");
        return None;
    }
    response
        .header("Content-Length")
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use std::time::Duration;

    use super::{is_remote_reference, head_content_length};

    fn serve_once(raw_response: &'static [u8]) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let n_port = listener.local_addr().expect("addr").port();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut raw_request = Vec::new();
            let mut raw_chunk = [0_u8; 256];
            while !raw_request.ends_with(b"\r\n\r\n") {
                let n_read = stream.read(&mut raw_chunk).expect("read request");
                if n_read == 0 {
                    break;
                }
                raw_request.extend_from_slice(&raw_chunk[..n_read]);
            }
            stream.write_all(raw_response).expect("write response");
            String::from_utf8_lossy(&raw_request).to_string()
        });
        (n_port, handle)
    }

    #[test]
    fn remote_reference_detection() {
        assert!(is_remote_reference("http://example.com/LICENSE"));
        assert!(is_remote_reference("https://example.com/LICENSE"));
        assert!(!is_remote_reference("/tmp/file.txt"));
        assert!(!is_remote_reference("C:\\data\\file.txt"));
    }

    #[test]
    fn head_request_reads_content_length() {
        let (n_port, handle) = serve_once(
            b"HTTP/1.1 200 OK\r\ncontent-LENGTH: 4096\r\nConnection: close\r\n\r\n",
        );

        let n_len = head_content_length(
            &format!("http://127.0.0.1:{n_port}/LICENSE?rev=1"),
            Duration::from_secs(5),
        );
        let c_request = handle.join().expect("server thread");
        assert_eq!(n_len, Some(4096));
        assert!(c_request.starts_with("HEAD /LICENSE?rev=1 HTTP/1.1\r\n"));
    }

    #[test]
    fn error_status_and_missing_header_give_none() {
        let (n_port, handle) = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\n",
        );
        let n_len =
            head_content_length(&format!("http://127.0.0.1:{n_port}/x"), Duration::from_secs(5));
        handle.join().expect("server thread");
        assert_eq!(n_len, None);

        let (n_port, handle) =
            serve_once(b"HTTP/1.1 200 OK\r\nServer: x\r\nConnection: close\r\n\r\n");
        let n_len =
            head_content_length(&format!("http://127.0.0.1:{n_port}/x"), Duration::from_secs(5));
        handle.join().expect("server thread");
        assert_eq!(n_len, None);
    }

    #[test]
    fn unreachable_hosts_and_local_paths_give_none() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let n_port = listener.local_addr().expect("addr").port();
        drop(listener);
        assert_eq!(
            head_content_length(
                &format!("http://127.0.0.1:{n_port}/x"),
                Duration::from_millis(200)
            ),
            None
        );
        assert_eq!(
            head_content_length(
                &format!("https://127.0.0.1:{n_port}/x"),
                Duration::from_millis(200)
            ),
            None
        );
        assert_eq!(head_content_length("/tmp/file.txt", Duration::from_millis(200)), None);
    }
}
