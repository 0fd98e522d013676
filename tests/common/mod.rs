#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once per test binary.
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Minimal HTTP/1.1 client for integration tests.
    ///
    /// Sends one request and reads until the declared content-length is
    /// satisfied, so it works whether or not the server closes the
    /// connection afterwards.
    pub fn send_request(
        addr: SocketAddr,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> (u16, String) {
        let mut stream = TcpStream::connect(addr).expect("connect to test server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set read timeout");

        let mut request = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
        for (name, value) in headers {
            request.push_str(&format!("{name}: {value}\r\n"));
        }
        request.push_str(&format!(
            "Content-Length: {}\r\n\r\n",
            body.map(str::len).unwrap_or(0)
        ));
        if let Some(body) = body {
            request.push_str(body);
        }
        stream
            .write_all(request.as_bytes())
            .expect("write request");

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        while !response_complete(&buf) {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(_) => break,
            }
        }
        parse_response(&buf)
    }

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    fn content_length(head: &str) -> usize {
        head.lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.trim().eq_ignore_ascii_case("content-length") {
                    value.trim().parse().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0)
    }

    fn response_complete(buf: &[u8]) -> bool {
        match header_end(buf) {
            Some(end) => {
                let head = String::from_utf8_lossy(&buf[..end]);
                buf.len() >= end + 4 + content_length(&head)
            }
            None => false,
        }
    }

    fn parse_response(buf: &[u8]) -> (u16, String) {
        let end = header_end(buf).unwrap_or(buf.len());
        let head = String::from_utf8_lossy(&buf[..end]);
        let status = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let body_start = (end + 4).min(buf.len());
        let length = content_length(&head).min(buf.len() - body_start);
        let body = String::from_utf8_lossy(&buf[body_start..body_start + length]).to_string();
        (status, body)
    }
}

pub mod fixtures {
    use checkroute::dispatcher::{HandlerRequest, HandlerResponse, HeaderVec};
    use checkroute::ids::RequestId;
    use checkroute::router::ParamVec;
    use http::Method;
    use may::sync::mpsc;
    use serde_json::Value;
    use std::sync::Arc;

    /// Build a request fixture plus the receiving end of its reply channel.
    pub fn handler_request(
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (HandlerRequest, mpsc::Receiver<HandlerResponse>) {
        let (reply_tx, reply_rx) = mpsc::channel();
        (
            HandlerRequest {
                request_id: RequestId::new(),
                method,
                path: path.to_string(),
                handler_name: "test_handler".to_string(),
                path_params: ParamVec::new(),
                query_params: ParamVec::new(),
                headers: HeaderVec::new(),
                body,
                error_hook: None,
                reply_tx,
            },
            reply_rx,
        )
    }

    /// Append a name/value pair to a param or header vector.
    pub fn push_pair(params: &mut ParamVec, name: &str, value: &str) {
        params.push((Arc::from(name), value.to_string()));
    }
}
