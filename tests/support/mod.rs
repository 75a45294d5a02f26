#![allow(dead_code)]

use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is json")
    }
}

/// Local stand-in for the blog API. Every request is recorded and answered by `handler`.
pub struct Backend {
    server: Arc<Server>,
    requests: Receiver<Recorded>,
    pub base_url: String,
}

impl Backend {
    pub fn start<F>(handler: F) -> Backend
    where
        F: Fn(&Recorded) -> (u16, String) + Send + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind fake backend"));
        let addr = server.server_addr().to_ip().expect("tcp listener");
        let (tx, requests) = unbounded();

        let worker = server.clone();
        thread::spawn(move || {
            for mut request in worker.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let recorded = Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                    body,
                };
                let (status, payload) = handler(&recorded);
                let _ = tx.send(recorded);
                let response = Response::from_string(payload)
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .expect("valid header"),
                    );
                let _ = request.respond(response);
            }
        });

        Backend {
            server,
            requests,
            base_url: format!("http://{addr}/api"),
        }
    }

    pub fn next_request(&self) -> Recorded {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("backend received a request")
    }

    pub fn drain(&self) -> Vec<Recorded> {
        self.requests.try_iter().collect()
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

pub fn post_json(id: &str, title: &str, category: &str) -> serde_json::Value {
    serde_json::json!({
        "_id": id,
        "title": title,
        "subTitle": format!("About {title}"),
        "description": format!("<p>{title} body</p>"),
        "image": "",
        "category": category,
        "createdAt": "2026-10-01T12:00:00Z",
    })
}
