use std::collections::BTreeMap;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use tracing::{info, warn};

use crate::config::model::HttpConfig;
use crate::error::NotifyError;
use crate::notify::template::BodyTemplate;
use crate::notify::Notify;
use crate::report::Report;
use crate::types::Event;

/// Webhook notifier: one request per event to that event's URL.
#[derive(Debug)]
pub struct HttpNotifier {
    method: Method,
    urls: BTreeMap<Event, Url>,
    credentials: Option<(String, String)>,
    body: BodyTemplate,
    client: Client,
}

fn parse_method(method: &str) -> Result<Method, NotifyError> {
    match method.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        other => Err(NotifyError::HttpConfig(format!(
            "method {:?} not supported; use GET, POST, or PUT",
            other
        ))),
    }
}

fn parse_url(event: &str, url: &str) -> Result<Url, NotifyError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| NotifyError::HttpConfig(format!("URL {} for {} is invalid: {}", url, event, e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(NotifyError::HttpConfig(format!(
            "URL {} for {} must use http or https",
            url, event
        )));
    }
    Ok(parsed)
}

impl HttpNotifier {
    pub fn new(cfg: &HttpConfig) -> Result<Self, NotifyError> {
        let method = parse_method(&cfg.method)?;
        let mut urls = BTreeMap::new();
        for (event, url) in &cfg.urls {
            let parsed_event = event.parse::<Event>().map_err(NotifyError::HttpConfig)?;
            urls.insert(parsed_event, parse_url(event, url)?);
        }
        let body = if cfg.body.trim().is_empty() {
            BodyTemplate::default()
        } else {
            BodyTemplate::parse(&cfg.body)?
        };
        if cfg.accept_insecure_certs {
            warn!("http notifications accept invalid TLS certificates");
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(cfg.accept_insecure_certs)
            .build()
            .map_err(|e| NotifyError::HttpConfig(format!("build client: {}", e)))?;
        let credentials = if cfg.username.is_empty() {
            None
        } else {
            Some((cfg.username.clone(), cfg.password.clone()))
        };
        Ok(Self {
            method,
            urls,
            credentials,
            body,
            client,
        })
    }

    /// Fails when no URL is configured for `event`.
    pub fn require_url(&self, event: Event) -> Result<&Url, NotifyError> {
        self.urls
            .get(&event)
            .ok_or_else(|| NotifyError::HttpConfig(format!("URL missing for event {}", event)))
    }

    fn sends_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT
    }
}

impl Notify for HttpNotifier {
    fn notify(&self, event: Event, report: &Report) -> Result<(), NotifyError> {
        let url = self.require_url(event)?;
        let mut request = self.client.request(self.method.clone(), url.clone());
        if self.sends_body() {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(self.body.render(event, &report.config_name));
        }
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }
        let response = request.send().map_err(|e| NotifyError::HttpSend {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        info!(
            "http notification sent status={} event={} method={} url={} auth={}",
            status,
            event,
            self.method,
            url,
            self.credentials.is_some()
        );
        if status >= 400 {
            return Err(NotifyError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Answers a single request with `status` and hands the raw request back.
    fn serve_once(status: u16) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            let _ = tx.send(request);
            let response = format!(
                "HTTP/1.1 {} Test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            );
            stream.write_all(response.as_bytes()).expect("respond");
        });
        (format!("http://{}", addr), rx)
    }

    fn config(method: &str, event: &str, url: &str) -> HttpConfig {
        let mut urls = BTreeMap::new();
        urls.insert(event.to_string(), url.to_string());
        HttpConfig {
            method: method.to_string(),
            urls,
            ..HttpConfig::default()
        }
    }

    #[test]
    fn post_sends_rendered_body_with_basic_auth() {
        let (base, requests) = serve_once(200);
        let mut cfg = config("POST", "onSuccess", &format!("{}/hook", base));
        cfg.username = "user".to_string();
        cfg.password = "pass".to_string();
        let notifier = HttpNotifier::new(&cfg).expect("notifier");

        notifier
            .notify(Event::Success, &Report::new("home"))
            .expect("delivered");

        let request = requests.recv().expect("request");
        assert!(request.starts_with("POST /hook HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: basic dxnlcjpwyxnz"));
        assert!(request.contains("\"event\": \"onSuccess\""));
        assert!(request.contains("\"configName\": \"home\""));
    }

    #[test]
    fn get_sends_no_body() {
        let (base, requests) = serve_once(204);
        let notifier = HttpNotifier::new(&config("GET", "onStart", &base)).expect("notifier");
        notifier
            .notify(Event::Start, &Report::new("home"))
            .expect("delivered");
        let request = requests.recv().expect("request");
        assert!(request.starts_with("GET / HTTP/1.1"));
        assert!(!request.contains("configName"));
    }

    #[test]
    fn error_status_is_a_failure() {
        let (base, _requests) = serve_once(500);
        let notifier = HttpNotifier::new(&config("PUT", "onFailure", &base)).expect("notifier");
        let err = notifier
            .notify(Event::Failure, &Report::new("home"))
            .expect_err("500");
        assert!(matches!(err, NotifyError::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn unreachable_server_is_a_send_error() {
        let port = TcpListener::bind("127.0.0.1:0")
            .expect("bind")
            .local_addr()
            .expect("addr")
            .port();
        let url = format!("http://127.0.0.1:{}/", port);
        let notifier = HttpNotifier::new(&config("GET", "onSkip", &url)).expect("notifier");
        let err = notifier
            .notify(Event::Skip, &Report::new("home"))
            .expect_err("refused");
        assert!(matches!(err, NotifyError::HttpSend { .. }));
    }

    #[test]
    fn construction_validates_settings() {
        assert!(HttpNotifier::new(&config("DELETE", "onStart", "http://localhost/")).is_err());
        assert!(HttpNotifier::new(&config("", "onStart", "http://localhost/")).is_err());
        assert!(HttpNotifier::new(&config("GET", "onStart", "not a url")).is_err());
        assert!(HttpNotifier::new(&config("GET", "onStart", "ftp://localhost/")).is_err());
        assert!(HttpNotifier::new(&config("GET", "onBegin", "http://localhost/")).is_err());

        let mut cfg = config("POST", "onStart", "http://localhost/");
        cfg.body = "{{.Nope}}".to_string();
        assert!(matches!(HttpNotifier::new(&cfg), Err(NotifyError::Template(_))));
    }

    #[test]
    fn missing_event_url_is_reported() {
        let notifier = HttpNotifier::new(&config("GET", "onStart", "http://localhost/")).expect("notifier");
        assert!(notifier.require_url(Event::Start).is_ok());
        assert!(notifier.require_url(Event::Failure).is_err());
    }
}
