//! In-memory [`Transport`] with scripted responses.

use crate::fetch::{RawResponse, Transport, TransportError};
use crate::signature::RequestSignature;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
enum Scripted {
    Response(RawResponse),
    Failure(String),
}

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Scripted>,
    requests: usize,
}

/// Replays queued responses per URL.
///
/// Each request pops the next scripted reply for its URL; the last reply is
/// repeated once the queue is down to one. A URL with no script gets a
/// transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response.
    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        self.with_response(url, RawResponse::ok(body))
    }

    pub fn with_response(self, url: &str, response: RawResponse) -> Self {
        self.push(url, Scripted::Response(response));
        self
    }

    /// Queue a transport-level failure (no response at all).
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.push(url, Scripted::Failure(message.to_string()));
        self
    }

    /// Queue a reply after construction, e.g. between two runs.
    pub fn push_page(&self, url: &str, body: impl Into<String>) {
        self.push(url, Scripted::Response(RawResponse::ok(body)));
    }

    fn push(&self, url: &str, reply: Scripted) {
        self.scripts
            .lock()
            .entry(normalize(url))
            .or_default()
            .queue
            .push_back(reply);
    }

    /// Requests sent to `url` so far.
    pub fn request_count(&self, url: &str) -> usize {
        self.scripts
            .lock()
            .get(&normalize(url))
            .map_or(0, |script| script.requests)
    }

    /// Every requested URL, in order.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn total_requests(&self) -> usize {
        self.log.lock().len()
    }
}

fn normalize(url: &str) -> String {
    RequestSignature::parse(url)
        .map(|sig| sig.as_str().to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl Transport for ScriptedTransport {
    fn send(&self, signature: &RequestSignature) -> Result<RawResponse, TransportError> {
        let url = signature.as_str();
        self.log.lock().push(url.to_string());

        let mut scripts = self.scripts.lock();
        let script = scripts.entry(url.to_string()).or_default();
        script.requests += 1;

        let reply = if script.queue.len() > 1 {
            script.queue.pop_front()
        } else {
            script.queue.front().cloned()
        };

        match reply {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(TransportError::new(url, message)),
            None => Err(TransportError::new(url, "no scripted response")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://fbref.com/en/comps/";

    #[test]
    fn test_last_reply_repeats() {
        let transport = ScriptedTransport::new()
            .with_response(URL, RawResponse::with_status(503, ""))
            .with_page(URL, "ok");
        let sig = RequestSignature::parse(URL).unwrap();

        assert_eq!(transport.send(&sig).unwrap().status, 503);
        assert_eq!(transport.send(&sig).unwrap().body, "ok");
        assert_eq!(transport.send(&sig).unwrap().body, "ok");
        assert_eq!(transport.request_count(URL), 3);
    }

    #[test]
    fn test_unscripted_url_fails() {
        let transport = ScriptedTransport::new();
        let sig = RequestSignature::parse("https://fbref.com/en/players/").unwrap();
        assert!(transport.send(&sig).is_err());
        assert_eq!(transport.requests(), vec!["https://fbref.com/en/players/"]);
    }

    #[test]
    fn test_urls_are_normalized() {
        let transport = ScriptedTransport::new().with_page("https://FBREF.com/en/comps/#x", "ok");
        let sig = RequestSignature::parse(URL).unwrap();
        assert!(transport.send(&sig).is_ok());
        assert_eq!(transport.request_count(URL), 1);
    }
}
