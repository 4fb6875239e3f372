use std::sync::Mutex;
use std::time::Duration;

use ureq::{Agent, AgentBuilder, Proxy};

use crate::protocol::Event;
use crate::{ClientOptions, Transport};
use argus_core::{argus_debug, get_request_body_from_event};

use super::ratelimit::RateLimiter;
use super::thread::TransportThread;

fn build_agent(options: &ClientOptions) -> Agent {
    let mut builder = AgentBuilder::new()
        .timeout(Duration::from_secs(30))
        .user_agent(&options.user_agent);

    let scheme = options.dsn.as_ref().map(|dsn| dsn.scheme());
    let proxy = match scheme {
        Some(argus_types::Scheme::Http) => options.http_proxy.as_ref(),
        _ => options.https_proxy.as_ref().or(options.http_proxy.as_ref()),
    };
    if let Some(proxy) = proxy {
        match Proxy::new(proxy.as_ref()) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(err) => argus_debug!("invalid proxy {}: {}", proxy, err),
        }
    }

    builder.build()
}

fn endpoint(options: &ClientOptions) -> (String, String) {
    match options.dsn.as_ref() {
        Some(dsn) => (
            dsn.store_api_url(),
            dsn.to_auth(Some(&options.user_agent)).to_string(),
        ),
        // a client never builds a transport without a DSN; a bogus
        // endpoint keeps this total rather than panicking
        None => (String::new(), String::new()),
    }
}

fn post(agent: &Agent, url: &str, auth: &str, event: &Event, mut rl: RateLimiter) -> RateLimiter {
    let body = match get_request_body_from_event(event) {
        Some(body) => body,
        None => return rl,
    };

    let request = agent
        .post(url)
        .set("X-Sentry-Auth", auth)
        .set("Content-Type", "application/json");

    match request.send_bytes(&body) {
        Ok(response) => {
            if let Some(retry_after) = response.header("Retry-After") {
                rl.update_from_retry_after(retry_after);
            }
        }
        Err(ureq::Error::Status(code, response)) => {
            if let Some(retry_after) = response.header("Retry-After") {
                rl.update_from_retry_after(retry_after);
            } else if code == 429 {
                rl.update_from_429();
            }
            argus_debug!("event rejected with status {}", code);
        }
        Err(err) => {
            argus_debug!("could not send event: {}", err);
        }
    }
    rl
}

/// The default HTTP transport: a worker thread draining a bounded
/// queue into `ureq` requests.
pub struct HttpTransport {
    thread: TransportThread,
}

impl HttpTransport {
    /// Creates a new transport for the given options.
    pub fn new(options: &ClientOptions) -> Self {
        let agent = build_agent(options);
        let (url, auth) = endpoint(options);
        let thread =
            TransportThread::new(move |event, rl| post(&agent, &url, &auth, &event, rl));
        Self { thread }
    }
}

impl Transport for HttpTransport {
    fn send_event(&self, event: Event) {
        self.thread.send(event)
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.thread.flush(timeout)
    }

    fn shutdown(&self, timeout: Duration) -> bool {
        self.thread.shutdown(timeout)
    }
}

/// A transport that sends each event on the caller's thread.
///
/// Useful for short-lived processes (cron jobs, CLI tools) where the
/// process may exit before a background worker gets to run.
pub struct BlockingHttpTransport {
    agent: Agent,
    url: String,
    auth: String,
    limiter: Mutex<RateLimiter>,
}

impl BlockingHttpTransport {
    /// Creates a new transport for the given options.
    pub fn new(options: &ClientOptions) -> Self {
        let (url, auth) = endpoint(options);
        Self {
            agent: build_agent(options),
            url,
            auth,
            limiter: Mutex::new(RateLimiter::new()),
        }
    }
}

impl Transport for BlockingHttpTransport {
    fn send_event(&self, event: Event) {
        let mut limiter = match self.limiter.lock() {
            Ok(limiter) => limiter,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(time_left) = limiter.is_disabled() {
            argus_debug!(
                "discarding event, rate limited for {}s",
                time_left.as_secs()
            );
            return;
        }
        let rl = std::mem::take(&mut *limiter);
        *limiter = post(&self.agent, &self.url, &self.auth, &event, rl);
    }

    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}
