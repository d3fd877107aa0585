use charitygate::upstream::{Transport, TransportError, UpstreamRequest, UpstreamResponse};
use charitygate::{
    CharityGateway, InstantSleeper, ManualClock, SlidingWindowLimiter, TrackingSleeper,
    UpstreamClient, UpstreamConfig,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One scripted outcome for [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    NetworkError(&'static str),
    Timeout,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Reply::Status(status, body.to_string())
    }

    pub fn status(status: u16) -> Self {
        Reply::Status(status, format!("{{\"error\":\"status {status}\"}}"))
    }
}

/// Transport that replays queued replies and records every request it sees.
///
/// When the queue runs dry the last reply repeats, so "always fails with 500" needs only one
/// entry.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    last: Arc<Mutex<Option<Reply>>>,
    seen: Arc<Mutex<Vec<UpstreamRequest>>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        let transport = Self::default();
        transport.replies.lock().extend(replies);
        transport
    }

    pub fn always(reply: Reply) -> Self {
        Self::new([reply])
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.seen.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        self.seen.lock().push(request.clone());
        let reply = {
            let mut queue = self.replies.lock();
            let mut last = self.last.lock();
            match queue.pop_front() {
                Some(reply) => {
                    *last = Some(reply.clone());
                    reply
                }
                None => last.clone().expect("ScriptedTransport has no replies"),
            }
        };
        match reply {
            Reply::Status(status, body) => Ok(UpstreamResponse::new(status, body)),
            Reply::NetworkError(message) => Err(TransportError::network(message)),
            Reply::Timeout => Err(TransportError::Timeout(Duration::from_secs(30))),
        }
    }
}

pub fn upstream_config(max_retries: u32, retry_base_delay_ms: u64) -> UpstreamConfig {
    UpstreamConfig {
        max_retries,
        retry_base_delay_ms,
        ..UpstreamConfig::new("http://upstream.test/api")
    }
}

/// Client over `transport` whose waits are recorded instead of slept.
pub fn tracked_client(
    transport: ScriptedTransport,
    max_retries: u32,
    retry_base_delay_ms: u64,
) -> (UpstreamClient, TrackingSleeper) {
    let sleeper = TrackingSleeper::new();
    let client = UpstreamClient::builder(upstream_config(max_retries, retry_base_delay_ms))
        .transport(transport)
        .sleeper(sleeper.clone())
        .build()
        .expect("client builds");
    (client, sleeper)
}

/// Gateway over `transport` with a manual clock.
pub fn gateway(
    transport: ScriptedTransport,
    window: Duration,
    max_requests: u32,
) -> (CharityGateway, ManualClock) {
    let clock = ManualClock::new(1_717_200_000_000); // 2024-06-01T00:00:00Z
    let client = UpstreamClient::builder(upstream_config(2, 100))
        .transport(transport)
        .sleeper(InstantSleeper)
        .build()
        .expect("client builds");
    let limiter = SlidingWindowLimiter::new(window, max_requests).with_clock(clock.clone());
    (CharityGateway::new(Arc::new(client), Arc::new(limiter)), clock)
}
