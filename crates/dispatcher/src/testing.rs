//! Test doubles shared by the target and dispatcher tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use contracts::{ContractError, Reading, ReadingSnapshot, DEFAULT_MAX_AGE};

use crate::transport::{HttpResponse, HttpTransport, OutboundRequest};

/// Scripted reply for one request
#[derive(Debug, Clone)]
pub enum MockReply {
    Status(u16, String),
    Fail(String),
}

/// Records requests and answers from a queue; `200 ""` once the queue is empty
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: MockReply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpTransport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, ContractError> {
        let target = request.target.clone();
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(HttpResponse {
                status: 200,
                body: String::new(),
            }),
            Some(MockReply::Status(status, body)) => Ok(HttpResponse { status, body }),
            Some(MockReply::Fail(message)) => Err(ContractError::transport(target, message)),
        }
    }
}

/// A reading last seen `age_secs` before `now`
pub fn reading(color: &str, now: DateTime<Utc>, age_secs: i64) -> Reading {
    let mut reading = Reading::new(color, now - TimeDelta::seconds(age_secs));
    reading.gravity = Some(1.012);
    reading.temp = Some(68.0);
    reading.smoothed_gravity = Some(1.0123);
    reading.smoothed_temp = Some(68.04);
    reading.rssi = Some(-71);
    reading.weeks_on_battery = Some(4.0);
    reading
}

/// Snapshot captured at `now` with the default staleness window
pub fn snapshot(now: DateTime<Utc>, readings: impl IntoIterator<Item = Reading>) -> ReadingSnapshot {
    ReadingSnapshot::captured_at(readings, DEFAULT_MAX_AGE, now)
}
