//! Throwaway HTTP backend for driving the client in tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay_ms: u64,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self { status: 200, body: body.to_string(), delay_ms: 0 }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self { status, body: body.to_string(), delay_ms: 0 }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

pub struct MockServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    /// Each path answers with its replies in order; the last one repeats.
    /// Unknown paths get a 404.
    pub fn start(routes: Vec<(&str, Vec<Reply>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut table: HashMap<String, VecDeque<Reply>> = routes
            .into_iter()
            .map(|(path, replies)| (path.to_string(), replies.into_iter().collect()))
            .collect();

        let seen = requests.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(s) => s,
                    Err(_) => continue,
                };

                let mut reader = BufReader::new(&stream);
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                // drain headers so closing the socket doesn't reset the connection
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" || line == "\n" => break,
                        Ok(_) => {}
                    }
                }

                let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
                seen.lock().unwrap().push(target.clone());
                let path = target.split('?').next().unwrap_or("/").to_string();

                let reply = match table.get_mut(&path) {
                    Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                    Some(queue) => queue.front().cloned().unwrap(),
                    None => Reply::raw(404, r#"{"error":"not found"}"#),
                };
                if reply.delay_ms > 0 {
                    thread::sleep(Duration::from_millis(reply.delay_ms));
                }

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.status,
                    reply.body.len(),
                    reply.body
                );
                let mut out = &stream;
                let _ = out.write_all(response.as_bytes());
                let _ = out.flush();
            }
        });

        Self {
            base: format!("http://{}/api", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|t| t.split('?').next() == Some(path))
            .count()
    }
}

pub fn sample_summary() -> Value {
    json!({
        "changepoint": {
            "changepoint_date": "2008-07-11",
            "credible_interval_start": "2008-06-20",
            "credible_interval_end": "2008-08-01",
            "prob_increase": 0.873,
            "mean_before": 0.000412,
            "mean_after": 0.020412,
            "mean_change": 0.02
        },
        "price_summary": {
            "start_date": "1987-05-20",
            "end_date": "2022-11-14",
            "total_observations": 9011
        },
        "key_insights": [],
        "data_quality": { "analysis_date": "2024-01-15" }
    })
}

pub fn sample_prices() -> Value {
    json!({
        "summary": {
            "count": 9011,
            "date_range": "1987-05-20 to 2022-11-14",
            "mean": 48.42,
            "min": 9.1,
            "max": 143.95,
            "std": 32.86
        },
        "dates": ["2022-11-11", "2022-11-14"],
        "prices": [95.99, 93.14]
    })
}

pub fn sample_events() -> Value {
    json!([
        { "Date": "2008-09-15", "Event": "Lehman Brothers collapse", "Category": "Financial Crisis", "Abs_Days_to_CP": 66 },
        { "Date": "2008-12-17", "Event": "OPEC record output cut", "Category": "Oil Market", "Abs_Days_to_CP": 159 }
    ])
}

pub fn sample_correlation(within_1year: u64) -> Value {
    json!({
        "event_correlation": {
            "events_within_1year": within_1year,
            "events_within_2years": within_1year + 1,
            "closest_event_days": 66,
            "total_events": 15,
            "mean_distance_days": 1234.56,
            "events_within_ci": 0
        },
        "nearby_events": [
            { "Date": "2008-09-15", "Event": "Lehman Brothers collapse", "Category": "Financial Crisis", "Abs_Days_to_CP": 66 }
        ],
        "event_impacts": [
            { "event_name": "Lehman Brothers collapse", "price_change_pct": -27.4 }
        ]
    })
}
