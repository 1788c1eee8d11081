//! Scripted in-memory transport for behavior tests
//!
//! Replies are queued per request path and consumed in dispatch order.
//! A gated reply resolves only when the test fires its oneshot sender,
//! which is how tests control the resolution order of overlapping
//! requests. A repeat reply answers any dispatch whose queue is empty,
//! for endpoints polled an unbounded number of times.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::oneshot;

use super::errors::{FetchError, FetchResult};
use super::http::{ApiRequest, FetchFuture, Fetcher};

enum Reply {
    Now(FetchResult<Value>),
    Gated(oneshot::Receiver<FetchResult<Value>>),
}

pub(crate) struct ScriptedFetcher {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    repeats: Mutex<HashMap<String, FetchResult<Value>>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            repeats: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Queue one reply for `path`.
    pub fn push(&self, path: &str, result: FetchResult<Value>) {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Reply::Now(result));
    }

    /// Queue a reply for `path` that stays pending until the returned
    /// sender fires.
    pub fn push_gate(&self, path: &str) -> oneshot::Sender<FetchResult<Value>> {
        let (tx, rx) = oneshot::channel();
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Reply::Gated(rx));
        tx
    }

    /// Answer for any dispatch to `path` once its queue runs out.
    pub fn set_repeat(&self, path: &str, result: FetchResult<Value>) {
        self.repeats
            .lock()
            .unwrap()
            .insert(path.to_string(), result);
    }

    /// Paths of every dispatched request, in order.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

impl Fetcher for ScriptedFetcher {
    fn dispatch(&self, request: ApiRequest) -> FetchFuture {
        self.log.lock().unwrap().push(request.path.clone());
        let queued = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(|queue| queue.pop_front());
        let reply = match queued {
            Some(reply) => reply,
            None => match self.repeats.lock().unwrap().get(&request.path) {
                Some(result) => Reply::Now(result.clone()),
                None => Reply::Now(Err(FetchError::network(format!(
                    "no scripted reply for {}",
                    request.path
                )))),
            },
        };
        Box::pin(async move {
            match reply {
                Reply::Now(result) => result,
                Reply::Gated(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::network("reply gate dropped"))),
            }
        })
    }
}
