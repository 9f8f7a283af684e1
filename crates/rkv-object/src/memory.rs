use std::collections::HashMap;
use std::sync::Mutex;

use rkv_types::{Metadata, Quorum, VectorClock, VersionTag};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{TransportError, TransportResult};
use crate::response::{Content, ObjectResponse};
use crate::transport::{DeleteRequest, GetRequest, PutReply, PutRequest, Transport};

/// A request seen by [`InMemoryTransport`], in issue order.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportCall {
    Put {
        bucket: String,
        key: Option<String>,
        w: Quorum,
        dw: Quorum,
        return_body: bool,
    },
    Get {
        bucket: String,
        key: String,
        r: Quorum,
        vtag: Option<VersionTag>,
    },
    Delete {
        bucket: String,
        key: String,
        rw: Quorum,
    },
    MapReduce {
        job: Value,
    },
}

#[derive(Clone, Debug)]
struct StoredVersion {
    vtag: VersionTag,
    metadata: Metadata,
    value: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
struct StoredKey {
    clock: u64,
    versions: Vec<StoredVersion>,
}

impl StoredKey {
    fn vclock(&self, key: &str) -> VectorClock {
        VectorClock::new(format!("{key}@{}", self.clock))
    }

    fn contents(&self) -> Vec<Content> {
        self.versions
            .iter()
            .map(|v| Content::new(v.metadata.clone(), v.value.clone()))
            .collect()
    }
}

#[derive(Default)]
struct State {
    keys: HashMap<(String, String), StoredKey>,
    next_version: u64,
    calls: Vec<TransportCall>,
    fail_next: Option<TransportError>,
}

/// Single-process transport holding every key in memory.
///
/// Intended for tests and the CLI simulation. It keeps a version list per
/// key and plays the server side of causality: a write carrying the key's
/// current vector clock replaces every version, any other write either
/// becomes a new sibling (`allow_mult`) or wins outright.
///
/// Every request is logged, and a failure can be queued for the next one.
pub struct InMemoryTransport {
    state: Mutex<State>,
    allow_mult: bool,
    sibling_tags: bool,
}

impl InMemoryTransport {
    /// A last-write-wins transport with no keys.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            allow_mult: false,
            sibling_tags: false,
        }
    }

    /// Keep concurrent writes as siblings instead of overwriting.
    pub fn with_allow_mult(mut self, allow_mult: bool) -> Self {
        self.allow_mult = allow_mult;
        self
    }

    /// Answer conflicted reads with version tags only, so each sibling must
    /// be fetched on its own.
    pub fn with_sibling_tags(mut self, sibling_tags: bool) -> Self {
        self.sibling_tags = sibling_tags;
        self
    }

    /// Make the next request fail with `err`. The request is still logged.
    pub fn fail_next(&self, err: TransportError) {
        self.state.lock().expect("lock poisoned").fail_next = Some(err);
    }

    /// Every request issued so far.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().expect("lock poisoned").calls.clone()
    }

    pub fn put_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Put { .. }))
    }

    pub fn get_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Get { .. }))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Delete { .. }))
    }

    /// Number of versions stored under a key; zero when absent.
    pub fn version_count(&self, bucket: &str, key: &str) -> usize {
        self.state
            .lock()
            .expect("lock poisoned")
            .keys
            .get(&(bucket.to_string(), key.to_string()))
            .map_or(0, |k| k.versions.len())
    }

    /// Number of keys across all buckets.
    pub fn len(&self) -> usize {
        self.state.lock().expect("lock poisoned").keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.state
            .lock()
            .expect("lock poisoned")
            .calls
            .iter()
            .filter(|c| pred(c))
            .count()
    }

    /// Log `call`, then surface a queued failure if there is one.
    fn begin(state: &mut State, call: TransportCall) -> TransportResult<()> {
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InMemoryTransport {
    fn put(&self, request: &PutRequest) -> TransportResult<PutReply> {
        let mut state = self.state.lock().expect("lock poisoned");
        Self::begin(
            &mut state,
            TransportCall::Put {
                bucket: request.bucket.clone(),
                key: request.key.clone(),
                w: request.w,
                dw: request.dw,
                return_body: request.return_body,
            },
        )?;

        let assigned = request.key.is_none();
        let key = request
            .key
            .clone()
            .unwrap_or_else(|| Uuid::now_v7().simple().to_string());

        state.next_version += 1;
        let vtag = VersionTag::new(format!("{key}.v{}", state.next_version));
        let mut metadata = request.metadata.clone();
        metadata.vtag = Some(vtag.clone());
        let version = StoredVersion {
            vtag,
            metadata,
            value: request.value.clone(),
        };

        let entry = state.keys.entry((request.bucket.clone(), key.clone())).or_default();
        let descends = request.vclock.as_ref() == Some(&entry.vclock(&key));
        if entry.versions.is_empty() || descends || !self.allow_mult {
            entry.versions = vec![version];
        } else {
            entry.versions.push(version);
        }
        entry.clock += 1;
        debug!(
            bucket = %request.bucket,
            %key,
            descends,
            versions = entry.versions.len(),
            "stored version"
        );

        let body = request.return_body.then(|| ObjectResponse::Versions {
            vclock: entry.vclock(&key),
            contents: entry.contents(),
        });
        Ok(PutReply {
            key: assigned.then_some(key),
            body,
        })
    }

    fn get(&self, request: &GetRequest) -> TransportResult<ObjectResponse> {
        let mut state = self.state.lock().expect("lock poisoned");
        Self::begin(
            &mut state,
            TransportCall::Get {
                bucket: request.bucket.clone(),
                key: request.key.clone(),
                r: request.r,
                vtag: request.vtag.clone(),
            },
        )?;

        let Some(entry) = state.keys.get(&(request.bucket.clone(), request.key.clone())) else {
            return Ok(ObjectResponse::NotFound);
        };
        let vclock = entry.vclock(&request.key);

        if let Some(vtag) = &request.vtag {
            return Ok(entry
                .versions
                .iter()
                .find(|v| &v.vtag == vtag)
                .map_or(ObjectResponse::NotFound, |v| {
                    ObjectResponse::single(vclock, Content::new(v.metadata.clone(), v.value.clone()))
                }));
        }

        if self.sibling_tags && entry.versions.len() > 1 {
            return Ok(ObjectResponse::Siblings(
                entry.versions.iter().map(|v| v.vtag.clone()).collect(),
            ));
        }
        Ok(ObjectResponse::Versions {
            vclock,
            contents: entry.contents(),
        })
    }

    fn delete(&self, request: &DeleteRequest) -> TransportResult<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        Self::begin(
            &mut state,
            TransportCall::Delete {
                bucket: request.bucket.clone(),
                key: request.key.clone(),
                rw: request.rw,
            },
        )?;
        state
            .keys
            .remove(&(request.bucket.clone(), request.key.clone()));
        Ok(())
    }

    /// Answers every job as an identity map: one `[bucket, key, value]`
    /// triple per key input that is stored, values as UTF-8 text. Bucket
    /// inputs list every key of the bucket.
    fn map_reduce(&self, job: &Value) -> TransportResult<Value> {
        let mut state = self.state.lock().expect("lock poisoned");
        Self::begin(&mut state, TransportCall::MapReduce { job: job.clone() })?;

        let mut targets: Vec<(String, String)> = match &job["inputs"] {
            Value::String(bucket) => state
                .keys
                .keys()
                .filter(|(b, _)| b == bucket)
                .cloned()
                .collect(),
            Value::Array(inputs) => inputs
                .iter()
                .filter_map(|input| {
                    let bucket = input.get(0)?.as_str()?;
                    let key = input.get(1)?.as_str()?;
                    Some((bucket.to_string(), key.to_string()))
                })
                .collect(),
            other => {
                return Err(TransportError::Protocol(format!(
                    "unsupported map/reduce inputs: {other}"
                )))
            }
        };
        if job["inputs"].is_string() {
            targets.sort();
        }

        let results = targets
            .into_iter()
            .filter_map(|(bucket, key)| {
                let entry = state.keys.get(&(bucket.clone(), key.clone()))?;
                let value = entry.versions.first()?;
                Some(json!([bucket, key, String::from_utf8_lossy(&value.value)]))
            })
            .collect();
        Ok(Value::Array(results))
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        f.debug_struct("InMemoryTransport")
            .field("key_count", &state.keys.len())
            .field("call_count", &state.calls.len())
            .field("allow_mult", &self.allow_mult)
            .field("sibling_tags", &self.sibling_tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(key: Option<&str>, vclock: Option<VectorClock>, value: &str) -> PutRequest {
        PutRequest {
            bucket: "b".into(),
            key: key.map(str::to_string),
            vclock,
            metadata: Metadata::with_content_type("text/plain"),
            value: value.as_bytes().to_vec(),
            w: Quorum::Default,
            dw: Quorum::Default,
            return_body: true,
        }
    }

    fn get(key: &str, vtag: Option<VersionTag>) -> GetRequest {
        GetRequest {
            bucket: "b".into(),
            key: key.into(),
            r: Quorum::Default,
            vtag,
        }
    }

    fn vclock_of(reply: &PutReply) -> VectorClock {
        match &reply.body {
            Some(ObjectResponse::Versions { vclock, .. }) => vclock.clone(),
            other => panic!("expected versions, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    #[test]
    fn new_store_is_empty() {
        let transport = InMemoryTransport::new();
        assert!(transport.is_empty());
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn put_then_get() {
        let transport = InMemoryTransport::new();
        transport.put(&put(Some("k"), None, "v")).unwrap();
        match transport.get(&get("k", None)).unwrap() {
            ObjectResponse::Versions { contents, .. } => {
                assert_eq!(contents.len(), 1);
                assert_eq!(contents[0].value, b"v");
                assert!(contents[0].metadata.vtag.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn put_without_key_assigns_one() {
        let transport = InMemoryTransport::new();
        let reply = transport.put(&put(None, None, "v")).unwrap();
        let key = reply.key.expect("assigned key");
        assert_eq!(transport.version_count("b", &key), 1);

        let reply = transport.put(&put(Some("named"), None, "v")).unwrap();
        assert!(reply.key.is_none());
    }

    #[test]
    fn descending_write_replaces_siblings() {
        let transport = InMemoryTransport::new().with_allow_mult(true);
        transport.put(&put(Some("k"), None, "a")).unwrap();
        let reply = transport.put(&put(Some("k"), None, "b")).unwrap();
        assert_eq!(transport.version_count("b", "k"), 2);

        transport.put(&put(Some("k"), Some(vclock_of(&reply)), "merged")).unwrap();
        assert_eq!(transport.version_count("b", "k"), 1);
    }

    #[test]
    fn last_write_wins_without_allow_mult() {
        let transport = InMemoryTransport::new();
        transport.put(&put(Some("k"), None, "a")).unwrap();
        transport.put(&put(Some("k"), None, "b")).unwrap();
        assert_eq!(transport.version_count("b", "k"), 1);
    }

    #[test]
    fn stale_vclock_makes_a_sibling() {
        let transport = InMemoryTransport::new().with_allow_mult(true);
        let first = transport.put(&put(Some("k"), None, "a")).unwrap();
        transport.put(&put(Some("k"), Some(vclock_of(&first)), "b")).unwrap();
        transport.put(&put(Some("k"), Some(vclock_of(&first)), "c")).unwrap();
        assert_eq!(transport.version_count("b", "k"), 2);
    }

    #[test]
    fn no_body_unless_requested() {
        let transport = InMemoryTransport::new();
        let mut request = put(Some("k"), None, "v");
        request.return_body = false;
        assert!(transport.put(&request).unwrap().body.is_none());
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[test]
    fn get_missing_is_not_found() {
        let transport = InMemoryTransport::new();
        assert_eq!(transport.get(&get("nope", None)).unwrap(), ObjectResponse::NotFound);
    }

    #[test]
    fn sibling_tags_mode_lists_tags() {
        let transport = InMemoryTransport::new()
            .with_allow_mult(true)
            .with_sibling_tags(true);
        transport.put(&put(Some("k"), None, "a")).unwrap();
        transport.put(&put(Some("k"), None, "b")).unwrap();

        let ObjectResponse::Siblings(tags) = transport.get(&get("k", None)).unwrap() else {
            panic!("expected tags");
        };
        assert_eq!(tags.len(), 2);

        match transport.get(&get("k", Some(tags[1].clone()))).unwrap() {
            ObjectResponse::Versions { contents, .. } => assert_eq!(contents[0].value, b"b"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            transport.get(&get("k", Some(VersionTag::from("gone")))).unwrap(),
            ObjectResponse::NotFound
        );
    }

    // -----------------------------------------------------------------------
    // Deletes, failures, call log
    // -----------------------------------------------------------------------

    #[test]
    fn delete_removes_key() {
        let transport = InMemoryTransport::new();
        transport.put(&put(Some("k"), None, "v")).unwrap();
        transport
            .delete(&DeleteRequest {
                bucket: "b".into(),
                key: "k".into(),
                rw: Quorum::All,
            })
            .unwrap();
        assert!(transport.is_empty());
        assert_eq!(transport.delete_count(), 1);
    }

    #[test]
    fn queued_failure_hits_only_the_next_call() {
        let transport = InMemoryTransport::new();
        transport.fail_next(TransportError::Unavailable("down".into()));
        let err = transport.put(&put(Some("k"), None, "v")).unwrap_err();
        assert_eq!(err, TransportError::Unavailable("down".into()));
        assert!(transport.is_empty());

        transport.put(&put(Some("k"), None, "v")).unwrap();
        assert_eq!(transport.put_count(), 2);
    }

    #[test]
    fn calls_are_logged_in_order() {
        let transport = InMemoryTransport::new();
        transport.put(&put(Some("k"), None, "v")).unwrap();
        transport.get(&get("k", None)).unwrap();
        let calls = transport.calls();
        assert!(matches!(calls[0], TransportCall::Put { .. }));
        assert!(matches!(calls[1], TransportCall::Get { .. }));
        assert_eq!(transport.get_count(), 1);
    }

    // -----------------------------------------------------------------------
    // Map/reduce
    // -----------------------------------------------------------------------

    #[test]
    fn map_reduce_echoes_stored_inputs() {
        let transport = InMemoryTransport::new();
        transport.put(&put(Some("k"), None, "v")).unwrap();
        let job = json!({"inputs": [["b", "k"], ["b", "missing"]], "query": []});
        let result = transport.map_reduce(&job).unwrap();
        assert_eq!(result, json!([["b", "k", "v"]]));
    }

    #[test]
    fn map_reduce_over_bucket() {
        let transport = InMemoryTransport::new();
        transport.put(&put(Some("y"), None, "2")).unwrap();
        transport.put(&put(Some("x"), None, "1")).unwrap();
        let result = transport.map_reduce(&json!({"inputs": "b", "query": []})).unwrap();
        assert_eq!(result, json!([["b", "x", "1"], ["b", "y", "2"]]));
    }

    #[test]
    fn map_reduce_rejects_bad_inputs() {
        let transport = InMemoryTransport::new();
        let err = transport.map_reduce(&json!({"inputs": 7})).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn debug_format() {
        let transport = InMemoryTransport::new().with_allow_mult(true);
        let debug = format!("{transport:?}");
        assert!(debug.contains("InMemoryTransport"));
        assert!(debug.contains("allow_mult: true"));
    }
}
