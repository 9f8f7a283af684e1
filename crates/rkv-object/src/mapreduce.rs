//! Assembly of map/reduce jobs.
//!
//! A job is a set of inputs (explicit keys or a whole bucket) followed by
//! an ordered list of phases. The builder only renders the job as JSON;
//! running it is the transport's business.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::{ObjectError, ObjectResult};
use crate::object::DataObject;

/// Code run by a map or reduce phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Function {
    /// Inline JavaScript source.
    JavaScriptSource(String),
    /// A JavaScript function already loaded on the server, e.g.
    /// `Riak.mapValuesJson`.
    JavaScriptNamed(String),
    /// An Erlang function by module and name.
    Erlang { module: String, function: String },
}

impl Function {
    pub fn js_source(source: impl Into<String>) -> Self {
        Self::JavaScriptSource(source.into())
    }

    pub fn js_named(name: impl Into<String>) -> Self {
        Self::JavaScriptNamed(name.into())
    }

    pub fn erlang(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self::Erlang {
            module: module.into(),
            function: function.into(),
        }
    }

    fn to_json(&self) -> Map<String, Value> {
        let mut out = Map::new();
        match self {
            Self::JavaScriptSource(source) => {
                out.insert("language".into(), json!("javascript"));
                out.insert("source".into(), json!(source));
            }
            Self::JavaScriptNamed(name) => {
                out.insert("language".into(), json!("javascript"));
                out.insert("name".into(), json!(name));
            }
            Self::Erlang { module, function } => {
                out.insert("language".into(), json!("erlang"));
                out.insert("module".into(), json!(module));
                out.insert("function".into(), json!(function));
            }
        }
        out
    }
}

/// One step of a job.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Map {
        function: Function,
        arg: Option<Value>,
        keep: bool,
    },
    Reduce {
        function: Function,
        arg: Option<Value>,
        keep: bool,
    },
    /// Follow links, optionally restricted to a target bucket and tag.
    Link {
        bucket: Option<String>,
        tag: Option<String>,
        keep: bool,
    },
}

impl Phase {
    fn keep(&self) -> bool {
        match self {
            Self::Map { keep, .. } | Self::Reduce { keep, .. } | Self::Link { keep, .. } => *keep,
        }
    }

    fn to_json(&self, keep: bool) -> Value {
        match self {
            Self::Map { function, arg, .. } | Self::Reduce { function, arg, .. } => {
                let mut body = function.to_json();
                body.insert("keep".into(), json!(keep));
                if let Some(arg) = arg {
                    body.insert("arg".into(), arg.clone());
                }
                let name = if matches!(self, Self::Map { .. }) { "map" } else { "reduce" };
                let mut phase = Map::new();
                phase.insert(name.into(), Value::Object(body));
                Value::Object(phase)
            }
            Self::Link { bucket, tag, .. } => json!({
                "link": {
                    "bucket": bucket.as_deref().unwrap_or("_"),
                    "tag": tag.as_deref().unwrap_or("_"),
                    "keep": keep,
                }
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Inputs {
    Keys(Vec<(String, String)>),
    Bucket(String),
}

/// Builder for a map/reduce job.
#[derive(Clone, Debug, PartialEq)]
pub struct MapReduce {
    inputs: Inputs,
    phases: Vec<Phase>,
}

impl MapReduce {
    pub fn new() -> Self {
        Self {
            inputs: Inputs::Keys(Vec::new()),
            phases: Vec::new(),
        }
    }

    /// Add one key as an input. Fails once a whole bucket is the input.
    pub fn add(&mut self, bucket: impl Into<String>, key: impl Into<String>) -> ObjectResult<&mut Self> {
        if let Inputs::Bucket(b) = &self.inputs {
            return Err(ObjectError::InvalidMapReduce(format!(
                "job already runs over all of bucket {b}"
            )));
        }
        if let Inputs::Keys(keys) = &mut self.inputs {
            keys.push((bucket.into(), key.into()));
        }
        Ok(self)
    }

    /// Add a stored object as an input.
    pub fn add_object(&mut self, obj: &DataObject) -> ObjectResult<&mut Self> {
        let key = obj.require_key()?;
        self.add(obj.bucket().name(), key)
    }

    /// Run over every key of a bucket. Fails once keys have been added.
    pub fn add_bucket(&mut self, bucket: impl Into<String>) -> ObjectResult<&mut Self> {
        if matches!(&self.inputs, Inputs::Keys(keys) if !keys.is_empty()) {
            return Err(ObjectError::InvalidMapReduce(
                "cannot mix a bucket input with key inputs".into(),
            ));
        }
        self.inputs = Inputs::Bucket(bucket.into());
        Ok(self)
    }

    pub fn map(&mut self, function: Function, arg: Option<Value>, keep: bool) -> &mut Self {
        self.phases.push(Phase::Map { function, arg, keep });
        self
    }

    pub fn reduce(&mut self, function: Function, arg: Option<Value>, keep: bool) -> &mut Self {
        self.phases.push(Phase::Reduce { function, arg, keep });
        self
    }

    /// Follow links; `None` matches any bucket or tag.
    pub fn link(&mut self, bucket: Option<&str>, tag: Option<&str>, keep: bool) -> &mut Self {
        self.phases.push(Phase::Link {
            bucket: bucket.map(str::to_string),
            tag: tag.map(str::to_string),
            keep,
        });
        self
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Render the job. When no phase asks to keep its results, the last
    /// phase does.
    pub fn to_json(&self) -> Value {
        let inputs = match &self.inputs {
            Inputs::Keys(keys) => Value::Array(keys.iter().map(|(b, k)| json!([b, k])).collect()),
            Inputs::Bucket(bucket) => json!(bucket),
        };
        let keep_last = !self.phases.iter().any(Phase::keep);
        let last = self.phases.len().saturating_sub(1);
        let query: Vec<Value> = self
            .phases
            .iter()
            .enumerate()
            .map(|(i, phase)| phase.to_json(phase.keep() || (keep_last && i == last)))
            .collect();
        json!({ "inputs": inputs, "query": query })
    }

    /// Send the job through the client's transport.
    pub fn run(&self, client: &Client) -> ObjectResult<Value> {
        if let Inputs::Keys(keys) = &self.inputs {
            if keys.is_empty() {
                return Err(ObjectError::InvalidMapReduce("job has no inputs".into()));
            }
        }
        if self.phases.is_empty() {
            return Err(ObjectError::InvalidMapReduce("job has no phases".into()));
        }
        debug!(phases = self.phases.len(), "running map/reduce job");
        client.map_reduce(&self.to_json())
    }
}

impl Default for MapReduce {
    fn default() -> Self {
        Self::new()
    }
}

impl DataObject {
    /// A map/reduce job with this object as its first input.
    pub fn map_reduce(&self) -> ObjectResult<MapReduce> {
        let mut job = MapReduce::new();
        job.add_object(self)?;
        Ok(job)
    }
}
