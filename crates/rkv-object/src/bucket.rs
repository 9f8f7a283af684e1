use std::fmt;
use std::sync::Arc;

use rkv_codec::{Codec, CodecRegistry, Data};
use rkv_types::{Metadata, Quorum, CONTENT_TYPE_BINARY, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};

use crate::client::Client;
use crate::config::BucketProps;
use crate::error::ObjectResult;
use crate::object::DataObject;

/// A named container of objects.
///
/// The bucket owns the policy its objects consult: quorum defaults and the
/// codec registry. Cloning shares the registry until one clone registers a
/// codec of its own.
#[derive(Clone)]
pub struct Bucket {
    name: String,
    props: BucketProps,
    codecs: Arc<CodecRegistry>,
    client: Client,
}

impl Bucket {
    pub(crate) fn new(client: Client, name: impl Into<String>) -> Self {
        let name = name.into();
        let props = client.config().props_for(&name);
        Self {
            name,
            props,
            codecs: Arc::new(CodecRegistry::new()),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn props(&self) -> BucketProps {
        self.props
    }

    pub fn set_props(&mut self, props: BucketProps) -> &mut Self {
        self.props = props;
        self
    }

    // ---- Quorum resolution ----

    pub fn resolve_r(&self, r: Option<Quorum>) -> Quorum {
        r.unwrap_or(self.props.r)
    }

    pub fn resolve_w(&self, w: Option<Quorum>) -> Quorum {
        w.unwrap_or(self.props.w)
    }

    pub fn resolve_dw(&self, dw: Option<Quorum>) -> Quorum {
        dw.unwrap_or(self.props.dw)
    }

    pub fn resolve_rw(&self, rw: Option<Quorum>) -> Quorum {
        rw.unwrap_or(self.props.rw)
    }

    // ---- Codecs ----

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Install a codec for objects of this bucket handle.
    pub fn register_codec(&mut self, content_type: &str, codec: impl Codec + 'static) -> &mut Self {
        Arc::make_mut(&mut self.codecs).register(content_type, codec);
        self
    }

    pub fn unregister_codec(&mut self, content_type: &str) -> &mut Self {
        Arc::make_mut(&mut self.codecs).unregister(content_type);
        self
    }

    // ---- Objects ----

    /// An unfetched reference to `key`; nothing is read. Encoding follows
    /// the client configuration.
    pub fn object(&self, key: Option<&str>) -> DataObject {
        let mut obj = DataObject::new(self.clone(), key.map(str::to_string));
        obj.set_encode_data(self.client.config().encode_data);
        obj
    }

    /// A new object holding `data`, typed after its variant: text as
    /// `text/plain`, bytes as `application/octet-stream`, anything else as
    /// `application/json`. With no key the server assigns one on first
    /// store.
    pub fn new_object(&self, key: Option<&str>, data: impl Into<Data>) -> DataObject {
        let data = data.into();
        let content_type = match &data {
            Data::Text(_) => CONTENT_TYPE_TEXT,
            Data::Binary(_) => CONTENT_TYPE_BINARY,
            Data::Json(_) => CONTENT_TYPE_JSON,
        };
        let mut obj = self.object(key);
        obj.set_metadata(Metadata::with_content_type(content_type));
        obj.set_data(data);
        obj
    }

    /// A new object whose bytes are stored as-is.
    pub fn new_binary(
        &self,
        key: Option<&str>,
        data: impl Into<Vec<u8>>,
        content_type: Option<&str>,
    ) -> DataObject {
        let mut obj = self.object(key);
        obj.set_encode_data(false);
        obj.set_metadata(Metadata::with_content_type(
            content_type.unwrap_or(CONTENT_TYPE_BINARY),
        ));
        obj.set_data(Data::Binary(data.into()));
        obj
    }

    /// Fetch `key`, decoding its payload through the codec registry.
    pub fn get(&self, key: &str, r: Option<Quorum>) -> ObjectResult<DataObject> {
        let mut obj = self.object(Some(key));
        obj.reload(r, None)?;
        Ok(obj)
    }

    /// Fetch `key`, keeping its payload as raw bytes.
    pub fn get_binary(&self, key: &str, r: Option<Quorum>) -> ObjectResult<DataObject> {
        let mut obj = self.object(Some(key));
        obj.set_encode_data(false);
        obj.reload(r, None)?;
        Ok(obj)
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("codecs", &self.codecs)
            .finish()
    }
}
