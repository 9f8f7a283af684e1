//! Round trips that change an object's state: store, reload, delete, and
//! lazy sibling fetches.
//!
//! Each operation issues exactly one transport request. Transport errors are
//! returned unchanged. `store` leaves the object untouched when the request
//! fails; `reload` clears before reading, so a failed read leaves the object
//! non-existent; `delete` clears once the request has been issued, whatever
//! its outcome.

use rkv_types::{Quorum, VersionTag};
use tracing::debug;

use crate::error::{ObjectError, ObjectResult};
use crate::object::{DataObject, Membership};
use crate::siblings::SiblingSlot;
use crate::transport::{DeleteRequest, GetRequest, PutRequest};

impl DataObject {
    /// Write this object's metadata and payload, handing back its vector
    /// clock so the server can detect a concurrent write.
    ///
    /// Unset quorums fall back to the bucket defaults. When `return_body`
    /// is set and the server returns the stored versions, the object is
    /// repopulated from them and may come back with siblings.
    ///
    /// Without a body the local vector clock is not refreshed; reload
    /// before the next write to descend from the version just stored.
    pub fn store(
        &mut self,
        w: Option<Quorum>,
        dw: Option<Quorum>,
        return_body: bool,
    ) -> ObjectResult<&mut Self> {
        let request = PutRequest {
            bucket: self.bucket.name().to_string(),
            key: self.key.clone(),
            vclock: self.vclock.clone(),
            metadata: self.metadata.clone(),
            value: self.encoded_data()?,
            w: self.bucket.resolve_w(w),
            dw: self.bucket.resolve_dw(dw),
            return_body,
        };
        debug!(
            bucket = %request.bucket,
            key = ?request.key,
            w = %request.w,
            dw = %request.dw,
            return_body,
            descends = request.vclock.is_some(),
            "storing object"
        );
        let reply = self.client().transport().put(&request)?;

        if self.key.is_none() {
            self.key = reply.key;
        }
        if let Some(body) = reply.body {
            self.populate(body);
        }
        Ok(self)
    }

    /// Re-read this object, or one specific version of it.
    ///
    /// Clears before reading. An absent key leaves the object
    /// non-existent.
    pub fn reload(&mut self, r: Option<Quorum>, vtag: Option<&VersionTag>) -> ObjectResult<&mut Self> {
        let request = GetRequest {
            bucket: self.bucket.name().to_string(),
            key: self.require_key()?,
            r: self.bucket.resolve_r(r),
            vtag: vtag.cloned(),
        };
        debug!(bucket = %request.bucket, key = %request.key, r = %request.r, vtag = ?request.vtag, "reloading object");

        self.clear();
        let response = self.client().transport().get(&request)?;
        self.populate(response);
        Ok(self)
    }

    /// Delete this object on the server and clear it locally.
    pub fn delete(&mut self, rw: Option<Quorum>) -> ObjectResult<&mut Self> {
        let request = DeleteRequest {
            bucket: self.bucket.name().to_string(),
            key: self.require_key()?,
            rw: self.bucket.resolve_rw(rw),
        };
        debug!(bucket = %request.bucket, key = %request.key, rw = %request.rw, "deleting object");

        let outcome = self.client().transport().delete(&request);
        self.clear();
        outcome?;
        Ok(self)
    }

    /// Sibling number `index`, this object excluded.
    ///
    /// A sibling known only by its version tag is fetched with one targeted
    /// read, and the shared group is updated in place so that every member
    /// sees the fetched version from then on.
    pub fn sibling(&self, index: usize, r: Option<Quorum>) -> ObjectResult<DataObject> {
        let (group, slot) = self.group_index(index)?;
        match group.slot(slot) {
            Some(SiblingSlot::Loaded(version)) => Ok(self.member(version, group, slot)),
            Some(SiblingSlot::Pending(vtag)) => {
                debug!(bucket = self.bucket.name(), key = ?self.key, %vtag, "fetching sibling");
                let mut obj = DataObject::new(self.bucket.clone(), self.key.clone());
                obj.encode_data = self.encode_data;
                obj.reload(r, Some(&vtag))?;
                group.resolve(slot, obj.snapshot());
                obj.siblings = Some(Membership {
                    group,
                    slot: Some(slot),
                });
                Ok(obj)
            }
            None => Err(ObjectError::SiblingIndexOutOfRange {
                index,
                count: self.sibling_count(),
            }),
        }
    }

    /// This object followed by every sibling, fetching any still pending.
    pub fn siblings(&self, r: Option<Quorum>) -> ObjectResult<Vec<DataObject>> {
        let mut all = Vec::with_capacity(self.sibling_count() + 1);
        all.push(self.clone());
        for index in 0..self.sibling_count() {
            all.push(self.sibling(index, r)?);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rkv_codec::Data;
    use rkv_types::{Metadata, VectorClock};
    use serde_json::json;

    use crate::client::Client;
    use crate::config::ClientConfig;
    use crate::error::{ObjectError, TransportError};
    use crate::memory::{InMemoryTransport, TransportCall};
    use crate::response::{Content, ObjectResponse};
    use crate::transport::Transport;

    use super::*;

    fn setup(transport: InMemoryTransport) -> (Arc<InMemoryTransport>, Client) {
        let transport = Arc::new(transport);
        let client = Client::from_shared(transport.clone() as Arc<dyn Transport>, ClientConfig::default());
        (transport, client)
    }

    /// Two writers that never saw each other's version.
    fn make_conflict(client: &Client, values: &[&str]) {
        let bucket = client.bucket("docs");
        for value in values {
            let mut obj = bucket.new_object(Some("k"), *value);
            obj.set_content_type("text/plain");
            obj.store(None, None, false).unwrap();
        }
    }

    // -----------------------------------------------------------------------
    // Store
    // -----------------------------------------------------------------------

    #[test]
    fn store_with_body_populates() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), json!({"v": 1}));
        obj.store(None, None, true).unwrap();

        assert!(obj.exists());
        assert!(obj.vclock().is_some());
        assert_eq!(obj.data(), Some(&Data::Json(json!({"v": 1}))));
        assert_eq!(transport.put_count(), 1);
    }

    #[test]
    fn store_resolves_quorums_from_bucket() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), "x");
        obj.store(None, Some(Quorum::All), false).unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[0],
            TransportCall::Put {
                bucket: "docs".into(),
                key: Some("k".into()),
                w: Quorum::N(2),
                dw: Quorum::All,
                return_body: false,
            }
        );
    }

    #[test]
    fn store_without_body_keeps_local_state() {
        let (_, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), "x");
        obj.store(None, None, false).unwrap();
        assert!(!obj.exists());
        assert!(obj.vclock().is_none());
        assert_eq!(obj.data(), Some(&Data::from("x")));
    }

    #[test]
    fn store_adopts_server_assigned_key() {
        let (_, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(None, "x");
        obj.store(None, None, false).unwrap();
        let key = obj.key().expect("server assigned a key").to_string();
        assert!(!key.is_empty());

        let fetched = client.bucket("docs").get(&key, None).unwrap();
        assert!(fetched.exists());
    }

    #[test]
    fn store_round_trips_vclock() {
        let (_, client) = setup(InMemoryTransport::new().with_allow_mult(true));
        let bucket = client.bucket("docs");
        let mut obj = bucket.new_object(Some("k"), "one");
        obj.set_content_type("text/plain");
        obj.store(None, None, true).unwrap();
        obj.set_data("two");
        obj.store(None, None, true).unwrap();

        assert!(!obj.has_siblings());
        assert_eq!(obj.data(), Some(&Data::from("two")));
    }

    #[test]
    fn unencodable_store_issues_no_request() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), json!({"a": 1}));
        obj.set_content_type("application/x-custom");
        let err = obj.store(None, None, true).unwrap_err();
        assert!(matches!(err, ObjectError::UnencodableData { .. }));
        assert_eq!(transport.put_count(), 0);
    }

    #[test]
    fn failed_store_leaves_state_intact() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), "v1");
        obj.store(None, None, true).unwrap();
        let vclock = obj.vclock().cloned();

        transport.fail_next(TransportError::Unavailable("node down".into()));
        obj.set_data("v2");
        let err = obj.store(None, None, true).unwrap_err();
        assert!(matches!(err, ObjectError::Transport(TransportError::Unavailable(_))));
        assert!(obj.exists());
        assert_eq!(obj.vclock().cloned(), vclock);
        assert_eq!(obj.data(), Some(&Data::from("v2")));
    }

    #[test]
    fn concurrent_stores_surface_siblings() {
        let (_, client) = setup(InMemoryTransport::new().with_allow_mult(true));
        make_conflict(&client, &["a", "b"]);

        let mut obj = client.bucket("docs").new_object(Some("k"), "c");
        obj.set_content_type("text/plain");
        obj.store(None, None, true).unwrap();
        assert_eq!(obj.sibling_count(), 2);
    }

    #[test]
    fn inline_conflict_members_all_exist() {
        let (_, client) = setup(InMemoryTransport::new().with_allow_mult(true));
        make_conflict(&client, &["w0", "w1", "w2"]);

        let obj = client.bucket("docs").get("k", None).unwrap();
        let all = obj.siblings(None).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(DataObject::exists));
        let values: Vec<_> = all.iter().map(|m| m.data().cloned()).collect();
        assert_eq!(
            values,
            vec![Some(Data::from("w0")), Some(Data::from("w1")), Some(Data::from("w2"))]
        );
    }

    // -----------------------------------------------------------------------
    // Reload
    // -----------------------------------------------------------------------

    #[test]
    fn reload_missing_key_is_not_found() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").object(Some("nope"));
        obj.reload(None, None).unwrap();
        assert!(!obj.exists());
        assert_eq!(transport.get_count(), 1);
    }

    #[test]
    fn reload_without_key_fails_before_any_request() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(None, "x");
        let err = obj.reload(None, None).unwrap_err();
        assert!(matches!(err, ObjectError::MissingKey { .. }));
        assert_eq!(transport.get_count(), 0);
        assert_eq!(obj.data(), Some(&Data::from("x")));
    }

    #[test]
    fn reload_is_idempotent() {
        let (_, client) = setup(InMemoryTransport::new().with_allow_mult(true));
        make_conflict(&client, &["a", "b"]);

        let mut obj = client.bucket("docs").object(Some("k"));
        obj.reload(None, None).unwrap();
        let first = (obj.vclock().cloned(), obj.data().cloned(), obj.sibling_count());
        obj.reload(None, None).unwrap();
        let second = (obj.vclock().cloned(), obj.data().cloned(), obj.sibling_count());
        assert_eq!(first, second);
        assert_eq!(second.2, 1);
    }

    #[test]
    fn reload_clears_stale_conflict() {
        let (_, client) = setup(InMemoryTransport::new().with_allow_mult(true));
        make_conflict(&client, &["a", "b"]);

        let mut obj = client.bucket("docs").object(Some("k"));
        obj.reload(None, None).unwrap();
        assert_eq!(obj.sibling_count(), 1);

        // A write descending from the conflict resolves it on the server.
        let mut resolver = obj.clone();
        resolver.set_data("merged");
        resolver.store(None, None, false).unwrap();

        obj.reload(None, None).unwrap();
        assert_eq!(obj.sibling_count(), 0);
        assert_eq!(obj.data(), Some(&Data::from("merged")));
    }

    #[test]
    fn failed_reload_leaves_object_cleared() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), "x");
        obj.store(None, None, true).unwrap();
        assert!(obj.exists());

        transport.fail_next(TransportError::Timeout("r=2".into()));
        let err = obj.reload(None, None).unwrap_err();
        assert!(matches!(err, ObjectError::Transport(TransportError::Timeout(_))));
        assert!(!obj.exists());
        assert!(obj.data().is_none());
        assert!(obj.vclock().is_none());
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_clears_and_removes() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), "x");
        obj.store(None, None, true).unwrap();
        obj.delete(Some(Quorum::All)).unwrap();

        assert!(!obj.exists());
        assert!(obj.data().is_none());
        assert!(obj.vclock().is_none());
        assert!(transport.calls().contains(&TransportCall::Delete {
            bucket: "docs".into(),
            key: "k".into(),
            rw: Quorum::All,
        }));
        assert!(!client.bucket("docs").get("k", None).unwrap().exists());
    }

    #[test]
    fn delete_clears_even_when_transport_fails() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").new_object(Some("k"), "x");
        obj.store(None, None, true).unwrap();

        transport.fail_next(TransportError::Unavailable("gone".into()));
        assert!(obj.delete(None).is_err());
        assert!(!obj.exists());
        assert!(obj.data().is_none());
    }

    // -----------------------------------------------------------------------
    // Siblings
    // -----------------------------------------------------------------------

    #[test]
    fn no_conflict_siblings_is_just_self() {
        let (_, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").object(Some("k"));
        obj.populate(ObjectResponse::single(
            "clockA",
            Content::new(Metadata::with_content_type("text/plain"), b"hello".to_vec()),
        ));
        let all = obj.siblings(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].data(), obj.data());
    }

    #[test]
    fn every_member_sees_the_full_group_with_itself_first() {
        let (transport, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").object(Some("k"));
        obj.populate(ObjectResponse::Versions {
            vclock: VectorClock::from("vc"),
            contents: ["a", "b", "c"]
                .iter()
                .map(|v| Content::new(Metadata::with_content_type("text/plain"), v.as_bytes()))
                .collect(),
        });
        assert_eq!(obj.sibling_count(), 2);

        let members = obj.siblings(None).unwrap();
        assert_eq!(members.len(), 3);

        // Each member first, then the remaining slots in group order.
        let expected = [["a", "b", "c"], ["b", "a", "c"], ["c", "a", "b"]];
        for (member, order) in members.iter().zip(expected) {
            let view = member.siblings(None).unwrap();
            assert_eq!(view.len(), 3);
            assert!(view[0].is_same_sibling(member));
            let values: Vec<_> = view.iter().map(|m| m.data().cloned()).collect();
            let wanted: Vec<_> = order.iter().map(|v| Some(Data::from(*v))).collect();
            assert_eq!(values, wanted);
            for version in &view {
                assert!(version.exists());
                assert_eq!(version.vclock().unwrap(), &"vc");
                assert_eq!(version.key(), Some("k"));
            }
            assert!(member.sibling_group().unwrap().ptr_eq(obj.sibling_group().unwrap()));
        }
        assert_eq!(transport.get_count(), 0);
    }

    #[test]
    fn members_keep_their_own_vclock_and_key() {
        let (_, client) = setup(InMemoryTransport::new());
        let mut obj = client.bucket("docs").object(Some("k"));
        obj.populate(ObjectResponse::Versions {
            vclock: VectorClock::from("shared"),
            contents: vec![
                Content::new(Metadata::with_content_type("text/plain"), b"a".to_vec()),
                Content::new(Metadata::with_content_type("text/plain"), b"b".to_vec()),
            ],
        });
        let other = obj.sibling(0, None).unwrap();
        assert_eq!(other.key(), Some("k"));
        assert_eq!(other.vclock().unwrap(), &"shared");
        assert!(other.exists());
        assert_eq!(other.data(), Some(&Data::from("b")));
    }

    #[test]
    fn pending_sibling_is_fetched_once() {
        let (transport, client) =
            setup(InMemoryTransport::new().with_allow_mult(true).with_sibling_tags(true));
        make_conflict(&client, &["a", "b"]);

        let mut obj = client.bucket("docs").object(Some("k"));
        obj.reload(None, None).unwrap();
        assert!(!obj.exists());
        assert_eq!(obj.sibling_count(), 2);
        assert_eq!(obj.sibling_group().unwrap().pending_count(), 2);
        let gets = transport.get_count();

        let first = obj.sibling(0, None).unwrap();
        assert!(first.exists());
        assert_eq!(first.data(), Some(&Data::from("a")));
        assert_eq!(transport.get_count(), gets + 1);

        let again = obj.sibling(0, None).unwrap();
        assert!(again.is_same_sibling(&first));
        assert_eq!(again.data(), first.data());
        assert_eq!(transport.get_count(), gets + 1);
        assert_eq!(obj.sibling_group().unwrap().pending_count(), 1);
    }

    #[test]
    fn fetched_sibling_is_visible_to_other_members() {
        let (transport, client) =
            setup(InMemoryTransport::new().with_allow_mult(true).with_sibling_tags(true));
        make_conflict(&client, &["a", "b"]);

        let mut obj = client.bucket("docs").object(Some("k"));
        obj.reload(None, None).unwrap();
        let first = obj.sibling(0, None).unwrap();
        let gets = transport.get_count();

        // `first` sees slot 1 as its only sibling and fetches it.
        let second = first.sibling(0, None).unwrap();
        assert_eq!(second.data(), Some(&Data::from("b")));
        assert_eq!(transport.get_count(), gets + 1);

        // The primary now finds it already loaded.
        let via_primary = obj.sibling(1, None).unwrap();
        assert!(via_primary.is_same_sibling(&second));
        assert_eq!(transport.get_count(), gets + 1);
        assert_eq!(obj.sibling_group().unwrap().pending_count(), 0);
    }

    #[test]
    fn siblings_materializes_everything() {
        let (transport, client) =
            setup(InMemoryTransport::new().with_allow_mult(true).with_sibling_tags(true));
        make_conflict(&client, &["a", "b", "c"]);

        let mut obj = client.bucket("docs").object(Some("k"));
        obj.reload(None, None).unwrap();
        let gets = transport.get_count();
        let all = obj.siblings(Some(Quorum::One)).unwrap();
        assert_eq!(all.len(), 4);
        assert!(!all[0].exists());
        assert!(all[1..].iter().all(DataObject::exists));
        assert_eq!(transport.get_count(), gets + 3);
        assert!(transport.calls().iter().any(|c| matches!(
            c,
            TransportCall::Get { r: Quorum::One, vtag: Some(_), .. }
        )));
    }

    #[test]
    fn sibling_fetch_failure_leaves_slot_pending() {
        let (transport, client) =
            setup(InMemoryTransport::new().with_allow_mult(true).with_sibling_tags(true));
        make_conflict(&client, &["a", "b"]);

        let mut obj = client.bucket("docs").object(Some("k"));
        obj.reload(None, None).unwrap();
        transport.fail_next(TransportError::Protocol("bad frame".into()));
        assert!(obj.sibling(0, None).is_err());
        assert_eq!(obj.sibling_group().unwrap().pending_count(), 2);
        assert!(obj.sibling(0, None).unwrap().exists());
    }

    #[test]
    fn sibling_index_out_of_range() {
        let (_, client) = setup(InMemoryTransport::new());
        let obj = client.bucket("docs").object(Some("k"));
        assert!(matches!(
            obj.sibling(0, None),
            Err(ObjectError::SiblingIndexOutOfRange { index: 0, count: 0 })
        ));
    }
}
