//! Session → artifact bookkeeping.
//!
//! Purely in memory. Nothing here touches the filesystem; callers delete the
//! backing file of whatever record `remove` hands back.

use preview_protocol::SessionId;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::ArtifactRecord;

#[derive(Debug, Default)]
pub struct ArtifactCache {
    records: HashMap<SessionId, ArtifactRecord>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&ArtifactRecord> {
        self.records.get(session_id)
    }

    /// Records `artifact_path` for the session, returning the record it replaced.
    pub fn put(&mut self, session_id: SessionId, artifact_path: PathBuf) -> Option<ArtifactRecord> {
        let record = ArtifactRecord {
            session_id: session_id.clone(),
            artifact_path,
        };
        self.records.insert(session_id, record)
    }

    pub fn remove(&mut self, session_id: &SessionId) -> Option<ArtifactRecord> {
        self.records.remove(session_id)
    }

    /// Removes every record whose session fails `keep`, returning them.
    pub fn remove_where<F>(&mut self, mut keep: F) -> Vec<ArtifactRecord>
    where
        F: FnMut(&SessionId) -> bool,
    {
        let doomed: Vec<SessionId> = self
            .records
            .keys()
            .filter(|session_id| !keep(*session_id))
            .cloned()
            .collect();
        doomed
            .iter()
            .filter_map(|session_id| self.records.remove(session_id))
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> SessionId {
        SessionId::new(value)
    }

    #[test]
    fn empty_cache_has_no_records() {
        let cache = ArtifactCache::new();
        assert!(cache.get(&id("s1")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn put_overwrites_and_keeps_one_record_per_session() {
        let mut cache = ArtifactCache::new();
        assert!(cache.put(id("s1"), PathBuf::from("/tmp/x/1.html")).is_none());

        let replaced = cache
            .put(id("s1"), PathBuf::from("/tmp/x/2.html"))
            .expect("previous record");
        assert_eq!(replaced.artifact_path, PathBuf::from("/tmp/x/1.html"));
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&id("s1")).unwrap().artifact_path,
            PathBuf::from("/tmp/x/2.html")
        );
    }

    #[test]
    fn remove_returns_record() {
        let mut cache = ArtifactCache::new();
        cache.put(id("s1"), PathBuf::from("/tmp/x/1.html"));

        let removed = cache.remove(&id("s1")).expect("record");
        assert_eq!(removed.session_id, id("s1"));
        assert!(cache.get(&id("s1")).is_none());
        assert!(cache.remove(&id("s1")).is_none());
    }

    #[test]
    fn remove_where_drops_only_rejected_sessions() {
        let mut cache = ArtifactCache::new();
        cache.put(id("s1"), PathBuf::from("/tmp/x/1.html"));
        cache.put(id("s2"), PathBuf::from("/tmp/x/2.html"));
        cache.put(id("s3"), PathBuf::from("/tmp/x/3.html"));

        let mut removed = cache.remove_where(|session_id| session_id.as_str() == "s2");
        removed.sort_by(|a, b| a.session_id.cmp(&b.session_id));

        let removed_ids: Vec<_> = removed.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(removed_ids, vec!["s1", "s3"]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&id("s2")).is_some());
    }
}
