// Lockable Object
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resource a session can lock, as identified by one `pg_locks` row.
///
/// Every field is independently nullable; absence is part of the identity, so a
/// relation lock and a transaction lock never compare equal even when their
/// present fields overlap. Equality and hashing cover all fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockableObject {
    pub gp_segment_id: Option<i64>,
    pub locktype: Option<String>,
    pub database: Option<i64>,
    pub relation: Option<i64>,
    pub page: Option<i64>,
    pub tuple: Option<i64>,
    pub virtualxid: Option<String>,
    pub transactionid: Option<i64>,
    pub classid: Option<i64>,
    pub objid: Option<i64>,
    pub objsubid: Option<i64>,
}

impl LockableObject {
    /// Relation-level lock object.
    pub fn relation(database: i64, relation: i64) -> Self {
        LockableObject {
            locktype: Some("relation".to_string()),
            database: Some(database),
            relation: Some(relation),
            ..Default::default()
        }
    }

    /// Transaction id lock object.
    pub fn transaction(xid: i64) -> Self {
        LockableObject {
            locktype: Some("transactionid".to_string()),
            transactionid: Some(xid),
            ..Default::default()
        }
    }

    pub fn on_segment(mut self, segment: i64) -> Self {
        self.gp_segment_id = Some(segment);
        self
    }
}

impl fmt::Display for LockableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut desc: Vec<String> = Vec::with_capacity(11);
        if let Some(seg) = self.gp_segment_id {
            desc.push(format!("seg:{}", seg));
        }
        if let Some(locktype) = &self.locktype {
            desc.push(format!("type:{}", locktype));
        }
        if let Some(db) = self.database {
            desc.push(format!("db:{}", db));
        }
        if let Some(rel) = self.relation {
            desc.push(format!("rel:{}", rel));
        }
        if let Some(page) = self.page {
            desc.push(format!("page:{}", page));
        }
        if let Some(tuple) = self.tuple {
            desc.push(format!("tuple:{}", tuple));
        }
        if let Some(vxid) = &self.virtualxid {
            desc.push(format!("virtualxid:{}", vxid));
        }
        if let Some(xid) = self.transactionid {
            desc.push(format!("xid:{}", xid));
        }
        if let Some(classid) = self.classid {
            desc.push(format!("classid:{}", classid));
        }
        if let Some(objid) = self.objid {
            desc.push(format!("objid:{}", objid));
        }
        if let Some(objsubid) = self.objsubid {
            desc.push(format!("objsubid:{}", objsubid));
        }
        f.write_str(&desc.join(";"))
    }
}
