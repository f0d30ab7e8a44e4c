// Lock snapshot rows and validated lock requests
use super::object::LockableObject;
use super::types::{LockMode, SessionId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One raw row of the lock snapshot. Everything is nullable here; validation
/// happens in [`LockRow::into_request`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRow {
    #[serde(flatten)]
    pub object: LockableObject,
    pub mode: Option<String>,
    pub granted: Option<bool>,
    pub session: Option<i64>,
}

impl LockRow {
    pub fn new(object: LockableObject, mode: &str, granted: bool, session: i64) -> Self {
        LockRow {
            object,
            mode: Some(mode.to_string()),
            granted: Some(granted),
            session: Some(session),
        }
    }

    pub fn granted(object: LockableObject, mode: LockMode, session: i64) -> Self {
        Self::new(object, mode.as_str(), true, session)
    }

    pub fn waiting(object: LockableObject, mode: LockMode, session: i64) -> Self {
        Self::new(object, mode.as_str(), false, session)
    }

    pub fn into_request(self) -> Result<LockRequest> {
        let granted = self.granted.ok_or(Error::MalformedRow("granted"))?;
        let mode = self.mode.ok_or(Error::MalformedRow("mode"))?;
        let session = self.session.ok_or(Error::MalformedRow("session"))?;

        Ok(LockRequest {
            object: self.object,
            mode: mode.parse()?,
            session: SessionId(session),
            granted,
        })
    }
}

/// A validated snapshot row: `session` holds (or waits for) `mode` on `object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    pub object: LockableObject,
    pub mode: LockMode,
    pub session: SessionId,
    pub granted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_row() {
        let req = LockRow::waiting(LockableObject::relation(1, 500), LockMode::ExclusiveLock, 20)
            .into_request()
            .unwrap();
        assert_eq!(req.session, SessionId(20));
        assert_eq!(req.mode, LockMode::ExclusiveLock);
        assert!(!req.granted);
    }

    #[test]
    fn test_missing_required_fields() {
        let full = LockRow::granted(LockableObject::relation(1, 500), LockMode::ShareLock, 10);

        let row = LockRow { granted: None, ..full.clone() };
        assert!(matches!(row.into_request(), Err(Error::MalformedRow("granted"))));

        let row = LockRow { mode: None, ..full.clone() };
        assert!(matches!(row.into_request(), Err(Error::MalformedRow("mode"))));

        let row = LockRow { session: None, ..full };
        assert!(matches!(row.into_request(), Err(Error::MalformedRow("session"))));
    }

    #[test]
    fn test_unknown_mode() {
        let row = LockRow::new(LockableObject::relation(1, 500), "BogusLock", false, 10);
        assert!(matches!(row.into_request(), Err(Error::UnknownLockMode(_))));
    }

    #[test]
    fn test_deserialize_flat_row() {
        let row: LockRow = serde_json::from_str(
            r#"{"locktype":"relation","database":1,"relation":500,
                "mode":"ShareLock","granted":true,"session":10}"#,
        )
        .unwrap();
        assert_eq!(row.object, LockableObject::relation(1, 500));
        assert_eq!(row.session, Some(10));
    }
}
