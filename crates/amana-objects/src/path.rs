//! Object path conventions.
//!
//! Uploads are addressed by an entity id of the form `uploads/<uuid>`. The
//! upload URL puts that id at the root (`/uploads/<uuid>`), while the stable
//! retrieval path lives under `/objects/` (`/objects/uploads/<uuid>`).

use uuid::Uuid;

use crate::{ObjectError, Result};

pub const OBJECT_PREFIX: &str = "/objects/";
const UPLOAD_DIR: &str = "uploads";

pub fn new_entity_id() -> String {
    format!("{}/{}", UPLOAD_DIR, Uuid::new_v4())
}

pub fn object_path(entity_id: &str) -> String {
    format!("{}{}", OBJECT_PREFIX, entity_id)
}

pub fn entity_id_from_object_path(path: &str) -> Option<&str> {
    path.strip_prefix(OBJECT_PREFIX).filter(|id| !id.is_empty())
}

/// Only ids minted by [`new_entity_id`] are accepted, which also rules out
/// path traversal when the id is joined onto the storage root.
pub fn validate_entity_id(entity_id: &str) -> Result<()> {
    let invalid = || ObjectError::InvalidEntityId(entity_id.to_string());

    let rest = entity_id
        .strip_prefix(UPLOAD_DIR)
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(invalid)?;
    let uuid = Uuid::parse_str(rest).map_err(|_| invalid())?;
    if uuid.hyphenated().to_string() != rest {
        return Err(invalid());
    }
    Ok(())
}

/// Map a raw upload URL onto its retrieval path.
///
/// `https://host/uploads/<id>?expires=..` and `/uploads/<id>` both become
/// `/objects/uploads/<id>`. Paths already under `/objects/` pass through;
/// anything else is returned unchanged.
pub fn normalize_object_path(raw: &str) -> String {
    let without_origin = match raw.find("://") {
        Some(scheme_end) => {
            let after_scheme = &raw[scheme_end + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => return raw.to_string(),
            }
        }
        None => raw,
    };

    let path = without_origin
        .split(['?', '#'])
        .next()
        .unwrap_or(without_origin);

    if path.starts_with(OBJECT_PREFIX) {
        return path.to_string();
    }

    match path.strip_prefix('/') {
        Some(entity_id) if validate_entity_id(entity_id).is_ok() => object_path(entity_id),
        _ => raw.to_string(),
    }
}
