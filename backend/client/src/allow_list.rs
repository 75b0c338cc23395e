use std::{collections::HashSet, fs, path::Path};

use payloads::{is_valid_bio_id, parse_bio_ids};

use crate::api::ClientError;

/// BioIDs the client accepts before registering.
///
/// Point it at the same file as the server's `BIO_ID_FILE` when the server
/// runs with a replaced list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    BuiltIn,
    File(HashSet<String>),
}

impl AllowList {
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        match path {
            Some(path) => Ok(AllowList::File(parse_bio_ids(&fs::read_to_string(path)?))),
            None => Ok(AllowList::BuiltIn),
        }
    }

    pub fn contains(&self, bio_id: &str) -> bool {
        match self {
            AllowList::BuiltIn => is_valid_bio_id(bio_id),
            AllowList::File(ids) => ids.contains(bio_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_built_in() {
        let list = AllowList::load(None).unwrap();

        assert!(list.contains("K1YL8VA2HG"));
        assert!(!list.contains("CUSTOM0001"));
    }

    #[test]
    fn test_file_replaces_built_in() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bio_ids");
        fs::write(&path, "# staging\nCUSTOM0001\n").unwrap();

        let list = AllowList::load(Some(&path)).unwrap();

        assert!(list.contains("CUSTOM0001"));
        assert!(!list.contains("K1YL8VA2HG"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();

        assert!(AllowList::load(Some(&dir.path().join("absent"))).is_err());
    }
}
