//! Exit locks for TinyMUSH passages.
//!
//! A lock pairs an access type with a predicate and is written the way
//! builders type it, e.g. `traverse:holds(Bob-storekey)`. Only the
//! `traverse` access type and the `holds(<key>)` predicate exist; anything
//! else is rejected at parse time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tmush::errors::TinyMushError;
use crate::tmush::types::ObjectRecord;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Traverse,
}

impl AccessType {
    fn as_str(&self) -> &'static str {
        match self {
            AccessType::Traverse => "traverse",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockPredicate {
    /// Passes when the accessor carries an object with this name or dbref.
    Holds(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lock {
    pub access: AccessType,
    pub predicate: LockPredicate,
}

impl Lock {
    /// Build a traverse lock that requires carrying `key_name`.
    pub fn traverse_holds(key_name: &str) -> Self {
        Self {
            access: AccessType::Traverse,
            predicate: LockPredicate::Holds(key_name.to_string()),
        }
    }

    /// Parse a lock string such as `traverse:holds(Bob-storekey)`.
    pub fn parse(input: &str) -> Result<Self, TinyMushError> {
        let input = input.trim();
        let (access, predicate) = input
            .split_once(':')
            .ok_or_else(|| TinyMushError::InvalidLock(format!("missing ':' in '{}'", input)))?;

        let access = match access.trim().to_ascii_lowercase().as_str() {
            "traverse" => AccessType::Traverse,
            other => {
                return Err(TinyMushError::InvalidLock(format!(
                    "unknown access type '{}'",
                    other
                )))
            }
        };

        let predicate = predicate.trim();
        let (func, rest) = predicate
            .split_once('(')
            .ok_or_else(|| TinyMushError::InvalidLock(format!("missing '(' in '{}'", predicate)))?;
        let arg = rest
            .strip_suffix(')')
            .ok_or_else(|| TinyMushError::InvalidLock(format!("missing ')' in '{}'", predicate)))?
            .trim();

        if arg.is_empty() {
            return Err(TinyMushError::InvalidLock(format!(
                "{} needs an argument",
                func.trim()
            )));
        }

        let predicate = match func.trim().to_ascii_lowercase().as_str() {
            "holds" => LockPredicate::Holds(arg.to_string()),
            other => {
                return Err(TinyMushError::InvalidLock(format!(
                    "unknown lock function '{}'",
                    other
                )))
            }
        };

        Ok(Self { access, predicate })
    }

    /// Name of the key object this lock asks for, if any.
    pub fn required_key(&self) -> Option<&str> {
        match &self.predicate {
            LockPredicate::Holds(name) => Some(name.as_str()),
        }
    }

    /// Evaluate the lock for `access` against the objects the accessor carries.
    /// A lock on a different access type never blocks.
    pub fn passes<'a>(
        &self,
        access: AccessType,
        carried: impl IntoIterator<Item = &'a ObjectRecord>,
    ) -> bool {
        if self.access != access {
            return true;
        }
        match &self.predicate {
            LockPredicate::Holds(wanted) => carried
                .into_iter()
                .any(|obj| obj.id == *wanted || obj.name.eq_ignore_ascii_case(wanted)),
        }
    }
}

impl fmt::Display for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            LockPredicate::Holds(name) => write!(f, "{}:holds({})", self.access.as_str(), name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmush::types::ObjectLocation;

    fn key(id: &str, name: &str) -> ObjectRecord {
        ObjectRecord::new(id, name, ObjectLocation::Player("alice".to_string()), "sysop")
    }

    #[test]
    fn parses_traverse_holds() {
        let lock = Lock::parse("traverse:holds(Bob-storekey)").unwrap();
        assert_eq!(lock, Lock::traverse_holds("Bob-storekey"));
        assert_eq!(lock.required_key(), Some("Bob-storekey"));
    }

    #[test]
    fn display_matches_parse_input() {
        let lock = Lock::traverse_holds("Bob-storekey");
        assert_eq!(lock.to_string(), "traverse:holds(Bob-storekey)");
        assert_eq!(Lock::parse(&lock.to_string()).unwrap(), lock);
    }

    #[test]
    fn parse_is_lenient_about_case_and_spacing() {
        let lock = Lock::parse("  TRAVERSE : Holds( brass key ) ").unwrap();
        assert_eq!(lock.required_key(), Some("brass key"));
    }

    #[test]
    fn rejects_malformed_locks() {
        assert!(Lock::parse("holds(key)").is_err());
        assert!(Lock::parse("traverse:holds()").is_err());
        assert!(Lock::parse("traverse:holds(key").is_err());
        assert!(Lock::parse("open:holds(key)").is_err());
        assert!(Lock::parse("traverse:perm(Builders)").is_err());
    }

    #[test]
    fn holds_checks_carried_names_and_ids() {
        let lock = Lock::traverse_holds("Bob-storekey");
        let carried = vec![key("#7", "bob-STOREKEY")];
        assert!(lock.passes(AccessType::Traverse, &carried));

        let by_id = Lock::traverse_holds("#7");
        assert!(by_id.passes(AccessType::Traverse, &carried));

        let other = vec![key("#8", "rusty key")];
        assert!(!lock.passes(AccessType::Traverse, &other));
        assert!(!lock.passes(AccessType::Traverse, &Vec::<ObjectRecord>::new()));
    }
}
