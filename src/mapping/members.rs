//! Member metadata for materializable types.
//!
//! Each materializable type describes its members once, at compile time,
//! through [`Materialize::members`]. The derived lookup structure is built on
//! first use and memoized process-wide per `(type, write_required)`.

use crate::error::CoercionError;
use crate::models::DbValue;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Logical kind of a member, derived from its Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Bool,
    Integer,
    Float,
    Text,
    Uuid,
    Bytes,
    DateTime,
    Date,
    Json,
}

/// Static description of one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberInfo {
    /// Name used to match result columns.
    pub name: &'static str,
    /// Whether the materializer may assign this member.
    pub writable: bool,
    pub kind: MemberKind,
    /// Rust type as written in the registration.
    pub type_name: &'static str,
}

/// A type the materializer can populate from result rows.
///
/// Implement it with [`impl_materialize!`](crate::impl_materialize).
pub trait Materialize: 'static {
    /// All members of the type, in declaration order.
    fn members() -> &'static [MemberInfo];

    /// Assign `value` to the member called `member`.
    ///
    /// `member` is always one of the names returned by [`Materialize::members`].
    fn assign_member(&mut self, member: &str, value: &DbValue) -> Result<(), CoercionError>;
}

/// Members of a type indexed by case-insensitive name.
#[derive(Debug)]
pub struct MemberSet {
    members: Vec<MemberInfo>,
    by_name: HashMap<String, usize>,
}

impl MemberSet {
    fn build(all: &'static [MemberInfo], write_required: bool) -> Self {
        let members: Vec<MemberInfo> = all
            .iter()
            .filter(|m| !write_required || m.writable)
            .copied()
            .collect();

        let mut by_name = HashMap::with_capacity(members.len());
        for (idx, member) in members.iter().enumerate() {
            by_name.entry(member.name.to_lowercase()).or_insert(idx);
        }

        Self { members, by_name }
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// Find a member by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&MemberInfo> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&idx| &self.members[idx])
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

static MEMBER_CACHE: LazyLock<DashMap<(TypeId, bool), Arc<MemberSet>>> =
    LazyLock::new(DashMap::new);

/// Cached member set of `T`, restricted to writable members when
/// `write_required` is set.
pub fn member_set<T: Materialize>(write_required: bool) -> Arc<MemberSet> {
    let key = (TypeId::of::<T>(), write_required);

    // Release the read guard before touching the entry API
    let cached = MEMBER_CACHE.get(&key).map(|set| Arc::clone(set.value()));
    if let Some(set) = cached {
        return set;
    }

    let set = MEMBER_CACHE
        .entry(key)
        .or_insert_with(|| Arc::new(MemberSet::build(T::members(), write_required)));
    Arc::clone(set.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        id: i64,
    }

    impl Materialize for Sample {
        fn members() -> &'static [MemberInfo] {
            const MEMBERS: &[MemberInfo] = &[
                MemberInfo {
                    name: "Id",
                    writable: true,
                    kind: MemberKind::Integer,
                    type_name: "i64",
                },
                MemberInfo {
                    name: "Computed",
                    writable: false,
                    kind: MemberKind::Text,
                    type_name: "String",
                },
                MemberInfo {
                    name: "ID",
                    writable: true,
                    kind: MemberKind::Text,
                    type_name: "String",
                },
            ];
            MEMBERS
        }

        fn assign_member(&mut self, _member: &str, value: &DbValue) -> Result<(), CoercionError> {
            if let DbValue::Int(v) = value {
                self.id = *v;
            }
            Ok(())
        }
    }

    #[test]
    fn test_member_set_filters_read_only() {
        let all = member_set::<Sample>(false);
        let writable = member_set::<Sample>(true);
        assert_eq!(all.len(), 3);
        assert_eq!(writable.len(), 2);
        assert!(writable.find("computed").is_none());
        assert!(all.find("COMPUTED").is_some());
    }

    #[test]
    fn test_member_lookup_first_declaration_wins() {
        let set = member_set::<Sample>(true);
        let member = set.find("id").unwrap();
        assert_eq!(member.name, "Id");
        assert_eq!(member.kind, MemberKind::Integer);
    }

    #[test]
    fn test_member_set_is_cached() {
        let first = member_set::<Sample>(true);
        let second = member_set::<Sample>(true);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &member_set::<Sample>(false)));

        let mut sample = Sample::default();
        sample.assign_member("Id", &DbValue::Int(4)).unwrap();
        assert_eq!(sample.id, 4);
    }

    struct Contended;

    impl Materialize for Contended {
        fn members() -> &'static [MemberInfo] {
            const MEMBERS: &[MemberInfo] = &[
                MemberInfo {
                    name: "Name",
                    writable: true,
                    kind: MemberKind::Text,
                    type_name: "String",
                },
                MemberInfo {
                    name: "Total",
                    writable: false,
                    kind: MemberKind::Float,
                    type_name: "f64",
                },
            ];
            MEMBERS
        }

        fn assign_member(&mut self, _member: &str, _value: &DbValue) -> Result<(), CoercionError> {
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_first_use_shares_one_set() {
        const THREADS: usize = 8;
        let barrier = std::sync::Barrier::new(THREADS);

        let sets: Vec<Arc<MemberSet>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        member_set::<Contended>(true)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let cached = member_set::<Contended>(true);
        for set in &sets {
            assert!(Arc::ptr_eq(set, &cached));
        }
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.find("NAME").map(|m| m.name), Some("Name"));
        assert!(cached.find("total").is_none());
    }
}
