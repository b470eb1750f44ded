//! Result materialization.
//!
//! This module populates plain structs from result rows:
//! - `members`: compile-time member metadata and the process-wide member cache
//! - `coerce`: conversions from `DbValue` into member types
//! - `materializer`: the column/member join and assignment
//! - `names`: case-insensitive name maps used for explicit mappings

#[macro_use]
mod macros;
pub mod coerce;
pub mod materializer;
pub mod members;
pub mod names;

pub use coerce::FromDbValue;
pub use materializer::{CoercionPolicy, Materializer};
pub use members::{Materialize, MemberInfo, MemberKind, MemberSet, member_set};
pub use names::NameMap;
