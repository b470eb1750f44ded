//! Row-to-object materialization.
//!
//! The materializer joins the columns of the current cursor row to the
//! writable members of a [`Materialize`] type, either by case-insensitive name
//! or through an explicit member-to-column [`NameMap`], and assigns every
//! matched, non-NULL value.

use crate::db::cursor::ResultCursor;
use crate::error::{CoercionError, DbError, DbResult};
use crate::mapping::members::{Materialize, MemberInfo, MemberKind, member_set};
use crate::mapping::names::NameMap;
use crate::models::DbValue;
use std::collections::HashMap;
use tracing::debug;

/// What to do with a value that cannot be converted to its member's type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Log the failure and leave the member untouched.
    #[default]
    Lenient,
    /// Fail with [`DbError::Coercion`].
    Strict,
}

/// A matched column/member pair.
#[derive(Debug, Clone)]
struct Binding {
    column: usize,
    column_name: String,
    member: MemberInfo,
}

/// Populates objects from result rows.
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    policy: CoercionPolicy,
    mapping: Option<NameMap>,
}

impl Materializer {
    /// A lenient materializer joining members to columns by name.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: CoercionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Join members to columns through `mapping` (member name to column
    /// name) instead of by name.
    pub fn with_mapping(mut self, mapping: NameMap) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    pub fn mapping(&self) -> Option<&NameMap> {
        self.mapping.as_ref()
    }

    /// Populate `target` from the cursor's current row.
    ///
    /// Returns the number of members assigned. Columns without a member and
    /// members without a column are ignored.
    pub fn populate<T, R>(&self, cursor: &R, target: &mut T) -> DbResult<usize>
    where
        T: Materialize,
        R: ResultCursor + ?Sized,
    {
        let bindings = self.bind::<T, R>(cursor)?;
        self.apply(&bindings, cursor, target)
    }

    /// Build a default `T` and populate it from the cursor's current row.
    pub fn create<T, R>(&self, cursor: &R) -> DbResult<T>
    where
        T: Materialize + Default,
        R: ResultCursor + ?Sized,
    {
        let mut target = T::default();
        self.populate(cursor, &mut target)?;
        Ok(target)
    }

    /// Advance through the remaining rows and materialize each of them.
    pub fn collect<T, R>(&self, cursor: &mut R) -> DbResult<Vec<T>>
    where
        T: Materialize + Default,
        R: ResultCursor + ?Sized,
    {
        let bindings = self.bind::<T, R>(cursor)?;
        let mut items = Vec::new();
        while cursor.advance()? {
            let mut item = T::default();
            self.apply(&bindings, cursor, &mut item)?;
            items.push(item);
        }
        Ok(items)
    }

    /// Compute the column/member pairs for `T` against the cursor's columns.
    fn bind<T, R>(&self, cursor: &R) -> DbResult<Vec<Binding>>
    where
        T: Materialize,
        R: ResultCursor + ?Sized,
    {
        let members = member_set::<T>(true);

        // First occurrence of a column name wins
        let mut columns: HashMap<String, (usize, String)> = HashMap::new();
        for idx in 0..cursor.field_count() {
            let name = cursor.field_name(idx)?;
            columns
                .entry(name.to_lowercase())
                .or_insert_with(|| (idx, name.to_string()));
        }

        let mut bindings = Vec::new();
        match &self.mapping {
            None => {
                for member in members.members() {
                    if let Some((column, column_name)) = columns.get(&member.name.to_lowercase()) {
                        bindings.push(Binding {
                            column: *column,
                            column_name: column_name.clone(),
                            member: *member,
                        });
                    }
                }
            }
            Some(mapping) => {
                for (member_name, mapped_column) in mapping.iter() {
                    let Some(member) = members.find(member_name) else {
                        debug!(member = %member_name, "Mapped member not found or not writable");
                        continue;
                    };
                    let Some((column, column_name)) = columns.get(&mapped_column.to_lowercase())
                    else {
                        debug!(member = %member_name, column = %mapped_column, "Mapped column not in result");
                        continue;
                    };
                    bindings.push(Binding {
                        column: *column,
                        column_name: column_name.clone(),
                        member: *member,
                    });
                }
            }
        }

        Ok(bindings)
    }

    fn apply<T, R>(&self, bindings: &[Binding], cursor: &R, target: &mut T) -> DbResult<usize>
    where
        T: Materialize,
        R: ResultCursor + ?Sized,
    {
        let mut assigned = 0;
        for binding in bindings {
            if cursor.is_null(binding.column)? {
                continue;
            }

            let value = if binding.member.kind == MemberKind::Uuid {
                match cursor.get_uuid(binding.column) {
                    Ok(id) => DbValue::Uuid(id),
                    Err(DbError::Coercion { source, .. }) => {
                        self.reject(binding, source)?;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            } else {
                cursor.value(binding.column)?
            };

            match target.assign_member(binding.member.name, &value) {
                Ok(()) => assigned += 1,
                Err(e) => self.reject(binding, e)?,
            }
        }
        Ok(assigned)
    }

    fn reject(&self, binding: &Binding, error: CoercionError) -> DbResult<()> {
        match self.policy {
            CoercionPolicy::Lenient => {
                debug!(
                    member = %binding.member.name,
                    column = %binding.column_name,
                    error = %error,
                    "Skipping value that does not fit its member"
                );
                Ok(())
            }
            CoercionPolicy::Strict => Err(DbError::coercion(
                binding.member.name,
                &binding.column_name,
                error,
            )),
        }
    }
}
