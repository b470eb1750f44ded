//! Registration macro for materializable types.

/// Implement [`Materialize`](crate::mapping::Materialize) for a struct.
///
/// Every listed field becomes a member named after the field. `as "Column"`
/// overrides the member name and `=> readonly` keeps the member out of the
/// materializer's reach. Field types must implement
/// [`FromDbValue`](crate::mapping::FromDbValue).
///
/// # Example
///
/// ```
/// use db_access::impl_materialize;
///
/// #[derive(Default)]
/// struct Person {
///     name: String,
///     age: Option<i32>,
///     display: String,
/// }
///
/// impl_materialize!(Person {
///     name as "Name": String,
///     age: Option<i32>,
///     display: String => readonly,
/// });
/// ```
#[macro_export]
macro_rules! impl_materialize {
    (@name $field:ident) => {
        stringify!($field)
    };
    (@name $field:ident $column:literal) => {
        $column
    };
    (@writable) => {
        true
    };
    (@writable readonly) => {
        false
    };
    ($target:ty {
        $( $field:ident $(as $column:literal)? : $ty:ty $(=> $access:ident)? ),* $(,)?
    }) => {
        impl $crate::mapping::Materialize for $target {
            fn members() -> &'static [$crate::mapping::MemberInfo] {
                const MEMBERS: &[$crate::mapping::MemberInfo] = &[
                    $(
                        $crate::mapping::MemberInfo {
                            name: $crate::impl_materialize!(@name $field $($column)?),
                            writable: $crate::impl_materialize!(@writable $($access)?),
                            kind: <$ty as $crate::mapping::FromDbValue>::KIND,
                            type_name: stringify!($ty),
                        },
                    )*
                ];
                MEMBERS
            }

            fn assign_member(
                &mut self,
                member: &str,
                value: &$crate::models::DbValue,
            ) -> ::std::result::Result<(), $crate::error::CoercionError> {
                $(
                    if member == $crate::impl_materialize!(@name $field $($column)?) {
                        if !$crate::impl_materialize!(@writable $($access)?) {
                            return Err($crate::error::CoercionError::not_writable(member));
                        }
                        self.$field = <$ty as $crate::mapping::FromDbValue>::from_db_value(value)?;
                        return Ok(());
                    }
                )*
                let _ = value;
                Err($crate::error::CoercionError::unknown_member(member))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::error::CoercionError;
    use crate::mapping::{Materialize, MemberKind};
    use crate::models::DbValue;

    #[derive(Debug, Default)]
    struct Account {
        id: i64,
        owner: String,
        balance: Option<f64>,
        label: String,
    }

    impl_materialize!(Account {
        id: i64,
        owner as "OwnerName": String,
        balance: Option<f64>,
        label: String => readonly,
    });

    #[test]
    fn test_members_are_registered_in_order() {
        let names: Vec<&str> = Account::members().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["id", "OwnerName", "balance", "label"]);

        let balance = &Account::members()[2];
        assert_eq!(balance.kind, MemberKind::Float);
        assert_eq!(balance.type_name, "Option<f64>");
        assert!(balance.writable);
        assert!(!Account::members()[3].writable);
    }

    #[test]
    fn test_assign_member() {
        let mut account = Account::default();
        account.assign_member("id", &DbValue::Int(9)).unwrap();
        account
            .assign_member("OwnerName", &DbValue::from("Alice"))
            .unwrap();
        account.assign_member("balance", &DbValue::Float(1.5)).unwrap();
        assert_eq!(account.id, 9);
        assert_eq!(account.owner, "Alice");
        assert_eq!(account.balance, Some(1.5));
    }

    #[test]
    fn test_assign_member_rejections() {
        let mut account = Account::default();
        assert_eq!(
            account.assign_member("label", &DbValue::from("x")),
            Err(CoercionError::not_writable("label"))
        );
        assert_eq!(
            account.assign_member("missing", &DbValue::Int(1)),
            Err(CoercionError::unknown_member("missing"))
        );
        assert!(account.assign_member("id", &DbValue::from("abc")).is_err());
        assert!(account.label.is_empty());
    }
}
