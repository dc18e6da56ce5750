//! Counter Module
//!
//! Numeric widths supported by the memory driver's increment and decrement
//! operations.

use serde_json::Value;

/// An integer type a stored JSON number can be adjusted as.
pub trait Counter: Copy + Sized {
    /// Type name reported in `NotNumeric` errors
    const NAME: &'static str;

    /// Reads the stored value, `None` if it is not an integer of this width.
    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;

    fn checked_add(self, rhs: Self) -> Option<Self>;

    fn checked_sub(self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_counter {
    ($ty:ty, $name:literal, $read:ident) => {
        impl Counter for $ty {
            const NAME: &'static str = $name;

            fn from_value(value: &Value) -> Option<Self> {
                value.$read().and_then(|n| <$ty>::try_from(n).ok())
            }

            fn into_value(self) -> Value {
                Value::from(self)
            }

            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_add(self, rhs)
            }

            fn checked_sub(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_sub(self, rhs)
            }
        }
    };
}

impl_counter!(isize, "isize", as_i64);
impl_counter!(i64, "i64", as_i64);
impl_counter!(usize, "usize", as_u64);
impl_counter!(u64, "u64", as_u64);
