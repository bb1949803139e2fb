//! Partial state and shallow merging.
//!
//! A store mutates by merging a *patch* into its current state. Typed records
//! get their patch type from the [`state!`](crate::state!) macro; dynamic
//! records can use `serde_json` maps directly.

mod json;

/// A state value that can absorb a partial update.
///
/// `merge` must not modify `self`: it builds the next state, carrying over every
/// field the patch leaves untouched.
pub trait Merge: Sized {
    /// The partial form of this state.
    type Patch;

    /// Shallow-merge `patch` into a copy of `self`.
    fn merge(&self, patch: Self::Patch) -> Self;
}

/// Declare a state struct together with its patch type.
///
/// The patch struct has every field wrapped in `Option`, a chainable setter per
/// field, and the generated [`Merge`] impl replaces exactly the fields that are
/// `Some`. Field types must be `Clone`.
///
/// # Examples
///
/// ```
/// use pantry::{state, Merge};
///
/// state! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Counter => CounterPatch {
///         pub count: i64,
///         pub label: String,
///     }
/// }
///
/// let counter = Counter { count: 1, label: "clicks".to_string() };
/// let next = counter.merge(CounterPatch::default().count(2));
///
/// assert_eq!(next.count, 2);
/// assert_eq!(next.label, "clicks");
/// ```
#[macro_export]
macro_rules! state {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $patch:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        #[doc = concat!("Partial update for [`", stringify!($name), "`].")]
        #[derive(Clone, Default)]
        $vis struct $patch {
            $(
                $field_vis $field: ::core::option::Option<$ty>,
            )*
        }

        impl $patch {
            $(
                #[must_use]
                pub fn $field(mut self, value: $ty) -> Self {
                    self.$field = ::core::option::Option::Some(value);
                    self
                }
            )*

            /// Whether the patch leaves every field untouched.
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }
        }

        impl $crate::Merge for $name {
            type Patch = $patch;

            fn merge(&self, patch: $patch) -> Self {
                $name {
                    $(
                        $field: match patch.$field {
                            ::core::option::Option::Some(value) => value,
                            ::core::option::Option::None => ::core::clone::Clone::clone(&self.$field),
                        },
                    )*
                }
            }
        }
    };
}
