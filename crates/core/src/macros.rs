// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boilerplate macros shared by the domain types.

/// `Display` for a status-like enum: each variant prints as its wire name.
///
/// ```ignore
/// crate::simple_display! {
///     ReplayStatus {
///         Accepted => "accepted",
///         InProgress => "in_progress",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident => $name:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name: &str = match self {
                    $( Self::$variant => $name, )+
                };
                f.write_str(name)
            }
        }
    };
}

/// Fixture builder for tests: one chained setter per field, every field
/// starting from the given default. `into` setters accept `impl Into<T>`.
///
/// Compiled only for tests and the `test-support` feature.
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $target:ident {
            into { $( $into_field:ident : $into_ty:ty = $into_default:expr ),* $(,)? }
            set { $( $set_field:ident : $set_ty:ty = $set_default:expr ),* $(,)? }
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            inner: $target,
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    inner: $target {
                        $( $into_field: $into_default.into(), )*
                        $( $set_field: $set_default, )*
                    },
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $(
                pub fn $into_field(mut self, value: impl Into<$into_ty>) -> Self {
                    self.inner.$into_field = value.into();
                    self
                }
            )*
            $(
                pub fn $set_field(mut self, value: $set_ty) -> Self {
                    self.inner.$set_field = value;
                    self
                }
            )*

            pub fn build(self) -> $target {
                self.inner
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}
