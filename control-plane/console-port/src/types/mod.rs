//! All the different types which are cached by the console control-plane and
//! exchanged with the remote engine.

/// The console pages a refresh can target.
pub mod page;
/// Vm pool types.
pub mod pool;
/// Refresh cadence and derived-aggregate types.
pub mod refresh;
/// Virtual machine types.
pub mod vm;

pub use page::{PageKind, TargetPage};
pub use pool::{PoolId, VmPool};
pub use refresh::{DelayConfig, ListCounts, RefreshFlags, UserOptions};
pub use vm::{AttachmentId, DiskAttachment, DiskStatus, ImageId, IsoImage, Vm, VmId, VmStatus};

/// Implements a string-backed resource id newtype.
#[macro_export]
macro_rules! string_id {
    ($Name:ident, $Doc:literal) => {
        #[doc = $Doc]
        #[derive(
            serde::Serialize, serde::Deserialize, Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord,
        )]
        pub struct $Name(String);

        impl std::ops::Deref for $Name {
            type Target = String;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl From<&str> for $Name {
            fn from(id: &str) -> Self {
                $Name(id.to_string())
            }
        }
        impl From<String> for $Name {
            fn from(id: String) -> Self {
                $Name(id)
            }
        }
        impl From<&$Name> for $Name {
            fn from(id: &$Name) -> $Name {
                id.clone()
            }
        }
        impl From<$Name> for String {
            fn from(id: $Name) -> String {
                id.0
            }
        }
        impl Default for $Name {
            /// Generates new blank identifier.
            fn default() -> Self {
                $Name(uuid::Uuid::default().to_string())
            }
        }
        impl $Name {
            /// Build Self from a string trait id.
            pub fn from<T: Into<String>>(id: T) -> Self {
                $Name(id.into())
            }
            /// Generates new random identifier.
            pub fn new() -> Self {
                $Name(uuid::Uuid::new_v4().to_string())
            }
            /// The id as a string slice.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}
