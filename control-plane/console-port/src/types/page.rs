use super::vm::VmId;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// What the refresh scheduler should refresh: the page the console currently
/// displays, recorded on navigation and read once per tick.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TargetPage {
    /// Kind of the current page.
    pub kind: PageKind,
    /// Id of the entity the page displays, where the page has one.
    pub id: Option<VmId>,
}

impl TargetPage {
    /// Target the vm list page.
    pub fn list() -> Self {
        Self {
            kind: PageKind::List,
            id: None,
        }
    }
    /// Target the detail page of the given vm.
    pub fn detail(id: impl Into<VmId>) -> Self {
        Self {
            kind: PageKind::Detail,
            id: Some(id.into()),
        }
    }
    /// Target the create/edit page of the given vm.
    pub fn create(id: impl Into<VmId>) -> Self {
        Self {
            kind: PageKind::Create,
            id: Some(id.into()),
        }
    }
    /// Target the console page of the given vm.
    pub fn console(id: impl Into<VmId>) -> Self {
        Self {
            kind: PageKind::Console,
            id: Some(id.into()),
        }
    }
    /// Target the settings page.
    pub fn settings() -> Self {
        Self {
            kind: PageKind::Settings,
            id: None,
        }
    }
}

/// Kind of console page.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, Default,
)]
pub enum PageKind {
    /// The vm and pool list page.
    List,
    /// The detail page of a single vm.
    Detail,
    /// The create/edit page of a single vm.
    Create,
    /// The graphical console page of a single vm.
    Console,
    /// The user settings page.
    Settings,
    /// No page needing refreshes is displayed.
    #[default]
    None,
}
