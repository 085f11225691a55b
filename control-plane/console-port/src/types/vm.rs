use crate::string_id;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

string_id!(VmId, "Unique identifier of a virtual machine.");
string_id!(AttachmentId, "Unique identifier of a disk attachment.");
string_id!(ImageId, "Unique identifier of a removable-media image.");

/// A virtual machine as cached from the remote system of record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vm {
    /// Id of the virtual machine.
    pub id: VmId,
    /// Human readable name.
    pub name: String,
    /// Lifecycle status as reported by the remote engine.
    #[serde(default)]
    pub status: VmStatus,
    /// Disk attachments currently known for this vm.
    #[serde(default)]
    pub disk_attachments: Vec<DiskAttachment>,
}

impl Vm {
    /// True while the vm or any of its attached disk images is in a
    /// transitional locked state.
    pub fn image_locked(&self) -> bool {
        self.status == VmStatus::ImageLocked
            || self
                .disk_attachments
                .iter()
                .any(|attachment| attachment.status == DiskStatus::Locked)
    }
}

/// Lifecycle status of a virtual machine.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, Default,
)]
pub enum VmStatus {
    /// The vm is stopped.
    Down,
    /// The vm is running.
    Up,
    /// The vm is paused by the user.
    Paused,
    /// The vm is suspended to disk.
    Suspended,
    /// The vm is in the process of starting.
    PoweringUp,
    /// The vm is in the process of stopping.
    PoweringDown,
    /// A disk image of the vm is locked by a pending storage operation.
    ImageLocked,
    /// The vm is migrating between hosts.
    Migrating,
    /// The remote engine did not report a known status.
    #[default]
    Unknown,
}

/// A disk attachment of a virtual machine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskAttachment {
    /// Id of the attachment.
    pub id: AttachmentId,
    /// Name of the underlying disk.
    pub name: String,
    /// Whether the vm boots from this disk.
    #[serde(default)]
    pub bootable: bool,
    /// Status of the underlying disk image.
    #[serde(default)]
    pub status: DiskStatus,
}

/// Status of a disk image.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, Default,
)]
pub enum DiskStatus {
    /// The image is usable.
    #[default]
    Ok,
    /// The image is locked by a pending storage operation.
    Locked,
    /// The image is in an illegal state.
    Illegal,
}

/// A removable-media image available to attach to a vm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IsoImage {
    /// Id of the image.
    pub id: ImageId,
    /// Human readable file name.
    pub name: String,
}
