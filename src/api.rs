//! Concrete kinds managed by `fleetctl` and the scheme that registers them.
//!
//! The engine never depends on this module; it is assembled into a
//! [`Serializer`](crate::engine::Serializer) at the application's entry point.

use serde::{Deserialize, Serialize};

use crate::engine::Scheme;
use crate::impl_object;
use crate::meta::{Kind, ObjectMeta, TypeMeta, Uid};

pub const API_VERSION: &str = "fleet.dev/v1alpha1";

pub const KIND_VM: &str = "VM";
pub const KIND_KERNEL: &str = "Kernel";
pub const KIND_IMAGE: &str = "Image";

/// A virtual machine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vm {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: VmSpec,
    #[serde(default)]
    pub status: VmStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSpec {
    /// UID or name of the image the VM boots from.
    #[serde(default)]
    pub image: String,
    /// UID or name of the kernel the VM boots with.
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub cpus: u64,
    #[serde(default)]
    pub memory_mib: u64,
    #[serde(default)]
    pub disk_size_mib: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortMapping>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub host_port: u16,
    pub vm_port: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmState {
    #[default]
    Created,
    Running,
    Stopped,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmStatus {
    #[serde(default)]
    pub state: VmState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
}

impl Vm {
    /// A new VM with a random UID. `created` is left for the store to stamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            type_meta: TypeMeta::new(API_VERSION, KIND_VM),
            metadata: new_meta(name.into()),
            ..Default::default()
        }
    }

    pub fn running(&self) -> bool {
        self.status.state == VmState::Running
    }
}

/// A kernel image VMs boot with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: KernelSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    /// OCI reference the kernel was imported from.
    #[serde(default)]
    pub oci: String,
    #[serde(default)]
    pub version: String,
}

impl Kernel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            type_meta: TypeMeta::new(API_VERSION, KIND_KERNEL),
            metadata: new_meta(name.into()),
            ..Default::default()
        }
    }
}

/// A root filesystem image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ImageSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    #[serde(default)]
    pub oci: String,
    #[serde(default)]
    pub size_bytes: u64,
}

impl Image {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            type_meta: TypeMeta::new(API_VERSION, KIND_IMAGE),
            metadata: new_meta(name.into()),
            ..Default::default()
        }
    }
}

impl_object!(Vm, Kernel, Image);

fn new_meta(name: String) -> ObjectMeta {
    ObjectMeta {
        name,
        uid: Uid::random(),
        ..Default::default()
    }
}

/// Builds the scheme registering every kind in this module.
pub fn scheme() -> Scheme {
    let mut scheme = Scheme::new();
    scheme
        .register::<Vm>(API_VERSION, KIND_VM)
        .register::<Kernel>(API_VERSION, KIND_KERNEL)
        .register::<Image>(API_VERSION, KIND_IMAGE);
    scheme
}

/// Maps user input such as `vm`, `vms` or `Kernels` to a registered kind.
pub fn parse_kind(scheme: &Scheme, input: &str) -> Option<Kind> {
    let input = input.to_ascii_lowercase();
    let singular = input.strip_suffix('s').unwrap_or(&input);
    scheme.kinds().into_iter().find(|kind| {
        let kind_lower = kind.as_str().to_ascii_lowercase();
        kind_lower == input || kind_lower == singular
    })
}
