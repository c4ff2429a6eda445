pub use super::artifact::{Artifact, ArtifactKind, Locator};
pub use super::entrypoint::EntryPointTable;
pub use super::error::{BoxError, Error};
pub use super::hooks::Hooks;
pub use super::id::ModuleId;
pub use super::lookup::{Code, LookupContext, SystemContext};
pub use super::metadata::{DescriptorExtractor, ModuleMeta, RawDependency, RawDescriptor, RawParent};
pub use super::module::Module;
pub use super::registry::Registry;
pub use super::requirement::{Requirement, VersionRange};
pub use super::version::Version;
