pub mod artifacts;
pub mod collaborators;

pub use artifacts::{ArtifactInfo, ArtifactKind, ArtifactStore, Image};
pub use collaborators::{AlwaysConfirm, AlwaysDecline, Confirm, StdinConfirm, SystemOpener, UrlOpener};
