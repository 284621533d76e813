//! Content model shared by the adapters, the asset store and the renderer.
//!
//! Every adapter reduces its container to one ordered sequence of
//! [`ContentElement`] values. Images travel through that sequence as
//! [`ImageAsset`] until the asset store writes them and hands back a
//! [`StoredAsset`].

mod asset;
mod diagnostic;
mod element;

pub use asset::{ImageAsset, ImageFormat, StoredAsset};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use element::{ContainerContext, ContentElement, ElementSink, HeadingLevel};
