//! File set transforms for sluice pipelines.
//!
//! Every processing step a pipeline can run (Sass compilation, vendor
//! prefixing, minification, partial inclusion, image optimization) implements
//! the [`Transform`] trait and is looked up by name in a [`TransformRegistry`].

pub mod css;
pub mod fileset;
pub mod html;
pub mod include;
pub mod optimize;
pub mod registry;
pub mod sass;
pub mod traits;

pub use css::{AutoprefixTransform, BeautifyCssTransform, MinifyCssTransform};
pub use fileset::{logical_path, FileEntry, FileSet};
pub use html::{minify_html, MinifyHtmlTransform};
pub use include::IncludePartialsTransform;
pub use optimize::OptimizeImageTransform;
pub use registry::TransformRegistry;
pub use sass::SassTransform;
pub use traits::{Transform, TransformContext, TransformError};
