//! Declaration-to-image substitution over document trees.
//!
//! Any tree type can take part by implementing [`DocumentNode`]; the visitor
//! walks children depth-first and swaps each diagram fence for an image node
//! pointing at the light asset.

use std::path::Path;

use crate::error::DiagramError;
use crate::extract::{CodeFence, classify};
use crate::job::hash_declaration;
use crate::urls::{DiagramUrls, ImageRef};

/// A node in a parsed document tree.
pub trait DocumentNode: Sized {
    /// Mutable children, or `None` for leaves.
    fn children_mut(&mut self) -> Option<&mut Vec<Self>>;

    /// This node as a fenced code block, if it is one.
    fn as_code_fence(&self) -> Option<CodeFence<'_>>;

    /// Build the node that replaces a diagram declaration.
    fn from_image(image: ImageRef) -> Self;
}

/// Replace every diagram declaration below `root` with an image node.
///
/// Declarations are validated exactly as during extraction. Returns the
/// number of nodes replaced.
pub fn replace_diagrams<N: DocumentNode>(
    root: &mut N,
    document: &Path,
    allowed_root: &Path,
    urls: &DiagramUrls,
) -> Result<usize, DiagramError> {
    let Some(children) = root.children_mut() else {
        return Ok(0);
    };

    let mut replaced = 0;
    for child in children.iter_mut() {
        let declaration = match child.as_code_fence() {
            Some(fence) => classify(document, &fence, allowed_root)?,
            None => None,
        };

        match declaration {
            Some(declaration) => {
                let hash = hash_declaration(&declaration)?;
                *child = N::from_image(urls.image_for(&declaration, &hash));
                replaced += 1;
            }
            None => replaced += replace_diagrams(child, document, allowed_root, urls)?,
        }
    }
    Ok(replaced)
}
