//! Insert command for image nodes

use log::debug;

use crate::doc::{Document, NodeId, Transaction};
use crate::error::DocumentError;
use crate::node::ImageAttrs;
use crate::selection::Selection;

/// Where an insert lands: the cursor when collapsed, otherwise the end of
/// the selected range
pub fn insert_position(selection: &Selection) -> usize {
    selection.cursor().unwrap_or_else(|| selection.to())
}

/// Insert one image node at the current selection.
///
/// Either exactly one node is inserted or the document is left untouched.
pub fn insert_image(
    doc: &mut Document,
    selection: &Selection,
    attrs: ImageAttrs,
) -> Result<NodeId, DocumentError> {
    let pos = insert_position(selection);
    let applied = doc.apply(Transaction::new().insert_image(pos, attrs))?;
    let id = applied.inserted[0];
    debug!("inserted image node {} at {}", id, pos);
    Ok(id)
}
