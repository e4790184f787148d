//! Open documents and their deterministic release.

use crate::error::{Error, Result};
use crate::types::{DocumentFormat, Fragment};
use std::path::Path;

/// An open, editable document.
pub trait Document {
    /// Which kind of document this is.
    fn format(&self) -> DocumentFormat;

    /// Visit every candidate fragment in document order.
    ///
    /// A replacement set on the fragment by the visitor is written back into
    /// the document before the next fragment is visited. An error from the
    /// visitor stops the walk and is returned unchanged.
    fn for_each_fragment(
        &mut self,
        visitor: &mut dyn FnMut(&mut Fragment) -> Result<()>,
    ) -> Result<()>;

    /// Write the edited document to `path`. The source file is never touched.
    fn save_as(&mut self, path: &Path) -> Result<()>;

    /// Release the document. Later calls to other methods fail with [`Error::Closed`].
    fn close(&mut self) -> Result<()>;
}

/// Owns an open document for the duration of one run.
///
/// The document is closed when the session finishes or is dropped, on the
/// success path and on every error path alike. Close failures during drop
/// are logged and swallowed.
pub struct EditorSession<D: Document> {
    document: Option<D>,
}

impl<D: Document> EditorSession<D> {
    pub fn new(document: D) -> Self {
        Self {
            document: Some(document),
        }
    }

    /// Borrow the open document.
    pub fn document_mut(&mut self) -> Result<&mut D> {
        self.document.as_mut().ok_or(Error::Closed)
    }

    /// Save under `path`, then close.
    pub fn finish(mut self, path: &Path) -> Result<()> {
        self.document_mut()?.save_as(path)?;
        self.close()
    }

    /// Close without saving.
    pub fn close(&mut self) -> Result<()> {
        match self.document.take() {
            Some(mut document) => document.close(),
            None => Ok(()),
        }
    }
}

impl<D: Document> Drop for EditorSession<D> {
    fn drop(&mut self) {
        if let Some(mut document) = self.document.take() {
            log::debug!("closing {} without saving", document.format());
            if let Err(e) = document.close() {
                log::warn!("failed to close {}: {}", document.format(), e);
            }
        }
    }
}
