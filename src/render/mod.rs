//! Document assembly — turns a finalized session into artifact bytes.
//!
//! The assembler is a collaborator of the wizard, not part of it: it is
//! handed a fully validated session snapshot (plus the computed payroll
//! breakdown where the category carries one) and is never given an
//! incomplete session.

pub mod text;

use chrono::{DateTime, Utc};

use crate::error::RenderError;
use crate::wizard::FinalizedDocument;

pub use text::TextAssembler;

/// A rendered document artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Renders finalized documents. `generated_at` is rendering metadata only;
/// it never influences computed figures.
pub trait DocumentAssembler: Send + Sync {
    fn render(
        &self,
        document: &FinalizedDocument,
        generated_at: DateTime<Utc>,
    ) -> Result<Artifact, RenderError>;
}
