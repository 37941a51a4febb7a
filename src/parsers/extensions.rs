//! Extensions the bundled parsers own.

/// How much of a file's content a parser can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readability {
    /// Raw bytes are shown verbatim as text.
    Readable,
    /// Only the fact that a revision occurred is reported.
    Opaque,
}

pub const PLAIN_TEXT: &str = ".txt";
pub const JSON: &str = ".json";
pub const CSV: &str = ".csv";
pub const RICH_TEXT: &str = ".rtf";
pub const MARKDOWN: &str = ".md";

pub const DSP_DESIGN: &str = ".tmf";
pub const DSP_CONTROL_DIALOG: &str = ".cdi";
pub const CONFIGURATOR: &str = ".gcp";
pub const CONFIGURATOR_PRO: &str = ".gcpro";
pub const DESIGNER: &str = ".qsys";

/// Compiled control-system package.
pub const COMPILED_PACKAGE: &str = ".lpz";
/// Companion user interface project.
pub const INTERFACE_PROJECT: &str = ".vtz";

/// Extensions whose bytes are shown verbatim.
pub const READABLE: &[&str] = &[PLAIN_TEXT, JSON, CSV, RICH_TEXT, MARKDOWN];

/// Extensions reported only as revised.
pub const OPAQUE: &[&str] = &[
    DSP_DESIGN,
    DSP_CONTROL_DIALOG,
    CONFIGURATOR,
    CONFIGURATOR_PRO,
    DESIGNER,
];

/// Classifies a document extension, `None` if no document parser owns it.
pub fn document_readability(extension: &str) -> Option<Readability> {
    if READABLE.contains(&extension) {
        Some(Readability::Readable)
    } else if OPAQUE.contains(&extension) {
        Some(Readability::Opaque)
    } else {
        None
    }
}
