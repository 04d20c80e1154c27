//! Insertion modes used by the tree builder state machine.
//!
//! Only the subset needed for documents without tables, templates or framesets.
//! Table and frameset tokens are handled by the InBody rules.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertionMode {
    #[default]
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    AfterHead,
    InBody,
    Text,
    AfterBody,
    AfterAfterBody,
}
