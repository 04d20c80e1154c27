/// Which raw-capture content model a text state belongs to.
///
/// RCDATA decodes character references, RAWTEXT and script data do not. All
/// three only leave the content model on the appropriate end tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RawKind {
    RcData,
    RawText,
    ScriptData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Data,
    RcData,
    RawText,
    ScriptData,
    TagOpen,
    EndTagOpen,
    TagName,
    RawLessThanSign(RawKind),
    RawEndTagOpen(RawKind),
    RawEndTagName(RawKind),
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,
    Doctype,
    BeforeDoctypeName,
    DoctypeName,
    AfterDoctypeName,
    BogusDoctype,
    CharacterReference,
    NamedCharacterReference,
    NumericCharacterReference,
    HexadecimalCharacterReferenceStart,
    DecimalCharacterReferenceStart,
    HexadecimalCharacterReference,
    DecimalCharacterReference,
    NumericCharacterReferenceEnd,
}

impl State {
    /// Text state for a raw content model.
    pub fn for_raw(kind: RawKind) -> State {
        match kind {
            RawKind::RcData => State::RcData,
            RawKind::RawText => State::RawText,
            RawKind::ScriptData => State::ScriptData,
        }
    }

    pub(crate) fn is_attribute_value(self) -> bool {
        matches!(
            self,
            State::AttributeValueDoubleQuoted
                | State::AttributeValueSingleQuoted
                | State::AttributeValueUnquoted
        )
    }
}
