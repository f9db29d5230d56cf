//! Parsing and generation configuration surfaces (spec §3, §6).
//!
//! These are plain, `Default`-able structs threaded by reference through
//! every parse/generate call; they carry no I/O and no mutable state of
//! their own (spec §9's singleton-removal redesign note).

use crate::param::ParamValueMode;

/// Recovery policy when the header-field state machine encounters a line
/// with no `:` separator (spec §4.G step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderRecovery {
    /// Skip to the next LF and retry parsing a field there.
    #[default]
    SkipLine,
    /// Treat the malformed line as the start of the message body.
    AssumeEndOfHeaders,
}

/// `{ internationalizedEmail, headerRecovery, charsetConvOptions }` (spec §3
/// Parsing context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingContext {
    pub internationalized_email: bool,
    pub header_recovery: HeaderRecovery,
}

impl Default for ParsingContext {
    fn default() -> Self {
        Self {
            internationalized_email: false,
            header_recovery: HeaderRecovery::default(),
        }
    }
}

/// `{ maxLineLength, prologText, epilogText, paramValueMode,
/// charsetConvOptions }` (spec §3 Generation context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    pub max_line_length: usize,
    pub prolog_text: String,
    pub epilog_text: String,
    pub param_value_mode: ParamValueMode,
}

impl GenerationContext {
    /// RFC-2822 §2.1.1 recommended maximum.
    pub const DEFAULT_MAX_LINE_LENGTH: usize = 78;

    /// Length, in bytes, of a CRLF folding sequence followed by a single
    /// continuation space: used when a generator resets `curLinePos` after
    /// emitting a fold (spec §4.H line budgeting).
    pub const NEW_LINE_SEQUENCE_LENGTH: usize = 1;
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self {
            max_line_length: Self::DEFAULT_MAX_LINE_LENGTH,
            prolog_text: String::new(),
            epilog_text: String::new(),
            param_value_mode: ParamValueMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_context_defaults_to_78_columns() {
        let ctx = GenerationContext::default();
        assert_eq!(ctx.max_line_length, 78);
        assert_eq!(ctx.param_value_mode, ParamValueMode::Rfc2231Only);
    }

    #[test]
    fn parsing_context_defaults_to_skip_line_recovery() {
        let ctx = ParsingContext::default();
        assert_eq!(ctx.header_recovery, HeaderRecovery::SkipLine);
    }
}
