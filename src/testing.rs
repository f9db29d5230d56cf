//! Test helpers shared across this crate's `#[cfg(test)]` modules.

use std::fmt::Debug;

use nom::IResult;

/// Runs `parser` against `test`, asserting both the parsed value and the
/// unconsumed remainder match what's expected.
pub(crate) fn known_answer_test_parse<'a, O, P>(
    (test, expected_remainder, expected_object): (&'a [u8], &'a [u8], O),
    parser: P,
) where
    O: Debug + PartialEq,
    P: Fn(&'a [u8]) -> IResult<&'a [u8], O>,
{
    let (got_remainder, got_object) = parser(test).expect("parse should succeed");
    assert_eq!(expected_remainder, got_remainder);
    assert_eq!(expected_object, got_object);
}

/// Asserts `parser` rejects `test` outright (used for the lexical grammars'
/// negative cases, e.g. a token containing a `tspecial`).
pub(crate) fn assert_parse_fails<'a, O, P>(test: &'a [u8], parser: P)
where
    O: Debug,
    P: Fn(&'a [u8]) -> IResult<&'a [u8], O>,
{
    assert!(parser(test).is_err(), "expected parse of {:?} to fail", test);
}
