//! Low level token helpers shared by [`crate::content_line`] and the value
//! codecs in [`crate::values`].
//!
//! RFC 5545 content lines are split on unquoted `:` and `;`: a parameter
//! value wrapped in `DQUOTE` may itself contain `:`, `;` and `,`. Plain
//! `str::split` cannot express that, so the splitters here walk the string
//! once, tracking quote state, using `nom` the way the teacher crate uses it
//! for its own grammar primitives.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::char;
use nom::combinator::{opt, recognize};
use nom::multi::many0;
use nom::sequence::{pair, preceded};
use nom::IResult;

/// `SAFE-CHAR` is "any character except CONTROL, DQUOTE, ';', ':', ','";
/// `iana-token`/property names are alphanumeric plus `-`.
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Parses a property or parameter name: `iana-token / x-name`.
pub fn name(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

/// Parses one double-quoted parameter value, returning the inner text.
pub fn quoted_string(input: &str) -> IResult<&str, &str> {
    let (input, _) = char('"')(input)?;
    let (input, inner) = take_while1(|c| c != '"' && c != '\u{0}')(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, inner))
}

/// Splits `input` on top-level occurrences of `delimiter`, treating any
/// span wrapped in `"` as opaque. Mirrors the teacher's preference for
/// small composable scanners over one monolithic state machine.
pub fn split_unquoted(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0usize;

    for (byte_index, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                parts.push(&input[start..byte_index]);
                start = byte_index + c.len_utf8();
            }
            _ => {}
        }
    }

    parts.push(&input[start..]);
    parts
}

/// Finds the byte offset of the first unquoted occurrence of `delimiter`.
pub fn find_unquoted(input: &str, delimiter: char) -> Option<usize> {
    let mut in_quotes = false;

    for (byte_index, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => return Some(byte_index),
            _ => {}
        }
    }

    None
}

/// `param-value = paramtext / quoted-string`, recognizing (but not
/// unescaping, parameters do not carry TEXT escape sequences) one token.
pub fn param_value(input: &str) -> IResult<&str, &str> {
    alt((quoted_string, recognize(take_while1(|c| c != ',' && c != ';' && c != ':'))))(input)
}

/// A single `;NAME=value1,value2` parameter, returning the name and its
/// (possibly multi-valued) token list.
pub fn param(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    let (input, param_name) = name(input)?;
    let (input, _) = char('=')(input)?;
    let (input, first) = param_value(input)?;
    let (input, rest) = many0(preceded(char(','), param_value))(input)?;

    let mut values = vec![first];
    values.extend(rest);

    Ok((input, (param_name, values)))
}

/// Recognizes a `TRUE`/`FALSE` literal case-sensitively, used by the
/// BOOLEAN-adjacent value parsers.
pub fn boolean_literal(input: &str) -> IResult<&str, bool> {
    alt((
        nom::combinator::value(true, tag("TRUE")),
        nom::combinator::value(false, tag("FALSE")),
    ))(input)
}

/// Recognizes an optional leading sign, returning `-1` or `1`.
pub fn sign(input: &str) -> IResult<&str, i64> {
    let (input, sign) = opt(alt((char('+'), char('-'))))(input)?;
    Ok((input, if sign == Some('-') { -1 } else { 1 }))
}

pub fn digits(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_digit())(input)
}

pub fn signed_integer(input: &str) -> IResult<&str, (i64, &str)> {
    pair(sign, digits)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_respecting_quotes() {
        let parts = split_unquoted(r#"CATEGORIES;X-ONE="A;B",TWO"#, ';');
        assert_eq!(parts, vec!["CATEGORIES", r#"X-ONE="A;B",TWO"#]);
    }

    #[test]
    fn finds_unquoted_colon() {
        let offset = find_unquoted(r#"DTSTART;TZID="Europe:London":20210101"#, ':');
        assert_eq!(offset, Some(28));
    }

    #[test]
    fn parses_multi_valued_param() {
        let (remaining, (name, values)) = param("X-TEST=ONE,TWO,THREE").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(name, "X-TEST");
        assert_eq!(values, vec!["ONE", "TWO", "THREE"]);
    }
}
