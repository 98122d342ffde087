//! Format pattern compiler
//!
//! Turns a pattern such as `yyyy-MM-dd[ HH:mm:ss[.SSS]]` into a flat list of
//! [`FormatItem`]s once, so that matching a literal never re-reads the pattern.

use crate::error::{TemporalError, TemporalResult};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{char, satisfy},
    combinator::{all_consuming, map, value},
    error::{Error as NomError, ErrorKind},
    multi::{fold_many1, many0},
    sequence::delimited,
};
use smallvec::SmallVec;
use std::fmt;

/// Compiled pattern, small enough to stay inline for the usual patterns
pub type FormatItems = SmallVec<[FormatItem; 16]>;

/// Numeric field of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `y`
    Year,
    /// `M`
    Month,
    /// `d`
    Day,
    /// `H`, 0-23
    Hour,
    /// `h`, 1-12
    Hour12,
    /// `m`
    Minute,
    /// `s`
    Second,
    /// `S`, fraction of second
    Fraction,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Year => "year",
            Field::Month => "month",
            Field::Day => "day",
            Field::Hour => "hour",
            Field::Hour12 => "hour of half-day",
            Field::Minute => "minute",
            Field::Second => "second",
            Field::Fraction => "fraction of second",
        };
        f.write_str(name)
    }
}

/// One element of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatItem {
    /// Digits for a field; `width` is the number of pattern letters
    Numeric {
        /// Field the digits fill
        field: Field,
        /// Letter count in the pattern
        width: usize,
    },
    /// `AM` or `PM`
    AmPm,
    /// Text that must appear verbatim
    Literal(String),
    /// Section that may be absent from the input
    Optional(Vec<FormatItem>),
}

/// Compile a pattern into format items
pub fn compile(pattern: &str) -> TemporalResult<FormatItems> {
    if pattern.is_empty() {
        return Err(TemporalError::invalid_pattern(pattern, "pattern is empty"));
    }

    match all_consuming(items).parse(pattern) {
        Ok((_, parsed)) => Ok(parsed.into_iter().collect()),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(TemporalError::invalid_pattern(pattern, describe(e.input)))
        }
        Err(nom::Err::Incomplete(_)) => Err(TemporalError::invalid_pattern(
            pattern,
            "pattern ended unexpectedly",
        )),
    }
}

fn describe(rest: &str) -> String {
    match rest.chars().next() {
        Some(']') => "unbalanced ']'".to_string(),
        Some('[') => "optional section is not closed".to_string(),
        Some('\'') => "quoted text is not terminated".to_string(),
        Some('M') => "month names are not supported, use M or MM".to_string(),
        Some('S') => "fractions finer than milliseconds are not supported".to_string(),
        Some(c) if c.is_ascii_alphabetic() => format!("unsupported pattern letter '{c}'"),
        Some(c) => format!("unexpected '{c}'"),
        None => "pattern ended unexpectedly".to_string(),
    }
}

fn items(input: &str) -> IResult<&str, Vec<FormatItem>> {
    many0(item).parse(input)
}

fn item(input: &str) -> IResult<&str, FormatItem> {
    alt((optional_section, quoted_literal, field_run, plain_literal)).parse(input)
}

fn optional_section(input: &str) -> IResult<&str, FormatItem> {
    map(delimited(char('['), items, char(']')), FormatItem::Optional).parse(input)
}

fn quoted_literal(input: &str) -> IResult<&str, FormatItem> {
    alt((
        value(FormatItem::Literal("'".to_string()), tag("''")),
        map(
            delimited(char('\''), quoted_text, char('\'')),
            FormatItem::Literal,
        ),
    ))
    .parse(input)
}

fn quoted_text(input: &str) -> IResult<&str, String> {
    fold_many1(
        alt((is_not("'"), value("'", tag("''")))),
        String::new,
        |mut acc, part: &str| {
            acc.push_str(part);
            acc
        },
    )
    .parse(input)
}

fn field_run(input: &str) -> IResult<&str, FormatItem> {
    let (rest, letter) = satisfy(|c: char| c.is_ascii_alphabetic()).parse(input)?;
    let (rest, run) = take_while(move |c: char| c == letter).parse(rest)?;
    let width = run.len() + 1;

    let field = match letter {
        'y' => Field::Year,
        'M' if width <= 2 => Field::Month,
        'd' => Field::Day,
        'H' => Field::Hour,
        'h' => Field::Hour12,
        'm' => Field::Minute,
        's' => Field::Second,
        'S' if width <= 3 => Field::Fraction,
        'a' => return Ok((rest, FormatItem::AmPm)),
        _ => return Err(nom::Err::Failure(NomError::new(input, ErrorKind::Verify))),
    };
    Ok((rest, FormatItem::Numeric { field, width }))
}

fn plain_literal(input: &str) -> IResult<&str, FormatItem> {
    map(
        satisfy(|c: char| !c.is_ascii_alphabetic() && !matches!(c, '[' | ']' | '\'')),
        |c| FormatItem::Literal(c.to_string()),
    )
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(field: Field, width: usize) -> FormatItem {
        FormatItem::Numeric { field, width }
    }

    fn lit(text: &str) -> FormatItem {
        FormatItem::Literal(text.to_string())
    }

    #[test]
    fn test_compile_date_pattern() {
        let items = compile("yyyy-MM-dd").unwrap();
        assert_eq!(
            items.to_vec(),
            vec![
                num(Field::Year, 4),
                lit("-"),
                num(Field::Month, 2),
                lit("-"),
                num(Field::Day, 2),
            ]
        );
    }

    #[test]
    fn test_compile_nested_optional_sections() {
        let items = compile("yyyy-MM-dd[ HH:mm:ss[.SSS]]").unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(
            items[5],
            FormatItem::Optional(vec![
                lit(" "),
                num(Field::Hour, 2),
                lit(":"),
                num(Field::Minute, 2),
                lit(":"),
                num(Field::Second, 2),
                FormatItem::Optional(vec![lit("."), num(Field::Fraction, 3)]),
            ])
        );
    }

    #[test]
    fn test_compile_quoted_text() {
        let items = compile("yyyy-MM-dd'T'HH").unwrap();
        assert_eq!(items[5], lit("T"));

        let items = compile("hh 'o''clock' a").unwrap();
        assert_eq!(
            items.to_vec(),
            vec![
                num(Field::Hour12, 2),
                lit(" "),
                lit("o'clock"),
                lit(" "),
                FormatItem::AmPm,
            ]
        );

        let items = compile("''").unwrap();
        assert_eq!(items.to_vec(), vec![lit("'")]);
    }

    #[test]
    fn test_compile_rejects_unsupported_letters() {
        let err = compile("dd MMM yyyy").unwrap_err();
        assert!(err.to_string().contains("month names"), "{err}");

        let err = compile("yyyy-MM-dd Q").unwrap_err();
        assert!(err.to_string().contains("'Q'"), "{err}");

        let err = compile("HH:mm:ss.SSSSSS").unwrap_err();
        assert!(err.to_string().contains("finer than milliseconds"), "{err}");
    }

    #[test]
    fn test_compile_rejects_unbalanced_sections() {
        assert!(compile("yyyy[-MM").unwrap_err().to_string().contains("not closed"));
        assert!(compile("yyyy]").unwrap_err().to_string().contains("unbalanced"));
        assert!(compile("yyyy 'T").unwrap_err().to_string().contains("not terminated"));
        assert!(compile("").is_err());
    }
}
