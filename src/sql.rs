/*
The SQL front-end recognizes a single statement:

  SELECT <projection> FROM <table> [WHERE <col> = <literal>]

where <projection> is `COUNT(*)`, a single column, or a comma-separated
column list, and <literal> is a signed integer or a single- or
double-quoted string. Keywords are case-insensitive; identifiers are
lower-cased on the way out since the catalog's own column names are
compared case-insensitively too.
*/

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{char, digit1, space0, space1};
use nom::combinator::{map_res, opt, recognize};
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    CountStar,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    Text(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub literal: Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectPlan {
    pub projection: Projection,
    pub table: String,
    pub predicate: Option<Predicate>,
}

/// Parses a single `SELECT` statement, translating any parse failure into
/// `EngineError::ParseError` so the executor never sees nom's own error
/// type.
pub fn parse_select(sql: &str) -> Result<SelectPlan> {
    select(sql.trim())
        .map(|(_, plan)| plan)
        .map_err(|err| EngineError::ParseError(format!("{err}")))
}

fn select(input: &str) -> IResult<&str, SelectPlan> {
    let (rem, _) = tag_no_case("SELECT")(input)?;
    let (rem, _) = space1(rem)?;
    let (rem, projection) = projection(rem)?;
    let (rem, _) = space1(rem)?;
    let (rem, _) = tag_no_case("FROM")(rem)?;
    let (rem, _) = space1(rem)?;
    let (rem, table) = field(rem)?;
    let (rem, _) = space0(rem)?;
    let (rem, predicate) = opt(where_clause)(rem)?;
    let (rem, _) = space0(rem)?;

    Ok((
        rem,
        SelectPlan {
            projection,
            table: table.to_lowercase(),
            predicate,
        },
    ))
}

fn projection(input: &str) -> IResult<&str, Projection> {
    alt((count_star, column_list))(input)
}

fn count_star(input: &str) -> IResult<&str, Projection> {
    let (rem, _) = tag_no_case("COUNT")(input)?;
    let (rem, _) = space0(rem)?;
    let (rem, _) = delimited(tag("("), tuple((space0, tag("*"), space0)), tag(")"))(rem)?;
    Ok((rem, Projection::CountStar))
}

fn column_list(input: &str) -> IResult<&str, Projection> {
    let (rem, columns) = separated_list0(tuple((space0, tag(","), space0)), field)(input)?;
    Ok((
        rem,
        Projection::Columns(columns.into_iter().map(|c| c.to_lowercase()).collect()),
    ))
}

fn where_clause(input: &str) -> IResult<&str, Predicate> {
    let (rem, _) = tag_no_case("WHERE")(input)?;
    let (rem, _) = space1(rem)?;
    let (rem, column) = field(rem)?;
    let (rem, _) = space0(rem)?;
    let (rem, _) = tag("=")(rem)?;
    let (rem, _) = space0(rem)?;
    let (rem, literal) = literal(rem)?;
    Ok((
        rem,
        Predicate {
            column: column.to_lowercase(),
            literal,
        },
    ))
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((quoted('\''), quoted('"'), integer))(input)
}

fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, Literal> {
    move |input: &str| {
        let (rem, text) = delimited(
            char(quote),
            take_while(|c: char| c != quote),
            char(quote),
        )(input)?;
        Ok((rem, Literal::Text(text.as_bytes().to_vec())))
    }
}

fn integer(input: &str) -> IResult<&str, Literal> {
    map_res(recognize(preceded(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>().map(Literal::Integer)
    })(input)
}

fn field(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(
            char('"'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == ' '),
            char('"'),
        ),
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}
