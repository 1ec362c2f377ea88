//! Parses a listing into lines.
//!
//! Nothing here knows about types or instructions beyond their spelling;
//! names are resolved by the driver.

use ecow::EcoString;
use pest::Parser;
use pest::error::{Error as PestError, ErrorVariant};
use pest::iterators::Pair;
use pest_derive::Parser;

use super::Span;
use crate::{Box, String, ToString, Vec, format};

#[derive(Parser)]
#[grammar = "listing/listing.pest"]
pub struct ListingParser;

type ParseResult<T> = Result<T, PestError<Rule>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub kind: LineKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LineKind {
    Class {
        name: EcoString,
        base: Option<EcoString>,
    },
    Method {
        name: EcoString,
        params: Vec<TypeExpr>,
        ret: Option<TypeExpr>,
    },
    End,
    Local {
        name: EcoString,
        ty: TypeExpr,
    },
    Label(EcoString),
    Region(RegionDirective),
    Instruction {
        mnemonic: EcoString,
        operands: Vec<Operand>,
    },
}

/// Exception block directives, each naming its block.
#[derive(Clone, Debug, PartialEq)]
pub enum RegionDirective {
    Try(EcoString),
    Catch(EcoString, TypeExpr),
    CatchAll(EcoString),
    EndCatch(EcoString),
    Finally(EcoString),
    EndFinally(EcoString),
    EndTry(EcoString),
}

/// A type as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    Int32,
    Int64,
    NativeInt,
    Float32,
    Float64,
    Object,
    String,
    /// A class, or a bare name used as a label or local.
    Named(EcoString),
    ValueType(EcoString),
    Array(Box<TypeExpr>),
    Pointer(Box<TypeExpr>),
    ByRef(Box<TypeExpr>),
}

impl TypeExpr {
    /// The name, if this is an undecorated class name without dots.
    pub fn as_simple_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(name) if !name.contains('.') => Some(name),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Owner {
    Class(EcoString),
    ValueType(EcoString),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Integer(i64),
    Float(f64),
    String(EcoString),
    Type(TypeExpr),
    Field {
        ty: TypeExpr,
        owner: Owner,
        name: EcoString,
    },
    Method {
        instance: bool,
        ret: Option<TypeExpr>,
        owner: Option<Owner>,
        name: EcoString,
        params: Vec<TypeExpr>,
    },
    Constructor {
        owner: Owner,
        params: Vec<TypeExpr>,
    },
}

impl Operand {
    /// Short description for "expects ... operand" messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Operand::Integer(_) => "an integer",
            Operand::Float(_) => "a float",
            Operand::String(_) => "a string",
            Operand::Type(_) => "a type or name",
            Operand::Field { .. } => "a field",
            Operand::Method { .. } => "a method",
            Operand::Constructor { .. } => "a constructor",
        }
    }
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    Span(span.start()..span.end())
}

fn custom_error(pair: &Pair<Rule>, message: String) -> PestError<Rule> {
    PestError::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

/// Keyword pairs carry no information beyond the rule they sit in.
fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_class
            | Rule::kw_method
            | Rule::kw_end
            | Rule::kw_local
            | Rule::kw_try
            | Rule::kw_catch
            | Rule::kw_catch_all
            | Rule::kw_end_catch
            | Rule::kw_finally
            | Rule::kw_end_finally
            | Rule::kw_end_try
            | Rule::kw_valuetype
    )
}

fn children<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn next_str<'a>(pairs: &mut impl Iterator<Item = Pair<'a, Rule>>, outer: &Pair<Rule>) -> ParseResult<EcoString> {
    pairs
        .next()
        .map(|p| EcoString::from(p.as_str()))
        .ok_or_else(|| custom_error(outer, "expected a name".to_string()))
}

fn next_pair<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    outer: &Pair<Rule>,
) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| custom_error(outer, format!("malformed {:?}", outer.as_rule())))
}

/// Parses a whole listing.
pub fn parse(source: &str) -> ParseResult<Vec<Line>> {
    let mut pairs = ListingParser::parse(Rule::listing, source)?;
    let Some(listing) = pairs.next() else {
        return Ok(Vec::new());
    };
    listing
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(parse_line)
        .collect()
}

fn parse_line(pair: Pair<Rule>) -> ParseResult<Line> {
    let span = span_of(&pair);
    let kind = match pair.as_rule() {
        Rule::class_decl => {
            let mut inner = children(pair.clone());
            let name = next_str(&mut inner, &pair)?;
            let base = inner.next().map(|p| EcoString::from(p.as_str()));
            LineKind::Class { name, base }
        }
        Rule::method_decl => {
            let mut inner = children(pair.clone());
            let name = next_str(&mut inner, &pair)?;
            let params = parse_params(next_pair(&mut inner, &pair)?)?;
            let ret = match inner.next() {
                Some(ret) => parse_return(ret)?,
                None => None,
            };
            LineKind::Method { name, params, ret }
        }
        Rule::end_method => LineKind::End,
        Rule::local_decl => {
            let mut inner = children(pair.clone());
            let name = next_str(&mut inner, &pair)?;
            let ty = parse_type(next_pair(&mut inner, &pair)?)?;
            LineKind::Local { name, ty }
        }
        Rule::label_def => {
            let mut inner = children(pair.clone());
            LineKind::Label(next_str(&mut inner, &pair)?)
        }
        Rule::try_dir
        | Rule::catch_dir
        | Rule::catch_all_dir
        | Rule::end_catch_dir
        | Rule::finally_dir
        | Rule::end_finally_dir
        | Rule::end_try_dir => LineKind::Region(parse_region(pair)?),
        Rule::instruction => {
            let mut inner = pair.into_inner();
            let mnemonic = inner
                .next()
                .map(|p| EcoString::from(p.as_str()))
                .unwrap_or_default();
            let operands = inner.map(parse_operand).collect::<ParseResult<Vec<_>>>()?;
            LineKind::Instruction { mnemonic, operands }
        }
        rule => return Err(custom_error(&pair, format!("unexpected {rule:?}"))),
    };
    Ok(Line { kind, span })
}

fn parse_region(pair: Pair<Rule>) -> ParseResult<RegionDirective> {
    let rule = pair.as_rule();
    let mut inner = children(pair.clone());
    let name = next_str(&mut inner, &pair)?;
    Ok(match rule {
        Rule::try_dir => RegionDirective::Try(name),
        Rule::catch_dir => RegionDirective::Catch(name, parse_type(next_pair(&mut inner, &pair)?)?),
        Rule::catch_all_dir => RegionDirective::CatchAll(name),
        Rule::end_catch_dir => RegionDirective::EndCatch(name),
        Rule::finally_dir => RegionDirective::Finally(name),
        Rule::end_finally_dir => RegionDirective::EndFinally(name),
        _ => RegionDirective::EndTry(name),
    })
}

fn parse_params(pair: Pair<Rule>) -> ParseResult<Vec<TypeExpr>> {
    pair.into_inner().map(parse_type).collect()
}

/// `None` for `void`.
fn parse_return(pair: Pair<Rule>) -> ParseResult<Option<TypeExpr>> {
    let outer = pair.clone();
    let inner = next_pair(&mut pair.into_inner(), &outer)?;
    match inner.as_rule() {
        Rule::kw_void => Ok(None),
        _ => parse_type(inner).map(Some),
    }
}

fn parse_type(pair: Pair<Rule>) -> ParseResult<TypeExpr> {
    let outer = pair.clone();
    let mut inner = pair.into_inner();
    let base = next_pair(&mut inner, &outer)?;
    let mut ty = match base.as_rule() {
        Rule::prim_ty => match base.as_str() {
            "int32" => TypeExpr::Int32,
            "int64" => TypeExpr::Int64,
            "nint" => TypeExpr::NativeInt,
            "float32" => TypeExpr::Float32,
            "float64" => TypeExpr::Float64,
            "object" => TypeExpr::Object,
            _ => TypeExpr::String,
        },
        Rule::value_ty => {
            let mut names = children(base.clone());
            TypeExpr::ValueType(next_str(&mut names, &base)?)
        }
        _ => TypeExpr::Named(base.as_str().into()),
    };
    for suffix in inner {
        ty = match suffix.as_str() {
            "[]" => TypeExpr::Array(Box::new(ty)),
            "*" => TypeExpr::Pointer(Box::new(ty)),
            _ => TypeExpr::ByRef(Box::new(ty)),
        };
    }
    Ok(ty)
}

fn parse_owner(pair: Pair<Rule>) -> ParseResult<Owner> {
    let outer = pair.clone();
    let inner = next_pair(&mut pair.into_inner(), &outer)?;
    match inner.as_rule() {
        Rule::value_ty => {
            let mut names = children(inner.clone());
            Ok(Owner::ValueType(next_str(&mut names, &inner)?))
        }
        _ => Ok(Owner::Class(inner.as_str().into())),
    }
}

fn parse_operand(pair: Pair<Rule>) -> ParseResult<Operand> {
    match pair.as_rule() {
        Rule::integer => parse_integer(&pair).map(Operand::Integer),
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(Operand::Float)
            .map_err(|_| custom_error(&pair, format!("invalid float literal '{}'", pair.as_str()))),
        Rule::string_lit => {
            let raw = pair.as_str();
            Ok(Operand::String(unescape(&raw[1..raw.len() - 1])))
        }
        Rule::ty => parse_type(pair).map(Operand::Type),
        Rule::field_ref => {
            let outer = pair.clone();
            let mut inner = pair.into_inner();
            let ty = parse_type(next_pair(&mut inner, &outer)?)?;
            let owner = parse_owner(next_pair(&mut inner, &outer)?)?;
            let name = next_str(&mut inner, &outer)?;
            Ok(Operand::Field { ty, owner, name })
        }
        Rule::method_ref => {
            let outer = pair.clone();
            let mut inner = pair.into_inner().peekable();
            let instance = inner
                .next_if(|p| p.as_rule() == Rule::kw_instance)
                .is_some();
            let ret = parse_return(next_pair(&mut inner, &outer)?)?;
            let owner = match inner.next_if(|p| p.as_rule() == Rule::owner) {
                Some(owner) => Some(parse_owner(owner)?),
                None => None,
            };
            let name = next_str(&mut inner, &outer)?;
            let params = parse_params(next_pair(&mut inner, &outer)?)?;
            Ok(Operand::Method {
                instance,
                ret,
                owner,
                name,
                params,
            })
        }
        Rule::ctor_ref => {
            let outer = pair.clone();
            let mut inner = pair.into_inner();
            let owner = parse_owner(next_pair(&mut inner, &outer)?)?;
            let params = parse_params(next_pair(&mut inner, &outer)?)?;
            Ok(Operand::Constructor { owner, params })
        }
        rule => Err(custom_error(&pair, format!("unexpected {rule:?}"))),
    }
}

fn parse_integer(pair: &Pair<Rule>) -> ParseResult<i64> {
    let text = pair.as_str();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    }
    .map_err(|_| custom_error(pair, format!("integer literal '{text}' is out of range")))?;
    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    };
    value.ok_or_else(|| custom_error(pair, format!("integer literal '{text}' is out of range")))
}

fn unescape(raw: &str) -> EcoString {
    let mut out = EcoString::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<LineKind> {
        parse(source)
            .unwrap()
            .into_iter()
            .map(|line| line.kind)
            .collect()
    }

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named(name.into())
    }

    #[test]
    fn test_method_with_locals_and_labels() {
        let source = indoc! {"
            method abs(int32) -> int32
              local tmp int64 // scratch
              ldarg 0
              bge.un done
            done:
              ret
            end
        "};
        assert_eq!(
            kinds(source),
            vec![
                LineKind::Method {
                    name: "abs".into(),
                    params: vec![TypeExpr::Int32],
                    ret: Some(TypeExpr::Int32),
                },
                LineKind::Local {
                    name: "tmp".into(),
                    ty: TypeExpr::Int64,
                },
                LineKind::Instruction {
                    mnemonic: "ldarg".into(),
                    operands: vec![Operand::Integer(0)],
                },
                LineKind::Instruction {
                    mnemonic: "bge.un".into(),
                    operands: vec![Operand::Type(named("done"))],
                },
                LineKind::Label("done".into()),
                LineKind::Instruction {
                    mnemonic: "ret".into(),
                    operands: vec![],
                },
                LineKind::End,
            ]
        );
    }

    #[test]
    fn test_spans_cover_lines() {
        let source = "method f()\n  ret\nend";
        let lines = parse(source).unwrap();
        assert_eq!(lines[1].span, Span(13..16));
        assert_eq!(&source[lines[2].span.0.clone()], "end");
    }

    #[test]
    fn test_class_and_void_method() {
        let source = indoc! {"
            class MyError : System.Exception
            class Plain
            method run() -> void
            end
        "};
        assert_eq!(
            kinds(source),
            vec![
                LineKind::Class {
                    name: "MyError".into(),
                    base: Some("System.Exception".into()),
                },
                LineKind::Class {
                    name: "Plain".into(),
                    base: None,
                },
                LineKind::Method {
                    name: "run".into(),
                    params: vec![],
                    ret: None,
                },
                LineKind::End,
            ]
        );
    }

    #[test]
    fn test_type_syntax() {
        let source = "local p valuetype Point*\nlocal a string[]&\nlocal n nint";
        assert_eq!(
            kinds(source),
            vec![
                LineKind::Local {
                    name: "p".into(),
                    ty: TypeExpr::Pointer(Box::new(TypeExpr::ValueType("Point".into()))),
                },
                LineKind::Local {
                    name: "a".into(),
                    ty: TypeExpr::ByRef(Box::new(TypeExpr::Array(Box::new(TypeExpr::String)))),
                },
                LineKind::Local {
                    name: "n".into(),
                    ty: TypeExpr::NativeInt,
                },
            ]
        );
    }

    #[test]
    fn test_region_directives() {
        let source = indoc! {"
            try t
            catch t System.Exception
            end_catch t
            catch_all t
            end_catch t
            finally t
            end_finally t
            end_try t
        "};
        assert_eq!(
            kinds(source),
            vec![
                LineKind::Region(RegionDirective::Try("t".into())),
                LineKind::Region(RegionDirective::Catch("t".into(), named("System.Exception"))),
                LineKind::Region(RegionDirective::EndCatch("t".into())),
                LineKind::Region(RegionDirective::CatchAll("t".into())),
                LineKind::Region(RegionDirective::EndCatch("t".into())),
                LineKind::Region(RegionDirective::Finally("t".into())),
                LineKind::Region(RegionDirective::EndFinally("t".into())),
                LineKind::Region(RegionDirective::EndTry("t".into())),
            ]
        );
    }

    #[test]
    fn test_keywords_need_a_boundary() {
        assert_eq!(kinds("tryagain:"), vec![LineKind::Label("tryagain".into())]);
        assert_eq!(
            kinds("endless"),
            vec![LineKind::Instruction {
                mnemonic: "endless".into(),
                operands: vec![],
            }]
        );
    }

    #[test]
    fn test_member_operands() {
        let source = indoc! {r#"
            ldfld float64 Circle::radius
            ldsfld int32 valuetype Point::origin
            call instance float64 Shape::Area()
            call int32 Max(int32, int32)
            call void Log(string)
            newobj Circle(float64)
            ldstr "a \"quoted\"\n"
            ldc.r8 -2.5e3
            ldc.i4 0x10
        "#};
        let operands: Vec<Operand> = kinds(source)
            .into_iter()
            .flat_map(|kind| match kind {
                LineKind::Instruction { operands, .. } => operands,
                other => panic!("unexpected line {other:?}"),
            })
            .collect();
        assert_eq!(
            operands,
            vec![
                Operand::Field {
                    ty: TypeExpr::Float64,
                    owner: Owner::Class("Circle".into()),
                    name: "radius".into(),
                },
                Operand::Field {
                    ty: TypeExpr::Int32,
                    owner: Owner::ValueType("Point".into()),
                    name: "origin".into(),
                },
                Operand::Method {
                    instance: true,
                    ret: Some(TypeExpr::Float64),
                    owner: Some(Owner::Class("Shape".into())),
                    name: "Area".into(),
                    params: vec![],
                },
                Operand::Method {
                    instance: false,
                    ret: Some(TypeExpr::Int32),
                    owner: None,
                    name: "Max".into(),
                    params: vec![TypeExpr::Int32, TypeExpr::Int32],
                },
                Operand::Method {
                    instance: false,
                    ret: None,
                    owner: None,
                    name: "Log".into(),
                    params: vec![TypeExpr::String],
                },
                Operand::Constructor {
                    owner: Owner::Class("Circle".into()),
                    params: vec![TypeExpr::Float64],
                },
                Operand::String("a \"quoted\"\n".into()),
                Operand::Float(-2500.0),
                Operand::Integer(16),
            ]
        );
    }

    #[test]
    fn test_integer_limits() {
        assert_eq!(
            kinds("ldc.i8 -9223372036854775808"),
            vec![LineKind::Instruction {
                mnemonic: "ldc.i8".into(),
                operands: vec![Operand::Integer(i64::MIN)],
            }]
        );
        let err = parse("ldc.i8 9223372036854775808").unwrap_err();
        assert!(err.variant.message().contains("out of range"));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse("method f(int32\nend").unwrap_err();
        let pest::error::InputLocation::Pos(pos) = err.location else {
            panic!("expected a position, got {:?}", err.location);
        };
        assert_eq!(pos, 14);
    }
}
