//! Pest-based parser for the restricted query language

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;

#[derive(Parser)]
#[grammar = "relq.pest"]
pub struct RelqParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("syntax error: {0}")]
    Pest(#[from] pest::error::Error<Rule>),
}

/// Parse query text into a [`Query`] tree.
pub fn parse(source: &str) -> Result<Query, ParseError> {
    let mut pairs = RelqParser::parse(Rule::query, source)?;
    let query_pair = pairs
        .next()
        .ok_or_else(|| ParseError::Syntax("empty input".to_string()))?;
    build_query(query_pair)
}

/// Parse a bare condition, e.g. the `on` text of a structured join request.
pub fn parse_condition(source: &str) -> Result<Condition, ParseError> {
    let mut pairs = RelqParser::parse(Rule::condition_input, source)?;
    let input = pairs
        .next()
        .ok_or_else(|| ParseError::Syntax("empty condition".to_string()))?;
    let condition = input
        .into_inner()
        .find(|p| p.as_rule() == Rule::condition)
        .ok_or_else(|| ParseError::Syntax("missing condition".to_string()))?;
    build_condition(condition)
}

fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, ParseError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ParseError::Syntax(format!("empty {rule:?} node")))
}

fn build_query(pair: Pair<Rule>) -> Result<Query, ParseError> {
    let mut select = Vec::new();
    let mut from = None;
    let mut joins = Vec::new();
    let mut conditions = Vec::new();
    let mut order = Vec::new();
    let mut limit = None;
    let mut offset = None;
    let mut semicolon = false;

    for clause in pair.into_inner() {
        match clause.as_rule() {
            Rule::select_clause => {
                for item in first_inner(clause)?.into_inner() {
                    select.push(build_select_item(item)?);
                }
            }
            Rule::from_clause => {
                from = Some(build_table_ref(first_inner(clause)?)?);
            }
            Rule::join_clause => {
                joins.push(build_join(clause)?);
            }
            Rule::where_clause => {
                for condition in clause.into_inner() {
                    conditions.push(build_condition(condition)?);
                }
            }
            Rule::order_clause => {
                for item in clause.into_inner() {
                    order.push(build_order_key(item)?);
                }
            }
            Rule::limit_clause => {
                limit = Some(build_integer(first_inner(clause)?, "LIMIT")?);
            }
            Rule::offset_clause => {
                offset = Some(build_integer(first_inner(clause)?, "OFFSET")?);
            }
            Rule::semicolon => semicolon = true,
            Rule::EOI => {}
            _ => {}
        }
    }

    Ok(Query {
        select,
        from: from.ok_or_else(|| ParseError::Syntax("missing FROM clause".to_string()))?,
        joins,
        conditions,
        order,
        limit,
        offset,
        semicolon,
    })
}

fn build_select_item(pair: Pair<Rule>) -> Result<SelectItem, ParseError> {
    let mut inner = pair.into_inner();
    let column_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("empty select item".to_string()))?;
    let column = build_column(column_pair)?;
    let alias = inner.next().map(|p| p.as_str().to_string());
    Ok(SelectItem { column, alias })
}

fn build_column(pair: Pair<Rule>) -> Result<ColumnExpr, ParseError> {
    let mut inner = pair.into_inner();
    let qualified = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("empty column reference".to_string()))?;

    let mut parts = qualified.into_inner().map(|p| p.as_str().to_string());
    let first = parts
        .next()
        .ok_or_else(|| ParseError::Syntax("empty column reference".to_string()))?;
    let (qualifier, name) = match parts.next() {
        Some(second) => (Some(first), second),
        None => (None, first),
    };

    let mut path = Vec::new();
    for access in inner {
        path.push(build_jsonb_step(access)?);
    }

    Ok(ColumnExpr {
        qualifier,
        name,
        path,
    })
}

fn build_jsonb_step(pair: Pair<Rule>) -> Result<JsonbStep, ParseError> {
    let mut inner = pair.into_inner();
    let op_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("empty JSONB access".to_string()))?;
    let op = match op_pair.as_str() {
        "->" => JsonbOp::Field,
        "->>" => JsonbOp::Text,
        other => return Err(ParseError::Syntax(format!("unknown JSONB operator: {other}"))),
    };
    let key_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("JSONB access is missing its key".to_string()))?;
    Ok(JsonbStep {
        op,
        key: unquote(key_pair.as_str()),
    })
}

fn build_table_ref(pair: Pair<Rule>) -> Result<TableRef, ParseError> {
    let mut inner = pair.into_inner();
    let name_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("empty table reference".to_string()))?;

    let mut parts = name_pair.into_inner().map(|p| p.as_str().to_string());
    let first = parts
        .next()
        .ok_or_else(|| ParseError::Syntax("empty table reference".to_string()))?;
    let (schema, name) = match parts.next() {
        Some(second) => (Some(first), second),
        None => (None, first),
    };
    let alias = inner.next().map(|p| p.as_str().to_string());

    Ok(TableRef {
        schema,
        name,
        alias,
    })
}

fn build_join(pair: Pair<Rule>) -> Result<JoinClause, ParseError> {
    let mut inner = pair.into_inner();
    let type_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("empty join clause".to_string()))?;
    let join_type = JoinType::parse(type_pair.as_str())
        .ok_or_else(|| ParseError::Syntax(format!("unknown join type: {}", type_pair.as_str())))?;
    let table_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("join is missing its table".to_string()))?;
    let table = build_table_ref(table_pair)?;
    let on_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("join is missing its ON condition".to_string()))?;
    let on = build_condition(on_pair)?;

    Ok(JoinClause {
        join_type,
        table,
        on,
    })
}

fn build_condition(pair: Pair<Rule>) -> Result<Condition, ParseError> {
    let mut inner = pair.into_inner();
    let left_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("empty condition".to_string()))?;
    let left = build_column(left_pair)?;

    let op_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("condition is missing its operator".to_string()))?;
    let op = CompareOp::parse(op_pair.as_str())
        .ok_or_else(|| ParseError::Syntax(format!("unknown operator: {}", op_pair.as_str())))?;

    let operand_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("condition is missing its right-hand side".to_string()))?;
    let rhs = first_inner(operand_pair)?;
    let right = match rhs.as_rule() {
        Rule::value => Operand::Value(build_literal(rhs)?),
        Rule::column => Operand::Column(build_column(rhs)?),
        other => return Err(ParseError::Syntax(format!("invalid condition operand: {other:?}"))),
    };

    Ok(Condition { left, op, right })
}

fn build_literal(pair: Pair<Rule>) -> Result<Literal, ParseError> {
    let inner = first_inner(pair)?;
    match inner.as_rule() {
        Rule::string => Ok(Literal::String(unquote(inner.as_str()))),
        Rule::number => build_number(inner),
        Rule::boolean => Ok(Literal::Bool(inner.as_str().eq_ignore_ascii_case("true"))),
        Rule::jsonb_object => {
            let mut fields = Vec::new();
            for entry in inner.into_inner() {
                let mut kv = entry.into_inner();
                let key_pair = kv
                    .next()
                    .ok_or_else(|| ParseError::Syntax("empty JSONB pair".to_string()))?;
                let value_pair = kv
                    .next()
                    .ok_or_else(|| ParseError::Syntax("JSONB pair is missing its value".to_string()))?;
                fields.push((unquote(key_pair.as_str()), build_literal(value_pair)?));
            }
            Ok(Literal::Object(fields))
        }
        other => Err(ParseError::Syntax(format!("invalid value: {other:?}"))),
    }
}

fn build_number(pair: Pair<Rule>) -> Result<Literal, ParseError> {
    let text = pair.as_str();
    if text.contains('.') {
        text.parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| ParseError::Syntax(format!("invalid number: {text}")))
    } else {
        text.parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| ParseError::Syntax(format!("invalid number: {text}")))
    }
}

fn build_order_key(pair: Pair<Rule>) -> Result<OrderKey, ParseError> {
    let mut inner = pair.into_inner();
    let column_pair = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("empty ORDER BY key".to_string()))?;
    let column = build_column(column_pair)?;
    let desc = inner
        .next()
        .is_some_and(|p| p.as_str().eq_ignore_ascii_case("desc"));
    Ok(OrderKey { column, desc })
}

fn build_integer(pair: Pair<Rule>, clause: &str) -> Result<i64, ParseError> {
    pair.as_str()
        .parse::<i64>()
        .map_err(|_| ParseError::Syntax(format!("{clause} requires an integer, got {}", pair.as_str())))
}

fn unquote(text: &str) -> String {
    text[1..text.len() - 1].replace("''", "'")
}
