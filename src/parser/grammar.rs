//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::{self, Token};

/// Deepest nesting of action blocks and parenthesised pipelines accepted
pub const MAX_NESTING: usize = 100;

/// Parse template source into an AST
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    let tokens = lexer::lex(input).map_err(|err| vec![err])?;
    check_nesting(&tokens).map_err(|err| vec![err])?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// The grammar recurses once per nested block, so bound the nesting before
/// handing the tokens to it.
fn check_nesting(tokens: &[(Token, lexer::Span)]) -> Result<(), crate::ParseError> {
    let mut depth = 0usize;
    let mut previous: Option<&Token> = None;
    for (token, span) in tokens {
        let opens = match (previous, token) {
            (Some(Token::Open), Token::If | Token::Range | Token::With)
            | (Some(Token::Open), Token::Block | Token::Define)
            | (_, Token::ParenOpen) => true,
            (Some(Token::Open), Token::End) | (_, Token::ParenClose) => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => false,
        };
        if opens {
            depth += 1;
            if depth > MAX_NESTING {
                return Err(crate::ParseError::Syntax {
                    span: span.clone(),
                    message: format!("actions nested deeper than {}", MAX_NESTING),
                    expected: Vec::new(),
                });
            }
        }
        previous = Some(token);
    }
    Ok(())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let open = just(Token::Open);
    let close = just(Token::Close);

    let string_literal = select! {
        Token::String(s) => s,
    };

    // Pipelines nest through parenthesised arguments
    let pipeline = recursive(|pipeline| {
        let function = select! {
            Token::Ident(name) => name,
        }
        .map_with(|name, e| Operand::Function(Spanned::new(name, span_range(&e.span()))));

        let operand = choice((
            just(Token::Dot).to(Operand::Dot),
            select! {
                Token::Field(path) => Operand::Field(path),
                Token::String(s) => Operand::String(s),
                Token::Number(n) => Operand::Number(n),
                Token::True => Operand::Bool(true),
                Token::False => Operand::Bool(false),
                Token::Nil => Operand::Nil,
            },
            function,
            pipeline
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .map(|p: Pipeline| Operand::Pipeline(Box::new(p))),
        ));

        let command = operand
            .repeated()
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|operands| Command { operands });

        command
            .separated_by(just(Token::Pipe))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|commands| Pipeline { commands })
    });

    let end_action = open
        .clone()
        .then(just(Token::End))
        .then(close.clone())
        .ignored();
    let else_action = open
        .clone()
        .then(just(Token::Else))
        .then(close.clone())
        .ignored();

    let node = recursive(|node| {
        let body = node.clone().repeated().collect::<Vec<Node>>();

        let text = select! {
            Token::Text(s) => Node::Text(s),
        };

        // `{{else}} ...`, absent means an empty branch
        let else_branch = else_action
            .clone()
            .ignore_then(body.clone())
            .or_not()
            .map(Option::unwrap_or_default);

        // `{{else if p}} ...`
        let else_if = open
            .clone()
            .ignore_then(just(Token::Else))
            .ignore_then(just(Token::If))
            .ignore_then(pipeline.clone())
            .then_ignore(close.clone())
            .then(body.clone());

        let if_block = open
            .clone()
            .ignore_then(just(Token::If))
            .ignore_then(pipeline.clone())
            .then_ignore(close.clone())
            .then(body.clone())
            .then(else_if.repeated().collect::<Vec<_>>())
            .then(else_branch.clone())
            .then_ignore(end_action.clone())
            .map(|(((condition, then), chain), otherwise)| {
                // else-if chains become nested ifs in the else branch
                let otherwise =
                    chain
                        .into_iter()
                        .rev()
                        .fold(otherwise, |otherwise, (condition, then)| {
                            vec![Node::If {
                                condition,
                                then,
                                otherwise,
                            }]
                        });
                Node::If {
                    condition,
                    then,
                    otherwise,
                }
            });

        let range_block = open
            .clone()
            .ignore_then(just(Token::Range))
            .ignore_then(pipeline.clone())
            .then_ignore(close.clone())
            .then(body.clone())
            .then(else_branch.clone())
            .then_ignore(end_action.clone())
            .map(|((over, body), otherwise)| Node::Range {
                over,
                body,
                otherwise,
            });

        let with_block = open
            .clone()
            .ignore_then(just(Token::With))
            .ignore_then(pipeline.clone())
            .then_ignore(close.clone())
            .then(body.clone())
            .then(else_branch)
            .then_ignore(end_action.clone())
            .map(|((value, body), otherwise)| Node::With {
                value,
                body,
                otherwise,
            });

        let block = open
            .clone()
            .ignore_then(just(Token::Block))
            .ignore_then(string_literal.clone())
            .then(pipeline.clone())
            .then_ignore(close.clone())
            .then(body.clone())
            .then_ignore(end_action.clone())
            .map(|((name, data), body)| Node::Block { name, data, body });

        let define = open
            .clone()
            .ignore_then(just(Token::Define))
            .ignore_then(string_literal.clone())
            .then_ignore(close.clone())
            .then(body)
            .then_ignore(end_action.clone())
            .map(|(name, body)| Node::Define { name, body });

        let template_call = open
            .clone()
            .ignore_then(just(Token::Template))
            .ignore_then(string_literal.clone())
            .then(pipeline.clone().or_not())
            .then_ignore(close.clone())
            .map(|(name, data)| Node::Template { name, data });

        let output = open
            .clone()
            .ignore_then(pipeline.clone())
            .then_ignore(close.clone())
            .map(Node::Output);

        // Note: Order matters! Keyword actions come before the general output action.
        choice((
            text,
            if_block,
            range_block,
            with_block,
            block,
            define,
            template_call,
            output,
        ))
        .boxed()
    });

    node.repeated()
        .collect()
        .then_ignore(end())
        .map(|nodes| Document { nodes })
}
