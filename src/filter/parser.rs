use std::iter::Peekable;
use std::vec::IntoIter;

use super::lexer::Token;
use super::{ContentKind, FilterError, MessageFilter};

/// A recursive-descent parser over the token list.
///
/// Precedence, low to high: `or`, `and` (explicit or implied by adjacency),
/// unary negation, primaries.
pub(crate) struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens: tokens.into_iter().peekable() }
    }

    /// Parses the whole expression, requiring every token to be consumed.
    pub fn parse(mut self) -> Result<MessageFilter, FilterError> {
        let filter = self.parse_or()?;

        match self.tokens.next() {
            None => Ok(filter),
            Some(Token::Close) => Err(FilterError::UnbalancedParens),
            Some(_) => Err(FilterError::DanglingInput),
        }
    }

    fn parse_or(&mut self) -> Result<MessageFilter, FilterError> {
        let mut left = self.parse_and()?;

        while self.tokens.next_if_eq(&Token::Or).is_some() {
            let right = self.parse_and()?;

            left = MessageFilter::Either(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<MessageFilter, FilterError> {
        let mut left = self.parse_unary()?;

        loop {
            let explicit = self.tokens.next_if_eq(&Token::And).is_some();

            // Adjacency implies a conjunction: two terms with no operator,
            // closer, or end between them.
            if !explicit && !self.peek_starts_term() {
                return Ok(left);
            }

            let right = self.parse_unary()?;

            left = MessageFilter::Both(Box::new(left), Box::new(right));
        }
    }

    fn peek_starts_term(&mut self) -> bool {
        matches!(
            self.tokens.peek(),
            Some(Token::Word(_) | Token::Quoted(_) | Token::Open | Token::Not)
        )
    }

    fn parse_unary(&mut self) -> Result<MessageFilter, FilterError> {
        if self.tokens.next_if_eq(&Token::Not).is_some() {
            return Ok(self.parse_primary()?.negate());
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<MessageFilter, FilterError> {
        match self.tokens.next() {
            Some(Token::Open) => {
                let inner = self.parse_or()?;

                match self.tokens.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(FilterError::UnbalancedParens),
                }
            }
            Some(Token::Quoted(value)) => Ok(MessageFilter::Contains(value)),
            Some(Token::Word(word)) => {
                if self.tokens.next_if_eq(&Token::Colon).is_none() {
                    return Ok(MessageFilter::Contains(word));
                }

                let value = match self.tokens.next() {
                    Some(Token::Word(value) | Token::Quoted(value)) if !value.is_empty() => value,
                    _ => return Err(FilterError::EmptyValue(word)),
                };

                Ok(match word.to_ascii_lowercase().as_str() {
                    "contains" => MessageFilter::Contains(value),
                    "from" => MessageFilter::From(value),
                    "mentions" => MessageFilter::Mentions(value),
                    "reaction" => MessageFilter::Reaction(value),
                    "has" => MessageFilter::Has(ContentKind::parse(&value)?),
                    // Unknown operators fold back into plain search text.
                    _ => MessageFilter::Contains(format!("{word}:{value}")),
                })
            }
            Some(Token::Close) => Err(FilterError::UnbalancedParens),
            _ => Err(FilterError::DanglingOperator),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tokenize;
    use super::*;

    fn parse(text: &str) -> Result<MessageFilter, FilterError> {
        Parser::new(tokenize(text).unwrap()).parse()
    }

    #[test]
    fn implicit_and_binds_adjacent_terms() {
        let filter = parse("from:john has:link").unwrap();

        assert_eq!(
            filter,
            MessageFilter::Both(
                Box::new(MessageFilter::From("john".to_owned())),
                Box::new(MessageFilter::Has(ContentKind::Link)),
            )
        );
    }

    #[test]
    fn or_binds_weaker_than_and() {
        let filter = parse("a b or c").unwrap();

        assert_eq!(
            filter,
            MessageFilter::Either(
                Box::new(MessageFilter::Both(
                    Box::new(MessageFilter::Contains("a".to_owned())),
                    Box::new(MessageFilter::Contains("b".to_owned())),
                )),
                Box::new(MessageFilter::Contains("c".to_owned())),
            )
        );
    }

    #[test]
    fn negation_applies_to_primaries() {
        let filter = parse("-has:pin").unwrap();

        assert_eq!(filter, MessageFilter::Negate(Box::new(MessageFilter::Has(ContentKind::Pin))));
    }

    #[test]
    fn parens_group() {
        let filter = parse("-(a or b)").unwrap();

        assert_eq!(
            filter,
            MessageFilter::Negate(Box::new(MessageFilter::Either(
                Box::new(MessageFilter::Contains("a".to_owned())),
                Box::new(MessageFilter::Contains("b".to_owned())),
            )))
        );
    }

    #[test]
    fn unknown_operator_becomes_text() {
        assert_eq!(parse("near:john").unwrap(), MessageFilter::Contains("near:john".to_owned()));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        assert!(matches!(parse("(a or b"), Err(FilterError::UnbalancedParens)));
        assert!(matches!(parse("a or"), Err(FilterError::DanglingOperator)));
        assert!(matches!(parse("a)"), Err(FilterError::UnbalancedParens)));
        assert!(matches!(parse("from:"), Err(FilterError::EmptyValue(_))));
        assert!(matches!(parse("has:window"), Err(FilterError::UnknownContentKind(_))));
    }
}
