//! Calculator Tool
//!
//! Evaluates arithmetic expressions via a small recursive-descent
//! parser. Supports `+ - * / ^`, parentheses and unary minus.

use async_trait::async_trait;

use agent_core::{
    tool::{parse_arguments, ParameterSchema},
    AgentError, Result, Tool, ToolSpec,
};

/// Tool for arithmetic expression evaluation
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "calculator".into(),
            description: "Evaluate a mathematical expression. Use for math problems like \
                          '25 * 4' or '(5 + 3) * 2'. Supports +, -, *, /, ^ and parentheses."
                .into(),
            parameters: vec![ParameterSchema {
                name: "expression".into(),
                param_type: "string".into(),
                description: "The expression to evaluate, e.g. '25 * 4 + 10'".into(),
                required: true,
            }],
        }
    }

    async fn execute(&self, arguments_text: &str) -> Result<String> {
        let args = parse_arguments(arguments_text, "expression");
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::ToolExecution("missing 'expression' argument".into()))?;

        tracing::debug!(%expression, "evaluating expression");
        let value = evaluate(expression).map_err(AgentError::ToolExecution)?;
        Ok(format_number(value))
    }
}

/// Render without a trailing `.0` for whole numbers
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                // Accept Python-style `**` as power
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::Caret);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{literal}'"))?;
                tokens.push(Token::Number(number));
            }
            other => return Err(format!("unexpected character '{other}' in expression")),
        }
    }

    if tokens.is_empty() {
        return Err("empty expression".into());
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// expression := term (('+' | '-') term)*
    fn expression(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let rhs = self.term()?;
            value = match op {
                Token::Plus => value + rhs,
                _ => value - rhs,
            };
        }
        Ok(value)
    }

    /// term := unary (('*' | '/') unary)*
    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.advance();
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ => {
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value / rhs
                }
            };
        }
        Ok(value)
    }

    /// unary := '-' unary | power
    fn unary(&mut self) -> std::result::Result<f64, String> {
        if self.peek() == Some(Token::Minus) {
            self.advance();
            return Ok(-self.unary()?);
        }
        self.power()
    }

    /// power := atom ('^' unary)?   (right-associative)
    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Caret) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    /// atom := number | '(' expression ')'
    fn atom(&mut self) -> std::result::Result<f64, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                if self.advance() != Some(Token::RParen) {
                    return Err("missing closing parenthesis".into());
                }
                Ok(value)
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expr: &str) -> std::result::Result<f64, String> {
    let tokens = tokenize(expr)?;
    let token_count = tokens.len();
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;

    if parser.pos != token_count {
        return Err(format!("invalid mathematical expression '{expr}'"));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{
        Conversation, LoopConfig, ModelClient, ModelTurn, ToolCallRequest, ToolRegistry,
    };
    use agent_core::reasoning::ReasoningLoop;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_basic_arithmetic() {
        assert!((evaluate("2 + 2").unwrap() - 4.0).abs() < f64::EPSILON);
        assert!((evaluate("10 * 5").unwrap() - 50.0).abs() < f64::EPSILON);
        assert!((evaluate("(2 + 3) * 4").unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((evaluate("2 ^ 8").unwrap() - 256.0).abs() < f64::EPSILON);
        assert!((evaluate("25 ** 0.5").unwrap() - 5.0).abs() < f64::EPSILON);
        assert!((evaluate("-3 + 5").unwrap() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_precedence() {
        assert!((evaluate("25 * 4 + 10").unwrap() - 110.0).abs() < f64::EPSILON);
        assert!((evaluate("10 + 2 * 3").unwrap() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_division_by_zero() {
        let err = evaluate("1 / 0").unwrap_err();
        assert!(err.contains("division by zero"));
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(evaluate("").is_err());
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("(2 + 3").is_err());
        assert!(evaluate("abc").is_err());
    }

    #[test]
    fn test_whole_numbers_render_without_decimals() {
        assert_eq!(format_number(110.0), "110");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[tokio::test]
    async fn test_execute_with_json_arguments() {
        let output = CalculatorTool
            .execute(r#"{"expression": "25 * 4 + 10"}"#)
            .await
            .unwrap();
        assert_eq!(output, "110");
    }

    #[tokio::test]
    async fn test_execute_with_bare_expression() {
        let output = CalculatorTool.execute("6 * 7").await.unwrap();
        assert_eq!(output, "42");
    }

    /// Model stub replaying a fixed script
    struct ScriptedModel(Mutex<VecDeque<ModelTurn>>);

    #[async_trait::async_trait]
    impl ModelClient for ScriptedModel {
        async fn infer(
            &self,
            _conversation: &Conversation,
            _catalog: &[agent_core::ToolSpec],
        ) -> agent_core::Result<ModelTurn> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ModelTurn::Final("done".into())))
        }

        async fn probe(&self) -> agent_core::Result<()> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_calculator_through_the_loop() {
        let mut tools = ToolRegistry::new();
        tools.register(CalculatorTool).unwrap();

        let model = ScriptedModel(Mutex::new(VecDeque::from(vec![
            ModelTurn::ToolCalls(vec![ToolCallRequest {
                name: "calculator".into(),
                arguments_text: r#"{"expression": "25 * 4 + 10"}"#.into(),
            }]),
            ModelTurn::Final("The result is 110.".into()),
        ])));

        let looped = ReasoningLoop::new(
            Arc::new(model),
            Arc::new(tools),
            "seed",
            LoopConfig::default(),
        );

        let reply = looped.run("what is 25 * 4 + 10?").await.unwrap();
        assert!(reply.content.contains("110"));
        assert_eq!(reply.used_tools.len(), 1);
        assert_eq!(reply.used_tools[0].tool_name, "calculator");
        assert_eq!(reply.used_tools[0].result_text, "110");
        assert!(reply.used_tools[0].success);
    }
}
