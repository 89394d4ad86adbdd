use crate::ast::Position;
use serde::{Deserialize, Serialize};

/// A fatal compilation error. Compilation of the file stops at the first one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// Input that no token class accepts.
    #[error("{position}: unrecognized input '{text}'")]
    Lex { position: Position, text: String },

    #[error("{position}: expected {}, found {found}", .expected.join(" or "))]
    Syntax {
        position: Position,
        expected: Vec<String>,
        found: String,
    },

    /// A block was still open when its enclosing block or the input ended.
    #[error("{position}: unterminated {block} opened at {opened_at}, found {found}")]
    UnterminatedBlock {
        block: String,
        opened_at: Position,
        position: Position,
        found: String,
    },

    #[error("{position}: duplicate {kind} '{name}', first defined at {first}")]
    DuplicateDefinition {
        kind: String,
        name: String,
        position: Position,
        first: Position,
    },

    #[error("{position}: unknown vowel-transition key '{key}'")]
    UnknownKey { key: String, position: Position },

    #[error("{position}: '{text}' is not a valid {expected}")]
    InvalidLiteral {
        text: String,
        expected: String,
        position: Position,
    },

    #[error("{position}: cannot include '{name}': {message}")]
    Include {
        name: String,
        position: Position,
        message: String,
    },

    /// Raised by link checks, never by the compilers themselves.
    #[error("unknown {kind} '{name}' referenced from {context}")]
    UnknownReference {
        kind: String,
        name: String,
        context: String,
    },

    /// An error inside an included table.
    #[error("in table '{table}': {error}")]
    InTable {
        table: String,
        error: Box<CompileError>,
    },
}

impl CompileError {
    pub(crate) fn syntax(position: Position, expected: &[&str], found: impl Into<String>) -> Self {
        CompileError::Syntax {
            position,
            expected: expected.iter().map(|s| (*s).to_owned()).collect(),
            found: found.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lex { .. } => "LexError",
            CompileError::Syntax { .. } => "SyntaxError",
            CompileError::UnterminatedBlock { .. } => "UnterminatedBlockError",
            CompileError::DuplicateDefinition { .. } => "DuplicateDefinitionError",
            CompileError::UnknownKey { .. } => "UnknownKeyError",
            CompileError::InvalidLiteral { .. } => "InvalidLiteralError",
            CompileError::Include { .. } => "IncludeError",
            CompileError::UnknownReference { .. } => "UnknownReferenceError",
            CompileError::InTable { error, .. } => error.kind(),
        }
    }

    /// Where the error was detected; `None` for link-time reference errors.
    pub fn position(&self) -> Option<Position> {
        match self {
            CompileError::Lex { position, .. }
            | CompileError::Syntax { position, .. }
            | CompileError::UnterminatedBlock { position, .. }
            | CompileError::DuplicateDefinition { position, .. }
            | CompileError::UnknownKey { position, .. }
            | CompileError::InvalidLiteral { position, .. }
            | CompileError::Include { position, .. } => Some(*position),
            CompileError::UnknownReference { .. } => None,
            CompileError::InTable { error, .. } => error.position(),
        }
    }

    /// JSON form for host tools.
    pub fn to_json_value(&self) -> serde_json::Value {
        let table = match self {
            CompileError::InTable { table, .. } => Some(table.as_str()),
            _ => None,
        };
        serde_json::json!({
            "kind":    self.kind(),
            "table":   table,
            "line":    self.position().map(|p| p.line),
            "column":  self.position().map(|p| p.column),
            "message": self.to_string(),
        })
    }
}

/// A non-fatal finding reported next to a successfully compiled tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Diagnostic {
            position,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_lists_expected_tokens() {
        let err = CompileError::syntax(Position::new(2, 5), &["'THEN'", "'AND'"], "'ELSE'");
        assert_eq!(
            err.to_string(),
            "2:5: expected 'THEN' or 'AND', found 'ELSE'"
        );
        assert_eq!(err.kind(), "SyntaxError");
    }

    #[test]
    fn nested_error_reports_inner_position() {
        let inner = CompileError::InvalidLiteral {
            text: "abc".into(),
            expected: "integer".into(),
            position: Position::new(4, 9),
        };
        let err = CompileError::InTable {
            table: "ph_english".into(),
            error: Box::new(inner),
        };
        assert_eq!(err.position(), Some(Position::new(4, 9)));
        assert_eq!(err.kind(), "InvalidLiteralError");
        let json = err.to_json_value();
        assert_eq!(json["table"], "ph_english");
        assert_eq!(json["line"], 4);
    }

    #[test]
    fn reference_errors_have_no_position() {
        let err = CompileError::UnknownReference {
            kind: "procedure".into(),
            name: "stress_a".into(),
            context: "phoneme 'a'".into(),
        };
        assert_eq!(err.position(), None);
        assert!(err.to_json_value()["line"].is_null());
    }
}
