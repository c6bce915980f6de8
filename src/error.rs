//! Error types for compilation and evaluation.

/// What stage of compilation rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid token in the source text
    Lexical,

    /// Grammar violation
    Syntax,

    /// Unexpected stack shape or operand type during reduction
    SemanticBuild,

    /// Unknown or invalid reference-system authority code
    CrsResolution,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::SemanticBuild => "semantic error",
            ErrorKind::CrsResolution => "reference system error",
        };
        f.write_str(label)
    }
}

/// A compilation failure with positional context.
///
/// Carries the offending token, its 0-based index, the character offset into
/// the source, the full source text and an optional underlying cause. No
/// partial tree is ever returned alongside one of these.
#[derive(Debug)]
pub struct CompileError {
    kind: ErrorKind,
    message: String,
    token: String,
    token_index: usize,
    position: usize,
    source_text: String,
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CompileError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        token: impl Into<String>,
        token_index: usize,
        position: usize,
        source_text: impl Into<String>,
    ) -> Self {
        CompileError {
            kind,
            message: message.into(),
            token: token.into(),
            token_index,
            position,
            source_text: source_text.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The offending token's lexeme.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// 0-based index of the offending token.
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    /// Character offset of the offending token in the source.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The full source text being compiled.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at position {} (token {} '{}'): {}\n  in: {}",
            self.kind, self.position, self.token_index, self.token, self.message, self.source_text
        )
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Errors raised while evaluating a compiled tree against a candidate.
///
/// Missing properties, non-comparable BETWEEN operands and LIKE over null
/// are absorbed into `false`/null results and never reach this type.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// Type mismatch or invalid operand for an operation
    Type(String),

    /// Integer division by zero
    DivisionByZero,

    /// A LIKE pattern failed to compile
    InvalidPattern(String),

    /// Candidate and filter reference systems differ and cannot be reconciled
    Reprojection(String),

    /// Call to a function the runtime does not provide
    UnknownFunction(String),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Type(msg) => write!(f, "Type error: {}", msg),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::InvalidPattern(msg) => write!(f, "Invalid LIKE pattern: {}", msg),
            EvalError::Reprojection(msg) => write!(f, "Reprojection failed: {}", msg),
            EvalError::UnknownFunction(name) => write!(f, "Unknown function: {}", name),
        }
    }
}

impl std::error::Error for EvalError {}
