//! Error types for the injector hierarchy.

use thiserror::Error;

/// Boxed error returned by user constructors and factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Dependency injection errors
///
/// Every failure raised by registration or resolution belongs to this single
/// family, so callers can match on the variant they care about and propagate
/// the rest with `?`.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{DiError, Injector, Token};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let injector = Injector::create("Main", None);
/// let token: Token<u32> = Token::new("port");
///
/// match injector.resolve(&token).await {
///     Err(DiError::UnresolvedProvider { path, .. }) => {
///         assert_eq!(path.first().map(String::as_str), Some("Main"));
///     }
///     _ => unreachable!(),
/// }
/// # }
/// ```
#[derive(Debug, Error)]
pub enum DiError {
    /// Registration input had no identifier, no payload, or several payloads
    #[error("Invalid provider: {0}")]
    InvalidProviderShape(String),

    /// No provider for the identifier anywhere in the visited injectors
    #[error(
        "\"{identifier}\" is not provided globally nor is registered in any of the following injectors: {}",
        path.join(" -> ")
    )]
    UnresolvedProvider {
        identifier: String,
        path: Vec<String>,
    },

    /// A required constructor parameter or factory dependency resolved to nothing
    #[error("Missing dependency at position {position} ({target})")]
    MissingDependency { target: String, position: usize },

    /// The process already has a root injector
    #[error("A root injector already exists for this process")]
    RootCreationForbidden,

    /// `get` was called for an identifier that has not been built yet
    #[error(
        "Instance \"{identifier}\" not found. Ensure it's a global injectable or it's registered in the injector you're using ({injector})"
    )]
    InstanceNotFound { identifier: String, injector: String },

    /// Cached value is not of the requested type
    #[error("Type mismatch for {identifier}: expected {expected}")]
    TypeMismatch {
        identifier: String,
        expected: &'static str,
    },

    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// A configuration key is missing or holds a value of the wrong kind
    #[error("Configuration error: {0}")]
    Config(String),

    /// User constructor or factory code returned an error
    #[error("Failed to construct {identifier}: {source}")]
    Construction {
        identifier: String,
        #[source]
        source: BoxError,
    },
}

impl DiError {
    /// True when the error means "nothing is registered for this identifier".
    pub fn is_unresolved(&self) -> bool {
        matches!(self, DiError::UnresolvedProvider { .. })
    }
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
