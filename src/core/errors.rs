use thiserror::Error;

/// Unified error type for the dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Configuration errors (bounds, unreadable command source)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Resource exhaustion errors (thread creation, allocation)
    #[error("Resource exhausted: {resource}")]
    ResourceExhaustion {
        resource: String,
        details: Option<String>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Persisted counter could not be read or written
    #[error("Counter storage failed for counter {counter}: {operation}")]
    CounterStorage {
        counter: usize,
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed directive or script command
    #[error("Parse error in '{input}': {message}")]
    Parse { input: String, message: String },

    /// IO errors
    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
            expected: None,
            actual: None,
        }
    }

    /// Create a configuration error for a field that is out of bounds
    pub fn configuration_field<F, E, A>(field: F, expected: E, actual: A) -> Self
    where
        F: Into<String>,
        E: Into<String>,
        A: Into<String>,
    {
        let field = field.into();
        let expected = expected.into();
        let actual = actual.into();
        Self::Configuration {
            message: format!("{} must be {}, got {}", field, expected, actual),
            field: Some(field),
            expected: Some(expected),
            actual: Some(actual),
        }
    }

    /// Create a resource exhaustion error
    pub fn resource_exhausted<S: Into<String>, D: Into<String>>(
        resource: S,
        details: D,
        source: std::io::Error,
    ) -> Self {
        Self::ResourceExhaustion {
            resource: resource.into(),
            details: Some(details.into()),
            source: Some(source),
        }
    }

    /// Create a counter storage error
    pub fn counter_storage<S, E>(counter: usize, operation: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::CounterStorage {
            counter,
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a parse error
    pub fn parse<I: Into<String>, M: Into<String>>(input: I, message: M) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if error is recoverable
    ///
    /// Recoverable errors are handled where they occur and never abort a run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::CounterStorage { .. } | Self::Parse { .. } => true,
            Self::Configuration { .. } | Self::ResourceExhaustion { .. } => false,
            Self::Io { .. } | Self::Serialization { .. } | Self::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::ResourceExhaustion { .. } => "resource",
            Self::CounterStorage { .. } => "counter_storage",
            Self::Parse { .. } => "parse",
            Self::Io { .. } => "io",
            Self::Serialization { .. } => "serialization",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DispatchError>;

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        Self::io("io_operation", err)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}
