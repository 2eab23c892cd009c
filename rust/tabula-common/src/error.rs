use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(name: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: Default::default(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn invalid_name(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidName {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn column_not_found(dataset: impl Into<String>, column: impl Into<String>) -> Error {
        Error(
            ErrorKind::ColumnNotFound {
                dataset: dataset.into(),
                column: column.into(),
            }
            .into(),
        )
    }

    pub fn dataset_not_found(name: impl Into<String>) -> Error {
        Error(ErrorKind::DatasetNotFound { name: name.into() }.into())
    }

    pub fn filter_not_found(name: impl Into<String>) -> Error {
        Error(ErrorKind::FilterNotFound { name: name.into() }.into())
    }

    pub fn expression(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Expression {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn store_type(
        column: impl Into<String>,
        row: usize,
        value: impl Into<String>,
        datatype: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::StoreType {
                column: column.into(),
                row,
                value: value.into(),
                datatype: datatype.into(),
            }
            .into(),
        )
    }

    pub fn dataset_locked(name: impl Into<String>) -> Error {
        Error(ErrorKind::DatasetLocked { name: name.into() }.into())
    }

    pub fn axis_mismatch(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::AxisMismatch {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn serialization<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Serialization {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    /// Returns `true` if the error is a syntax or operator error raised while
    /// compiling a filter expression.
    pub fn is_expression(&self) -> bool {
        matches!(self.kind(), ErrorKind::Expression { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("{message}")]
    InvalidName { message: String },

    #[error("column '{column}' not found in dataset '{dataset}'")]
    ColumnNotFound { dataset: String, column: String },

    #[error("dataset '{name}' not found")]
    DatasetNotFound { name: String },

    #[error("unknown filter '{name}'")]
    FilterNotFound { name: String },

    #[error("expression error: {message}")]
    Expression { message: String },

    #[error(
        "bad data type, column '{column}' at index {row}, value {value}, should be datatype {datatype}"
    )]
    StoreType {
        column: String,
        row: usize,
        value: String,
        datatype: String,
    },

    #[error("dataset '{name}' already locked")]
    DatasetLocked { name: String },

    #[error("axis mismatch: {message}")]
    AxisMismatch { message: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("serialization error: {context}")]
    Serialization {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(e: bincode::error::EncodeError) -> Self {
        Error::serialization("bincode encode", e)
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(e: bincode::error::DecodeError) -> Self {
        Error::serialization("bincode decode", e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization("json", e)
    }
}
