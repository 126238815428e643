use graphql_parser::Pos;

pub type Result<T> = std::result::Result<T, Error>;

/// A compile error together with the file that was being processed when it
/// surfaced. The file is captured from the dependency tracker at failure
/// time; errors raised outside any tracking scope carry `None`.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub file: Option<String>,
}

#[derive(Debug)]
pub enum ErrorKind {
    TypeNotFound {
        name: String,
    },
    FragmentNotFound {
        name: String,
        position: Option<Pos>,
        available: Vec<String>,
    },
    FieldNotFound {
        parent_type_name: String,
        field_name: String,
        position: Option<Pos>,
        available: Vec<String>,
    },
    MissingRootType {
        operation_kind: String,
    },
    DuplicateInputDocument {
        file: String,
    },
    Logic {
        message: String,
    },
    DependencyTracking {
        message: String,
    },
    NodeLocMissing {
        name: String,
    },
    InvalidOption {
        message: String,
    },
    DocumentParse {
        message: String,
    },
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error { kind, file: None }
    }

    pub fn logic(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Logic {
            message: message.into(),
        })
    }

    pub fn tracking(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::DependencyTracking {
            message: message.into(),
        })
    }

    pub fn invalid_option(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidOption {
            message: message.into(),
        })
    }

    /// Attach file context without clobbering context captured deeper in.
    pub fn with_file(mut self, file: Option<&str>) -> Self {
        if self.file.is_none() {
            self.file = file.map(str::to_string);
        }
        self
    }

    pub fn position(&self) -> Option<Pos> {
        match &self.kind {
            ErrorKind::FragmentNotFound { position, .. }
            | ErrorKind::FieldNotFound { position, .. } => *position,
            _ => None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::TypeNotFound { name } => write!(f, "failed lookup of type `{name}`"),
            ErrorKind::FragmentNotFound { name, .. } => {
                write!(f, "unknown spread fragment name `{name}`")
            }
            ErrorKind::FieldNotFound {
                parent_type_name,
                field_name,
                ..
            } => write!(
                f,
                "unknown field `{field_name}` on type `{parent_type_name}`"
            ),
            ErrorKind::MissingRootType { operation_kind } => {
                write!(f, "schema has no root type for {operation_kind} operations")
            }
            ErrorKind::DuplicateInputDocument { file } => {
                write!(f, "document `{file}` is already registered")
            }
            ErrorKind::Logic { message } => write!(f, "{message}"),
            ErrorKind::DependencyTracking { message } => write!(f, "{message}"),
            ErrorKind::NodeLocMissing { name } => {
                write!(f, "no location metadata available for `{name}`")
            }
            ErrorKind::InvalidOption { message } => write!(f, "{message}"),
            ErrorKind::DocumentParse { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {}
