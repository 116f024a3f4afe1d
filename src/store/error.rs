/// Persistent store errors.
#[derive(Debug)]
pub enum StoreError {
    /// The backing database could not be opened or its schema created.
    Unavailable(sqlx::Error),
    /// A per-request query failed.
    Query(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(e) => write!(f, "store unavailable: {}", e),
            StoreError::Query(e) => write!(f, "store query failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Query(e)
    }
}

/// Username format violations, worded for direct use in client replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameError {
    TooShort,
    TooLong,
    InvalidCharacter,
    Reserved,
}

impl std::fmt::Display for UsernameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsernameError::TooShort => write!(f, "Username must be at least 3 characters."),
            UsernameError::TooLong => write!(f, "Username must be at most 16 characters."),
            UsernameError::InvalidCharacter => {
                write!(f, "Username may only contain letters, digits, and underscores.")
            }
            UsernameError::Reserved => write!(f, "That username is reserved."),
        }
    }
}

impl std::error::Error for UsernameError {}

/// Registration outcomes that are not plain store faults.
#[derive(Debug)]
pub enum RegisterError {
    UsernameTaken,
    Store(StoreError),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::UsernameTaken => write!(f, "username already exists"),
            RegisterError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RegisterError {}

impl From<StoreError> for RegisterError {
    fn from(e: StoreError) -> Self {
        RegisterError::Store(e)
    }
}

/// Login outcomes that are not plain store faults.
#[derive(Debug)]
pub enum LoginError {
    UserNotFound,
    WrongPassword,
    Store(StoreError),
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginError::UserNotFound => write!(f, "unknown username"),
            LoginError::WrongPassword => write!(f, "wrong password"),
            LoginError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<StoreError> for LoginError {
    fn from(e: StoreError) -> Self {
        LoginError::Store(e)
    }
}

/// Rename outcomes that are not plain store faults.
#[derive(Debug)]
pub enum RenameError {
    UsernameTaken,
    NotFound,
    Store(StoreError),
}

impl std::fmt::Display for RenameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenameError::UsernameTaken => write!(f, "username already exists"),
            RenameError::NotFound => write!(f, "no such user"),
            RenameError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RenameError {}

impl From<StoreError> for RenameError {
    fn from(e: StoreError) -> Self {
        RenameError::Store(e)
    }
}
