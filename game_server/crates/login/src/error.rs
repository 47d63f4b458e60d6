use player_db::PlayerDbError;
use world::{AdmissionError, ResponseCode};

/// Why an authentication request was refused.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("too many failed logins from this address")]
    TooManyLogins,

    #[error("credential store offline: {0}")]
    StoreOffline(#[source] PlayerDbError),

    #[error("could not complete login: {0}")]
    CouldNotComplete(String),

    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

impl LoginError {
    /// The status byte sent to the client before its session is closed.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::InvalidCredentials => ResponseCode::InvalidCredentials,
            Self::TooManyLogins => ResponseCode::TooManyLogins,
            Self::StoreOffline(_) => ResponseCode::LoginServerOffline,
            Self::CouldNotComplete(_) => ResponseCode::CouldNotComplete,
            Self::Admission(reason) => reason.response_code(),
        }
    }
}

impl From<PlayerDbError> for LoginError {
    fn from(error: PlayerDbError) -> Self {
        match error {
            PlayerDbError::InvalidPassword | PlayerDbError::AccountNotFound(_) => Self::InvalidCredentials,
            PlayerDbError::HashError(reason) => Self::CouldNotComplete(reason),
            PlayerDbError::AccountExists(name) => Self::CouldNotComplete(format!("account {name} was created concurrently")),
            e @ (PlayerDbError::Database(_) | PlayerDbError::Io(_)) => Self::StoreOffline(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_not_credential_failures() {
        let offline = LoginError::from(PlayerDbError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk gone",
        )));
        assert_eq!(offline.response_code(), ResponseCode::LoginServerOffline);
        assert_eq!(
            LoginError::from(PlayerDbError::InvalidPassword).response_code(),
            ResponseCode::InvalidCredentials
        );
        assert_eq!(
            LoginError::from(PlayerDbError::HashError("bad salt".into())).response_code(),
            ResponseCode::CouldNotComplete
        );
        assert_eq!(
            LoginError::from(AdmissionError::ServerFull).response_code(),
            ResponseCode::ServerFull
        );
    }
}
