/// Status byte answering a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Delay,
    Ok,
    InvalidCredentials,
    AccountDisabled,
    AccountOnline,
    GameUpdated,
    ServerFull,
    LoginServerOffline,
    TooManyConnections,
    BadSessionId,
    LoginServerRejectedSession,
    MembersAccountRequired,
    CouldNotComplete,
    Updating,
    ReconnectionOk,
    TooManyLogins,
    InMembersArea,
    InvalidLoginServer,
    ProfileTransfer,
}

impl ResponseCode {
    pub fn value(self) -> u8 {
        match self {
            Self::Delay => 1,
            Self::Ok => 2,
            Self::InvalidCredentials => 3,
            Self::AccountDisabled => 4,
            Self::AccountOnline => 5,
            Self::GameUpdated => 6,
            Self::ServerFull => 7,
            Self::LoginServerOffline => 8,
            Self::TooManyConnections => 9,
            Self::BadSessionId => 10,
            Self::LoginServerRejectedSession => 11,
            Self::MembersAccountRequired => 12,
            Self::CouldNotComplete => 13,
            Self::Updating => 14,
            Self::ReconnectionOk => 15,
            Self::TooManyLogins => 16,
            Self::InMembersArea => 17,
            Self::InvalidLoginServer => 20,
            Self::ProfileTransfer => 21,
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.value())
    }
}
