use protocol::text::encode_base37;
use protocol::ProtocolError;

/// Identity a player logged in with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    encoded_username: u64,
    session_seed: [u32; 4],
    uid: u32,
}

impl Credentials {
    /// Fails when the username cannot be base-37 encoded.
    pub fn new(username: impl Into<String>, session_seed: [u32; 4], uid: u32) -> Result<Self, ProtocolError> {
        let username = username.into();
        let encoded_username = encode_base37(&username)?;
        Ok(Self {
            username,
            encoded_username,
            session_seed,
            uid,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn encoded_username(&self) -> u64 {
        self.encoded_username
    }

    /// The four key words the client seeded its ciphers with.
    pub fn session_seed(&self) -> [u32; 4] {
        self.session_seed
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }
}
