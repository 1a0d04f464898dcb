use keyring::Entry;

use super::{SessionError, SessionPersistence};

const SERVICE_NAME: &str = "musicrec";

/// Keychain account under which the session record is stored
const SESSION_ACCOUNT: &str = "session";

/// Session record kept in the OS keychain.
///
/// Token and profile are stored as one secret, so they are still written
/// and deleted together.
pub struct KeyringSessionPersistence {
    entry: Entry,
}

impl KeyringSessionPersistence {
    pub fn new() -> Result<Self, SessionError> {
        let entry = Entry::new(SERVICE_NAME, SESSION_ACCOUNT)?;
        Ok(Self { entry })
    }
}

impl SessionPersistence for KeyringSessionPersistence {
    fn read(&self) -> Result<Option<String>, SessionError> {
        match self.entry.get_password() {
            Ok(contents) => Ok(Some(contents)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, contents: &str) -> Result<(), SessionError> {
        self.entry.set_password(contents)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
