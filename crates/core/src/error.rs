use thiserror::Error;

use crate::auth::AuthError;
use crate::model::{DefinitionError, KeyError, LedgerError};
use crate::session::SessionError;

/// Any failure raised by the exam core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LoginGate;
    use crate::model::AnswerLedger;

    #[test]
    fn layer_errors_convert_with_question_mark() {
        fn login_and_answer() -> Result<(), Error> {
            let mut ledger = AnswerLedger::new(1);
            ledger.set(0, "ok")?;
            LoginGate::new("A").login("B")?;
            Ok(())
        }

        let err = login_and_answer().unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::UnknownCandidate)));
        assert_eq!(err.to_string(), "candidate name is not recognised");
    }
}
