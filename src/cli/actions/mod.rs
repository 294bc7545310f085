pub mod run;

use crate::provider::forms::FormInput;
use crate::provider::ProviderKind;

/// What the invocation asked for, decoupled from argument parsing.
#[derive(Debug)]
pub enum Action {
    Providers,
    CheckKey {
        provider: ProviderKind,
    },
    Enroll {
        username: String,
        provider: ProviderKind,
        input: FormInput,
    },
    Verify {
        username: String,
        token: String,
    },
    Remove {
        username: String,
    },
    Status {
        username: String,
    },
}
