mod account;
mod ledger;
mod money;
mod password;
mod session;
mod transaction;

pub use account::*;
pub use ledger::*;
pub use money::*;
pub use password::*;
pub use session::*;
pub use transaction::*;
