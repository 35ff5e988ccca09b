mod model;
mod store;

pub use model::{Account, NewAccount, Role, INITIAL_CREDITS};
pub use store::AccountStore;
