mod jobber;
mod traits;

pub use jobber::JobberProvider;
pub(crate) use jobber::truncate;
pub use traits::{OAuthProvider, TokenSet};
