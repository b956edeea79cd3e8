pub mod activity;
pub mod error;
pub mod handle;
pub mod identity;
pub mod input;
pub mod signature;
pub mod value;

pub use activity::{ActivityKind, ACTIVITY_KIND_COUNT};
pub use error::ErrorKind;
pub use handle::Handle;
pub use identity::Identity;
pub use input::EncryptedInput;
pub use signature::Eip712Signature;
pub use value::{ClearValue, FheType};
