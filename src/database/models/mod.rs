pub mod plan;
pub mod user;

pub use plan::{NewPlan, Plan, PlanChanges};
pub use user::{NewUser, PasswordReset, PublicUser, User, UserChanges};

use rand::RngCore;

/// 24 hex characters: 4 bytes of big-endian unix seconds followed by 8 random bytes.
pub fn new_object_id() -> String {
    let mut bytes = [0u8; 12];
    let seconds = chrono::Utc::now().timestamp() as u32;
    bytes[..4].copy_from_slice(&seconds.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}
