use crate::entities::users::User;
use serde::{Deserialize, Serialize};

/// What other participants get to see of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDisplay {
    pub id: i64,
    pub username: String,
    pub profile_image: Option<String>,
}

impl From<&User> for UserDisplay {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}
