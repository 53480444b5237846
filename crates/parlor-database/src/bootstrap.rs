//! First-run bootstrap data: the system user, the default lobby room, and
//! a welcome message. The attach endpoint defaults to room id 1, so the
//! lobby must exist before the first connection arrives.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use parlor_core::result::AppResult;
use parlor_entity::membership::MemberRole;
use parlor_entity::message::NewMessage;

use crate::repositories::room::CreateRoom;
use crate::repositories::user::CreateUser;
use crate::repositories::{
    MembershipRepository, MessageRepository, RoomRepository, UserRepository,
};

/// Create default data when the database holds no rooms yet.
///
/// `hash_password` hashes a throwaway credential for the system account;
/// the plaintext is discarded, so the account cannot be logged into.
pub async fn ensure_default_data(
    pool: &PgPool,
    hash_password: impl Fn(&str) -> AppResult<String>,
) -> AppResult<()> {
    let rooms = RoomRepository::new(pool.clone());
    if rooms.any_exist().await? {
        return Ok(());
    }

    let users = UserRepository::new(pool.clone());
    let memberships = MembershipRepository::new(pool.clone());
    let messages = MessageRepository::new(pool.clone());

    let system_user = users
        .create(&CreateUser {
            username: "system".to_string(),
            email: "system@parlor.local".to_string(),
            password_hash: hash_password(&Uuid::new_v4().to_string())?,
            nickname: "System".to_string(),
            avatar: String::new(),
        })
        .await?;

    let lobby = rooms
        .create(&CreateRoom {
            name: "Lobby".to_string(),
            description: "Welcome to the lobby!".to_string(),
            is_private: false,
            password_hash: String::new(),
            max_members: 1000,
            creator_id: system_user.id,
        })
        .await?;

    memberships
        .insert(lobby.id, system_user.id, MemberRole::Creator)
        .await?;

    messages
        .insert(&NewMessage::system(
            lobby.id,
            system_user.id,
            "Welcome to Parlor! Be kind to each other.",
        ))
        .await?;

    info!(room_id = lobby.id, "Default data created");
    Ok(())
}
