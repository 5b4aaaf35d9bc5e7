//! Account administration and self-service profile edits.

use std::sync::Arc;

use super::require;
use crate::auth::guard;
use crate::cache::{Committed, QueryCache, QueryKey};
use crate::error::{AppError, AppResult};
use crate::models::{Identity, Profile, Role};
use crate::store::{EntityKind, ProfileChanges, Repository};

/// Documents are capped near 1 MiB, so the encoded picture must stay below that.
pub const MAX_PROFILE_PIC_LEN: usize = 900 * 1024;

fn ensure_admin(actor: &Identity) -> AppResult<()> {
    if guard::is_admin(Some(actor)) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only administrators can manage users.".to_string()))
    }
}

pub fn list_users(repo: &Repository, cache: &QueryCache, actor: &Identity) -> AppResult<Arc<Vec<Identity>>> {
    ensure_admin(actor)?;
    cache.get_or_fetch(QueryKey::all(EntityKind::Users), || Ok(repo.list_users()?))
}

pub fn set_role(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    user_id: &str,
    role: Role,
) -> AppResult<Committed<Identity>> {
    ensure_admin(actor)?;
    cache.commit(&[EntityKind::Users], || {
        repo.set_role(user_id, role)?;
        tracing::info!(user_id, role = role.as_str(), by = %actor.id, "Role updated");
        require(repo.get_user(user_id)?, EntityKind::Users, user_id)
    })
}

/// Flips a user's active flag.
pub fn toggle_status(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    user_id: &str,
) -> AppResult<Committed<Identity>> {
    ensure_admin(actor)?;
    let mut user = require(repo.get_user(user_id)?, EntityKind::Users, user_id)?;

    cache.commit(&[EntityKind::Users], || {
        repo.set_active(user_id, !user.status)?;
        user.status = !user.status;
        tracing::info!(user_id, active = user.status, by = %actor.id, "Status updated");
        Ok(user)
    })
}

pub fn get_profile(repo: &Repository, actor: &Identity) -> AppResult<Profile> {
    require(repo.get_profile(&actor.id)?, EntityKind::Users, &actor.id)
}

pub fn update_profile(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    mut changes: ProfileChanges,
) -> AppResult<Committed<Profile>> {
    if let Some(name) = changes.name.as_mut() {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty.".to_string()));
        }
        *name = trimmed.to_string();
    }
    if changes.age.is_some_and(|age| age == 0 || age > 150) {
        return Err(AppError::BadRequest("Please enter a valid age.".to_string()));
    }

    cache.commit(&[EntityKind::Users], || {
        repo.update_profile(&actor.id, &changes)?;
        tracing::info!(user_id = %actor.id, "Profile updated");
        get_profile(repo, actor)
    })
}

/// Stores an image as a `data:image/...;base64,` URL on the user's record.
pub fn set_profile_pic(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    data_url: &str,
) -> AppResult<Committed<()>> {
    let is_image = data_url
        .strip_prefix("data:image/")
        .is_some_and(|rest| rest.contains(";base64,"));
    if !is_image {
        return Err(AppError::BadRequest("Please choose an image file.".to_string()));
    }
    if data_url.len() > MAX_PROFILE_PIC_LEN {
        return Err(AppError::BadRequest("Image is too large.".to_string()));
    }

    cache.commit(&[EntityKind::Users], || {
        repo.set_profile_pic(&actor.id, data_url)?;
        tracing::info!(user_id = %actor.id, bytes = data_url.len(), "Profile picture updated");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::SqliteDocumentStore;

    fn setup() -> (Repository, QueryCache, Identity, Identity) {
        let repo = Repository::new(Arc::new(SqliteDocumentStore::new(db::create_memory_pool())));
        let mk = |id: &str, role| Identity {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            role,
            created_at: db::now(),
            status: true,
        };
        let root = mk("root", Role::Admin);
        let jane = mk("jane", Role::User);
        repo.put_user(&root).unwrap();
        repo.put_user(&jane).unwrap();
        (repo, QueryCache::new(100), root, jane)
    }

    #[test]
    fn admin_changes_roles_and_listing_follows() {
        let (repo, cache, root, jane) = setup();
        assert_eq!(list_users(&repo, &cache, &root).unwrap().len(), 2);

        let promoted = set_role(&repo, &cache, &root, &jane.id, Role::Admin)
            .unwrap()
            .into_inner();
        assert_eq!(promoted.role, Role::Admin);

        let listed = list_users(&repo, &cache, &root).unwrap();
        assert!(listed.iter().all(|u| u.role == Role::Admin));
    }

    #[test]
    fn toggle_flips_status_each_time() {
        let (repo, cache, root, jane) = setup();
        let off = toggle_status(&repo, &cache, &root, &jane.id).unwrap().into_inner();
        assert!(!off.status);
        assert!(!repo.get_user(&jane.id).unwrap().unwrap().status);

        let on = toggle_status(&repo, &cache, &root, &jane.id).unwrap().into_inner();
        assert!(on.status);
    }

    #[test]
    fn users_cannot_administer_accounts() {
        let (repo, cache, _, jane) = setup();
        assert!(matches!(list_users(&repo, &cache, &jane), Err(AppError::Forbidden(_))));
        assert!(matches!(
            set_role(&repo, &cache, &jane, &jane.id, Role::Admin),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(repo.get_user(&jane.id).unwrap().unwrap().role, Role::User);
    }

    #[test]
    fn profile_update_keeps_role_and_email() {
        let (repo, cache, _, jane) = setup();
        let profile = update_profile(
            &repo,
            &cache,
            &jane,
            ProfileChanges {
                name: Some("  Jane Q. Doe ".to_string()),
                phone: Some("555-0100".to_string()),
                age: Some(31),
                ..Default::default()
            },
        )
        .unwrap()
        .into_inner();

        assert_eq!(profile.identity.name, "Jane Q. Doe");
        assert_eq!(profile.identity.email, jane.email);
        assert_eq!(profile.identity.role, Role::User);
        assert_eq!(profile.phone.as_deref(), Some("555-0100"));
        assert_eq!(profile.age, Some(31));
        assert_eq!(profile.address, None);
    }

    #[test]
    fn profile_validation_runs_before_writes() {
        let (repo, cache, _, jane) = setup();
        let blank = ProfileChanges {
            name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_profile(&repo, &cache, &jane, blank),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(get_profile(&repo, &jane).unwrap().identity.name, "jane");
    }

    #[test]
    fn profile_pictures_must_be_image_data_urls() {
        let (repo, cache, _, jane) = setup();
        assert!(set_profile_pic(&repo, &cache, &jane, "https://example.com/me.png").is_err());
        assert!(set_profile_pic(&repo, &cache, &jane, "data:text/plain;base64,aGk=").is_err());

        let url = "data:image/png;base64,iVBORw0KGgo=";
        set_profile_pic(&repo, &cache, &jane, url).unwrap().into_inner();
        assert_eq!(get_profile(&repo, &jane).unwrap().profile_pic.as_deref(), Some(url));
    }
}
