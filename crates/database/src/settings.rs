//! Per-profile settings and the recent tags list.

use crate::database::{lookup, upsert, Database};
use crate::entity::{self, Entity};
use crate::error::{Result, StoreError};
use crate::model::Settings;

/// Returns the settings of `owner`, creating the defaults on first use.
pub async fn get_or_create(db: &Database, owner: &str) -> Result<Settings> {
    let owner = owner.to_owned();
    db.write(move |cache, tx| match lookup::<Settings>(cache, &owner)? {
        Some((_, settings)) => Ok(settings),
        None => {
            let settings = Settings::defaults(owner);
            settings.validate()?;
            upsert(cache, tx, &settings)?;
            Ok(settings)
        }
    })
    .await
}

/// Moves `tag` to the front of `owner`'s recent tags.
pub async fn add_recent_tag(db: &Database, owner: &str, tag: &str) -> Result<Settings> {
    add_recent_tags(db, owner, [tag]).await
}

/// Pushes several tags in order, so the last one ends up most recent. Stores
/// nothing when the list is already in that state.
pub async fn add_recent_tags<'a>(
    db: &Database,
    owner: &str,
    tags: impl IntoIterator<Item = &'a str>,
) -> Result<Settings> {
    let tags: Vec<String> = tags.into_iter().map(|t| t.trim().to_owned()).collect();
    if tags.iter().any(String::is_empty) {
        return Err(StoreError::validation("tag", "must not be blank"));
    }

    let owner = owner.to_owned();
    db.write(move |cache, tx| {
        let existing = lookup::<Settings>(cache, &owner)?.map(|(_, s)| s);
        let mut settings = existing
            .clone()
            .unwrap_or_else(|| Settings::defaults(owner.as_str()));
        for tag in &tags {
            settings.push_recent_tag(tag);
        }
        if existing.as_ref() != Some(&settings) {
            settings.validate()?;
            upsert(cache, tx, &settings)?;
        }
        Ok(settings)
    })
    .await
}

/// Merges `patch` into `owner`'s settings, creating them first if needed.
///
/// ```no_run
/// # async fn demo(db: &pawtrack::Database, dog: &str) -> pawtrack::Result<()> {
/// let settings = pawtrack::settings::update(db, dog, serde_json::json!({ "darkMode": true })).await?;
/// assert!(settings.dark_mode);
/// # Ok(())
/// # }
/// ```
pub async fn update(db: &Database, owner: &str, patch: serde_json::Value) -> Result<Settings> {
    let owner = owner.to_owned();
    db.write(move |cache, tx| {
        let current = lookup::<Settings>(cache, &owner)?
            .map(|(_, s)| s)
            .unwrap_or_else(|| Settings::defaults(owner.as_str()));
        let updated = entity::merge_patch(&current, patch)?;
        updated.validate()?;
        upsert(cache, tx, &updated)?;
        Ok(updated)
    })
    .await
}
