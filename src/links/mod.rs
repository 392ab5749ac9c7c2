//! Social links: the ordered list of outbound URLs on a profile page

mod platform;
mod types;

pub use platform::{Platform, PlatformInfo};
pub use types::{NewSocialLink, SocialLink, SocialLinkPatch};

use serde_json::json;
use spark_postgrest::SortOrder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::remote::{tables, RemoteDataService};
use crate::validation::require;
use types::NewSocialLinkRow;

/// Remote CRUD on the `social_links` table.
#[derive(Clone)]
pub struct LinkRepository {
    remote: RemoteDataService,
}

impl LinkRepository {
    pub fn new(remote: RemoteDataService) -> Self {
        Self { remote }
    }

    /// Links of `profile_id`, lowest position first.
    pub async fn list(&self, profile_id: &str) -> Result<Vec<SocialLink>> {
        let mut links: Vec<SocialLink> = self
            .remote
            .from(tables::SOCIAL_LINKS)?
            .select("*")
            .eq("profile_id", profile_id)
            .order("position", SortOrder::Ascending)
            .execute()
            .await?;

        // stable, so equal positions keep server order
        links.sort_by_key(|link| link.position);
        Ok(links)
    }

    /// Insert a link at `position`.
    ///
    /// Positions are not checked for uniqueness.
    pub async fn add(
        &self,
        profile_id: &str,
        link: &NewSocialLink,
        position: u32,
    ) -> Result<SocialLink> {
        require("Profile", profile_id)?;
        link.validate()?;

        let rows: Vec<SocialLink> = self
            .remote
            .from(tables::SOCIAL_LINKS)?
            .insert(json!([NewSocialLinkRow::new(profile_id, link, position)]))
            .await?;

        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("inserted social link was not returned"))?;
        debug!(link_id = %created.id, profile_id, position, "added social link");
        Ok(created)
    }

    pub async fn update(&self, link_id: &str, patch: &SocialLinkPatch) -> Result<SocialLink> {
        patch.validate()?;

        let rows: Vec<SocialLink> = self
            .remote
            .from(tables::SOCIAL_LINKS)?
            .eq("id", link_id)
            .update(patch)
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("social link {}", link_id)))
    }

    /// Hard delete; the remaining links keep their positions.
    pub async fn delete(&self, link_id: &str) -> Result<()> {
        self.remote
            .from(tables::SOCIAL_LINKS)?
            .eq("id", link_id)
            .delete()
            .await?;
        debug!(link_id, "deleted social link");
        Ok(())
    }
}

/// In-memory copy of one profile's links, kept in step with each remote
/// change made through it.
pub struct LinkList {
    repo: LinkRepository,
    profile_id: String,
    links: Vec<SocialLink>,
}

impl LinkList {
    /// An empty list; call [`LinkList::reload`] to fill it.
    pub fn new(repo: LinkRepository, profile_id: &str) -> Self {
        Self {
            repo,
            profile_id: profile_id.to_string(),
            links: Vec::new(),
        }
    }

    pub async fn load(repo: LinkRepository, profile_id: &str) -> Result<Self> {
        let mut list = Self::new(repo, profile_id);
        list.reload().await?;
        Ok(list)
    }

    pub async fn reload(&mut self) -> Result<&[SocialLink]> {
        self.links = self.repo.list(&self.profile_id).await?;
        Ok(&self.links)
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn links(&self) -> &[SocialLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Append a link at the position equal to the current length.
    ///
    /// A list that is out of date computes the same position as the one it
    /// missed.
    pub async fn add(&mut self, link: NewSocialLink) -> Result<SocialLink> {
        let position = self.links.len() as u32;
        let created = self.repo.add(&self.profile_id, &link, position).await?;
        self.links.push(created.clone());
        Ok(created)
    }

    pub async fn update(&mut self, link_id: &str, patch: &SocialLinkPatch) -> Result<SocialLink> {
        let updated = self.repo.update(link_id, patch).await?;
        if let Some(slot) = self.links.iter_mut().find(|link| link.id == updated.id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete(&mut self, link_id: &str) -> Result<()> {
        self.repo.delete(link_id).await?;
        self.links.retain(|link| link.id != link_id);
        Ok(())
    }
}
