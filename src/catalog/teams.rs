use super::{non_empty, required, Catalog};
use crate::error::Result;
use crate::model::TeamMember;
use crate::storage::Order;

#[derive(Debug, Clone, Default)]
pub struct NewTeamMember {
    pub name: String,
    pub description: Option<String>,
    pub short_name: Option<String>,
    pub image: Option<Vec<u8>>,
}

impl Catalog {
    pub async fn create_team_member(&self, new: NewTeamMember) -> Result<TeamMember> {
        self.teams
            .insert(TeamMember {
                id: 0,
                name: required(new.name, "name")?,
                description: non_empty(new.description),
                short_name: non_empty(new.short_name),
                image: new.image,
            })
            .await
    }

    pub async fn team_members(&self) -> Result<Vec<TeamMember>> {
        self.teams.list(Order::Ascending, None).await
    }

    /// Remove without renumbering the rest of the team
    pub async fn delete_team_member(&self, id: u32) -> Result<TeamMember> {
        self.teams.lock().await.remove(id).await
    }
}
