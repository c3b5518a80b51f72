//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Discussion posts, channels and reactions."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::{Endpoint, HubError, ResourceClient, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiscussionAccess {
    Public,
    Org,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
    /// Discussion URI such as `hub://item/{id}`.
    #[serde(default)]
    pub discussion: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub editor: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub feature_geometry: Option<Value>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub app_info: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Body of a post create. Needs a channel, or an access level with groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<DiscussionAccess>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_geometry: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_info: Option<String>,
}

/// Fields to change on a post; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_geometry: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: String,
    pub post_id: String,
    pub value: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub access: DiscussionAccess,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub allow_reply: Option<bool>,
    #[serde(default)]
    pub allow_anonymous: Option<bool>,
    #[serde(default)]
    pub soft_delete: Option<bool>,
    #[serde(default)]
    pub default_post_status: Option<String>,
    #[serde(default)]
    pub allow_reaction: Option<bool>,
    #[serde(default)]
    pub allowed_reactions: Option<Vec<String>>,
    #[serde(default)]
    pub block_words: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// Body of a channel create. Access and groups are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChannel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<DiscussionAccess>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orgs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_reply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_anonymous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_reaction: Option<bool>,
}

/// Fields to change on a channel; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_reply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_anonymous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_delete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_post_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_reaction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_reactions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

fn fetch_as<T: DeserializeOwned>(
    client: &ResourceClient,
    endpoint: Endpoint,
    id: &str,
) -> Result<T> {
    Ok(serde_json::from_value(client.get(endpoint, id)?)?)
}

fn list_as<T: DeserializeOwned>(
    client: &ResourceClient,
    endpoint: Endpoint,
    max: Option<usize>,
) -> Result<Vec<T>> {
    let query: Vec<(&str, String)> = max.map(|n| ("num", n.to_string())).into_iter().collect();
    client
        .list(endpoint, &query)?
        .into_iter()
        .map(|entry| serde_json::from_value(entry).map_err(HubError::from))
        .collect()
}

fn has_audience(access: Option<DiscussionAccess>, groups: Option<&Vec<String>>) -> bool {
    access.is_some() && groups.is_some()
}

#[derive(Clone)]
pub struct PostManager {
    client: Arc<ResourceClient>,
}

impl PostManager {
    pub fn new(client: Arc<ResourceClient>) -> Self {
        Self { client }
    }

    pub fn search(&self, max: Option<usize>) -> Result<Vec<Post>> {
        list_as(&self.client, Endpoint::Post, max)
    }

    pub fn get(&self, post_id: &str) -> Result<Post> {
        fetch_as(&self.client, Endpoint::Post, post_id)
    }

    pub fn add(&self, post: &NewPost) -> Result<Post> {
        if post.body.trim().is_empty() {
            return Err(HubError::Precondition("a post needs a body".to_owned()));
        }
        if post.channel_id.is_none() && !has_audience(post.access, post.groups.as_ref()) {
            return Err(HubError::Precondition(
                "a post needs a channelId, or access and groups".to_owned(),
            ));
        }
        let id = self
            .client
            .create(Endpoint::Post, &serde_json::to_value(post)?)?;
        self.get(&id)
    }

    /// Send only the fields set in `changes` and return the stored post.
    pub fn update(&self, post: &Post, changes: &PostUpdate) -> Result<Post> {
        let ok = self
            .client
            .update(Endpoint::Post, &post.id, &serde_json::to_value(changes)?)?;
        if !ok {
            return Err(HubError::rejected("update post", post.id.as_str()));
        }
        self.get(&post.id)
    }

    /// Remote success flag of the delete.
    pub fn delete(&self, post: &Post) -> Result<bool> {
        self.client.delete(Endpoint::Post, &post.id)
    }

    pub fn add_reaction(&self, post: &Post, value: &str) -> Result<Reaction> {
        let payload = serde_json::json!({"postId": post.id, "value": value});
        let id = self.client.create(Endpoint::Reaction, &payload)?;
        fetch_as(&self.client, Endpoint::Reaction, &id)
    }

    pub fn delete_reaction(&self, reaction_id: &str) -> Result<bool> {
        self.client.delete(Endpoint::Reaction, reaction_id)
    }
}

#[derive(Clone)]
pub struct ChannelManager {
    client: Arc<ResourceClient>,
}

impl ChannelManager {
    pub fn new(client: Arc<ResourceClient>) -> Self {
        Self { client }
    }

    pub fn search(&self, max: Option<usize>) -> Result<Vec<Channel>> {
        list_as(&self.client, Endpoint::Channel, max)
    }

    pub fn get(&self, channel_id: &str) -> Result<Channel> {
        fetch_as(&self.client, Endpoint::Channel, channel_id)
    }

    pub fn add(&self, channel: &NewChannel) -> Result<Channel> {
        if !has_audience(channel.access, channel.groups.as_ref()) {
            return Err(HubError::Precondition(
                "a channel needs access and groups".to_owned(),
            ));
        }
        let id = self
            .client
            .create(Endpoint::Channel, &serde_json::to_value(channel)?)?;
        self.get(&id)
    }

    pub fn update(&self, channel: &Channel, changes: &ChannelUpdate) -> Result<Channel> {
        let ok = self
            .client
            .update(Endpoint::Channel, &channel.id, &serde_json::to_value(changes)?)?;
        if !ok {
            return Err(HubError::rejected("update channel", channel.id.as_str()));
        }
        self.get(&channel.id)
    }

    /// Deleting a channel deletes its posts too.
    pub fn delete(&self, channel: &Channel) -> Result<bool> {
        self.client.delete(Endpoint::Channel, &channel.id)
    }
}
