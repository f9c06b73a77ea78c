use serde::{Deserialize, Serialize};

/// A registered target cluster.
///
/// `server` is the primary key. `id` is an opaque, stable identifier that the
/// hash and rank based algorithms distribute on. `shard`, when set and lower
/// than the replica count, pins the cluster to that shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default)]
    pub id: String,
    pub server: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<u32>,
}

impl Cluster {
    pub fn new(id: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            server: server.into(),
            name: String::new(),
            shard: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_shard(mut self, shard: u32) -> Self {
        self.shard = Some(shard);
        self
    }
}

/// An application deployed to a cluster. Only its destination matters here:
/// applications are counted per cluster, they are never sharded themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub destination_server: String,
}

impl Application {
    pub fn new(name: impl Into<String>, destination_server: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            destination_server: destination_server.into(),
        }
    }
}

/// Returns true when `new` differs from `old` in a field that can move the
/// cluster to another shard: the id, the server, or the explicit shard.
///
/// Returns false when either side is missing.
pub fn has_sharding_updates(old: Option<&Cluster>, new: Option<&Cluster>) -> bool {
    let (Some(old), Some(new)) = (old, new) else {
        return false;
    };
    old.id != new.id || old.server != new.server || old.shard != new.shard
}
