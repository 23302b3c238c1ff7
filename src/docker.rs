//! Container enumeration through the Docker Engine API.

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::models::ContainerSummary;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::future::join_all;
use tracing::{debug, instrument};

use crate::config::DockerConfig;
use crate::core::{Entity, EntitySource};
use crate::errors::CollectError;

const SHORT_ID_LEN: usize = 12;

/// Lists running containers from a Docker daemon.
pub struct DockerSource {
    docker: Docker,
}

impl DockerSource {
    /// Creates a client for the daemon socket. No request is made until the
    /// first round.
    pub fn connect(config: &DockerConfig) -> Result<Self, bollard::errors::Error> {
        let docker = Docker::connect_with_socket(
            &config.socket_path,
            config.timeout_seconds,
            API_DEFAULT_VERSION,
        )?;
        Ok(Self { docker })
    }

    /// Host pid of a container's init process.
    ///
    /// A failed inspect only costs this container its network samples.
    async fn inspect_pid(&self, id: &str) -> Option<i64> {
        match self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => details.state.and_then(|state| state.pid).filter(|pid| *pid > 0),
            Err(e) => {
                debug!(container = id, error = %e, "Failed to inspect container");
                None
            }
        }
    }

    async fn to_entity(&self, summary: ContainerSummary) -> Option<Entity> {
        let id = summary.id?;
        let name = container_name(summary.names.as_deref(), &id);
        let image = summary.image.unwrap_or_default();
        let pid = self.inspect_pid(&id).await;

        Some(Entity {
            id,
            name,
            image,
            pid,
        })
    }
}

#[async_trait]
impl EntitySource for DockerSource {
    #[instrument(skip_all)]
    async fn list_active_entities(&self) -> Result<Vec<Entity>, CollectError> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| CollectError::Enumeration(Box::new(e)))?;

        let entities = join_all(summaries.into_iter().map(|s| self.to_entity(s))).await;
        Ok(entities.into_iter().flatten().collect())
    }
}

/// First runtime name without its leading `/`, or the short id when the
/// runtime reports none.
pub fn container_name(names: Option<&[String]>, id: &str) -> String {
    names
        .and_then(|names| names.first())
        .map(|name| name.strip_prefix('/').unwrap_or(name.as_str()))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.chars().take(SHORT_ID_LEN).collect())
}
